//! Per-site configuration.
//!
//! [`SiteConfig`] holds the serializable options of a style site. It can be
//! built in code, or loaded from JSON or YAML:
//!
//! ```yaml
//! prefix: "card-"
//! variant_cache_size: 8
//! media: "screen"
//! meta: "Card"
//! ```
//!
//! Every field is optional; missing fields take their defaults.
//!
//! [`StyleOptions`] pairs a `SiteConfig` with an optional theme provider,
//! which cannot be expressed in a config file.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::theme::ThemeProvider;

/// Default capacity of a site's cooldown cache.
pub const DEFAULT_VARIANT_CACHE_SIZE: usize = 20;

/// Serializable options for one style site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Prefix for generated class names.
    pub prefix: Option<String>,
    /// Capacity of the cooldown cache. `0` destroys artifacts as soon as
    /// their last reference is released.
    pub variant_cache_size: usize,
    /// Media query passed through to the sheet engine.
    pub media: Option<String>,
    /// Free-form description passed through to the sheet engine.
    pub meta: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            variant_cache_size: DEFAULT_VARIANT_CACHE_SIZE,
            media: None,
            meta: None,
        }
    }
}

impl SiteConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })
    }

    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: None,
            message: e.to_string(),
        })
    }

    /// Loads a config file, choosing the parser by extension (`.json`,
    /// `.yaml` or `.yml`).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the extension is not recognized, or the
    /// file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let parse: fn(&str) -> Result<Self, ConfigError> = match extension.as_deref() {
            Some("json") => Self::from_json,
            Some("yaml") | Some("yml") => Self::from_yaml,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        parse(&content).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }
}

/// Options for defining a style site: configuration plus theme source.
///
/// # Example
///
/// ```rust
/// use sharestyle::{StaticTheme, StyleOptions};
///
/// let options = StyleOptions::new()
///     .prefix("nav-")
///     .variant_cache_size(4)
///     .theme(StaticTheme::new("dark"));
///
/// assert_eq!(options.config().variant_cache_size, 4);
/// assert!(options.has_theme());
/// ```
pub struct StyleOptions<T> {
    config: SiteConfig,
    theme: Option<Rc<dyn ThemeProvider<T>>>,
}

impl<T> StyleOptions<T> {
    /// Default options: no prefix, cache size 20, no theme provider.
    pub fn new() -> Self {
        Self {
            config: SiteConfig::default(),
            theme: None,
        }
    }

    /// Options from a loaded [`SiteConfig`].
    pub fn from_config(config: SiteConfig) -> Self {
        Self { config, theme: None }
    }

    /// Sets the class-name prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = Some(prefix.into());
        self
    }

    /// Sets the cooldown capacity.
    pub fn variant_cache_size(mut self, size: usize) -> Self {
        self.config.variant_cache_size = size;
        self
    }

    /// Sets the media query.
    pub fn media(mut self, media: impl Into<String>) -> Self {
        self.config.media = Some(media.into());
        self
    }

    /// Sets the meta description.
    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.config.meta = Some(meta.into());
        self
    }

    /// Sets the theme provider.
    pub fn theme<Pr: ThemeProvider<T> + 'static>(mut self, provider: Pr) -> Self {
        self.theme = Some(Rc::new(provider));
        self
    }

    /// Sets the theme provider only if none is set yet.
    pub(crate) fn theme_or(mut self, provider: Rc<dyn ThemeProvider<T>>) -> Self {
        if self.theme.is_none() {
            self.theme = Some(provider);
        }
        self
    }

    /// Returns the serializable part of the options.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Returns true if a theme provider is set.
    pub fn has_theme(&self) -> bool {
        self.theme.is_some()
    }

    pub(crate) fn into_parts(self) -> (SiteConfig, Option<Rc<dyn ThemeProvider<T>>>) {
        (self.config, self.theme)
    }
}

impl<T> Default for StyleOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StyleOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleOptions")
            .field("config", &self.config)
            .field("theme", &self.theme.is_some())
            .finish()
    }
}
