//! # Sharestyle - Deduplicated, Reference-Counted Style Sheets
//!
//! `sharestyle` turns declarative style descriptors into materialized style
//! sheets, and makes sure that every consumer asking for the same computed
//! style shares one sheet.
//!
//! Many call sites ask for "the style for these parameters and this theme".
//! The crate evaluates the descriptor into a canonical object, fingerprints
//! it, and hands out a reference to the artifact for that fingerprint,
//! creating it only when nothing equal exists yet.
//!
//! ## Core Concepts
//!
//! - [`StyleDefs`] / [`Fragment`]: classes, globals and keyframes. Any level
//!   can be a [`Deferred`] function of `(params, theme)`.
//! - [`evaluate`]: forces a descriptor into a [`CanonicalStyle`].
//! - [`Fingerprint`]: a content hash of the canonical object, independent of
//!   key order.
//! - [`SheetLifecycle`]: active artifacts plus a bounded cooldown cache of
//!   recently released ones.
//! - [`StyleContext`] / [`StyleSite`]: one site per declaration, with its own
//!   registry and ordering index.
//! - [`StyleLease`] / [`StyleBinding`]: RAII references held by consumers.
//! - [`SheetEngine`]: the seam to whatever applies the rules. [`CssEngine`]
//!   renders CSS text.
//!
//! ## Quick Start
//!
//! ```rust
//! use sharestyle::{CssEngine, Fragment, StyleContext, StyleDefs, StyleOptions};
//! use serde_json::json;
//!
//! let engine = CssEngine::new();
//! let context = StyleContext::with_engine(engine.clone());
//!
//! let site = context.define(
//!     StyleDefs::<u32, ()>::new().class(
//!         "title",
//!         Fragment::new()
//!             .set("fontWeight", 700)
//!             .set_with("fontSize", |size: &u32, _: &()| json!(*size))
//!             .pseudo("&:hover", Fragment::new().set("color", "teal")),
//!     ),
//!     StyleOptions::new().prefix("app-"),
//! );
//!
//! let a = site.acquire(&14).unwrap();
//! let b = site.acquire(&14).unwrap();
//! assert_eq!(a.classes()["title"], b.classes()["title"]);
//! assert_eq!(engine.attached_count(), 1);
//!
//! let css = engine.to_css();
//! assert!(css.contains("font-size: 14px;"));
//! assert!(css.contains(":hover"));
//! ```
//!
//! ## Themes
//!
//! A site calls its [`ThemeProvider`] once per invocation. Use an
//! [`AmbientTheme`] to switch themes for every site at once:
//!
//! ```rust
//! use sharestyle::{AmbientTheme, Fragment, StyleContext, StyleDefs, StyleOptions};
//! use sharestyle::testing::RecordingEngine;
//! use serde_json::json;
//!
//! let theme = AmbientTheme::new("light");
//! let context = StyleContext::with_engine(RecordingEngine::new());
//! let site = context.themed(theme.clone()).define(
//!     StyleDefs::<(), &str>::new().class(
//!         "panel",
//!         Fragment::new().set_with("background", |_: &(), t: &&str| {
//!             json!(if *t == "dark" { "black" } else { "white" })
//!         }),
//!     ),
//!     StyleOptions::new(),
//! );
//!
//! let light = site.acquire(&()).unwrap();
//! theme.set("dark");
//! let dark = site.acquire(&()).unwrap();
//! assert_ne!(light.fingerprint(), dark.fingerprint());
//! ```
//!
//! ## Configuration
//!
//! Site options can be loaded from JSON or YAML through [`SiteConfig`]:
//!
//! ```rust
//! use sharestyle::{SiteConfig, StyleOptions};
//!
//! let config = SiteConfig::from_yaml("prefix: nav-\nvariant_cache_size: 4").unwrap();
//! let options: StyleOptions<()> = StyleOptions::from_config(config);
//! assert_eq!(options.config().variant_cache_size, 4);
//! ```
//!
//! ## Logging
//!
//! Lifecycle events are emitted through `tracing`. The crate never installs a
//! subscriber.

// Internal modules
pub mod config;
mod error;
pub mod fingerprint;
pub mod lifecycle;
pub mod prelude;
pub mod sheet;
mod site;
pub mod style;
pub mod testing;
pub mod theme;

// Error types
pub use error::{ConfigError, EngineError, LifecycleError, StyleError};

// Style module exports
pub use style::{
    evaluate, CanonicalStyle, Deferred, Fragment, FragmentMap, KeyframeStops, Keyframes,
    PseudoMap, StyleDefs, StyleDescriptor,
};

// Fingerprint exports
pub use fingerprint::{fingerprint, Fingerprint};

// Lifecycle exports
pub use lifecycle::{Artifact, ArtifactState, LifecycleStats, SheetLifecycle};

// Sheet engine exports
pub use sheet::{default_engine, ClassNames, CssEngine, CssSheet, Sheet, SheetEngine, SheetOptions};

// Site exports
pub use site::{StyleBinding, StyleContext, StyleLease, StyleSite, ThemedContext};

// Theme and configuration exports
pub use config::{SiteConfig, StyleOptions, DEFAULT_VARIANT_CACHE_SIZE};
pub use theme::{AmbientTheme, StaticTheme, ThemeProvider};
