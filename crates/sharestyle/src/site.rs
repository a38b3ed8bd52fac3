//! Style sites, leases and bindings.
//!
//! A [`StyleSite`] is one place in the host that declares a style: a
//! descriptor, an optional theme provider, and its own
//! [`SheetLifecycle`]. Sites are created through a [`StyleContext`], which
//! hands out increasing ordering indexes so later sites win in the cascade.
//!
//! Consumers reach a site in one of two ways:
//!
//! - [`StyleSite::acquire`] returns a [`StyleLease`] holding one reference;
//!   dropping the lease releases it.
//! - [`StyleBinding`] follows a single caller across updates, resolving the
//!   new variant before releasing the old one so the previous sheet never
//!   disappears while its replacement is being built.
//!
//! # Example
//!
//! ```rust
//! use sharestyle::{CssEngine, Fragment, StyleContext, StyleDefs, StyleOptions};
//! use serde_json::json;
//!
//! let engine = CssEngine::new();
//! let context = StyleContext::with_engine(engine.clone());
//! let site = context.define(
//!     StyleDefs::<bool, ()>::new().class(
//!         "button",
//!         Fragment::new().set_with("color", |primary: &bool, _: &()| {
//!             json!(if *primary { "white" } else { "black" })
//!         }),
//!     ),
//!     StyleOptions::new(),
//! );
//!
//! let mut binding = site.binding();
//! let classes = binding.update(&true).unwrap();
//! assert!(classes["button"].starts_with("button-"));
//! assert_eq!(engine.attached_count(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::config::StyleOptions;
use crate::error::{LifecycleError, StyleError};
use crate::fingerprint::Fingerprint;
use crate::lifecycle::{Artifact, ArtifactState, LifecycleStats, SheetLifecycle};
use crate::sheet::{default_engine, ClassNames, SheetEngine, SheetOptions};
use crate::style::{evaluate, CanonicalStyle, StyleDescriptor};
use crate::theme::ThemeProvider;

/// Owner of the sheet engine and the site ordering counter.
///
/// Every site defined through the same context shares its engine.
pub struct StyleContext {
    engine: Rc<dyn SheetEngine>,
    next_index: Cell<usize>,
}

impl StyleContext {
    /// A context backed by this thread's [`default_engine`].
    pub fn new() -> Self {
        Self::with_engine(default_engine())
    }

    /// A context backed by `engine`.
    pub fn with_engine<E: SheetEngine + 'static>(engine: E) -> Self {
        Self::from_shared(Rc::new(engine))
    }

    /// A context backed by an already shared engine.
    pub fn from_shared(engine: Rc<dyn SheetEngine>) -> Self {
        Self {
            engine,
            next_index: Cell::new(0),
        }
    }

    /// Defines a new site.
    ///
    /// The site takes the next ordering index.
    pub fn define<P, T>(
        &self,
        descriptor: impl Into<StyleDescriptor<P, T>>,
        options: StyleOptions<T>,
    ) -> StyleSite<P, T> {
        let index = self.next_index.get();
        self.next_index.set(index + 1);

        let (config, theme) = options.into_parts();
        let sheet_options = SheetOptions {
            index,
            prefix: config.prefix,
            media: config.media,
            meta: config.meta,
        };
        tracing::debug!(index, capacity = config.variant_cache_size, "defined style site");

        StyleSite {
            inner: Rc::new(SiteInner {
                descriptor: descriptor.into(),
                theme,
                lifecycle: Rc::new(RefCell::new(SheetLifecycle::new(
                    Rc::clone(&self.engine),
                    sheet_options,
                    config.variant_cache_size,
                ))),
            }),
        }
    }

    /// Returns a view of this context whose sites default to `provider` for
    /// their theme. An explicit theme in the site options still wins.
    pub fn themed<T, Pr>(&self, provider: Pr) -> ThemedContext<'_, T>
    where
        Pr: ThemeProvider<T> + 'static,
    {
        ThemedContext {
            context: self,
            theme: Rc::new(provider),
        }
    }

    /// Number of sites defined so far.
    pub fn sites_defined(&self) -> usize {
        self.next_index.get()
    }
}

impl Default for StyleContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StyleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleContext")
            .field("sites_defined", &self.next_index.get())
            .finish()
    }
}

/// A [`StyleContext`] with a default theme provider.
pub struct ThemedContext<'a, T> {
    context: &'a StyleContext,
    theme: Rc<dyn ThemeProvider<T>>,
}

impl<T> ThemedContext<'_, T> {
    /// Defines a site, using the context's provider unless `options` sets one.
    pub fn define<P>(
        &self,
        descriptor: impl Into<StyleDescriptor<P, T>>,
        options: StyleOptions<T>,
    ) -> StyleSite<P, T> {
        self.context
            .define(descriptor, options.theme_or(Rc::clone(&self.theme)))
    }
}

struct SiteInner<P, T> {
    descriptor: StyleDescriptor<P, T>,
    theme: Option<Rc<dyn ThemeProvider<T>>>,
    lifecycle: Rc<RefCell<SheetLifecycle>>,
}

/// One style declaration with its own artifact registry.
///
/// Cloning is cheap; clones share the registry. Sites without a theme
/// provider evaluate against `T::default()`.
pub struct StyleSite<P, T> {
    inner: Rc<SiteInner<P, T>>,
}

impl<P, T: Default> StyleSite<P, T> {
    /// Evaluates the descriptor for `params` and fingerprints the result.
    ///
    /// The theme provider is called exactly once.
    pub fn compute(&self, params: &P) -> (CanonicalStyle, Fingerprint) {
        let theme = match &self.inner.theme {
            Some(provider) => provider.theme(),
            None => T::default(),
        };
        let style = evaluate(&self.inner.descriptor, params, &theme);
        let fingerprint = Fingerprint::of(&style);
        (style, fingerprint)
    }

    /// Takes a reference on the artifact for `params`.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::Engine`] if a new sheet had to be created and
    /// the engine failed.
    pub fn acquire(&self, params: &P) -> Result<StyleLease, StyleError> {
        let (style, fingerprint) = self.compute(params);
        self.resolve(fingerprint, &style)
    }
}

impl<P, T> StyleSite<P, T> {
    fn resolve(&self, fingerprint: Fingerprint, style: &CanonicalStyle) -> Result<StyleLease, StyleError> {
        let artifact = self.inner.lifecycle.borrow_mut().resolve(fingerprint, style)?;
        Ok(StyleLease {
            lifecycle: Rc::clone(&self.inner.lifecycle),
            artifact: Some(artifact),
        })
    }

    /// Starts tracking a single caller.
    pub fn binding(&self) -> StyleBinding<P, T> {
        StyleBinding {
            site: self.clone(),
            current: None,
        }
    }

    /// Ordering index assigned by the defining context.
    pub fn index(&self) -> usize {
        self.inner.lifecycle.borrow().options().index
    }

    /// Where `fingerprint` currently sits in this site's registry.
    pub fn state_of(&self, fingerprint: Fingerprint) -> ArtifactState {
        self.inner.lifecycle.borrow().state_of(fingerprint)
    }

    /// Number of active artifacts.
    pub fn active_len(&self) -> usize {
        self.inner.lifecycle.borrow().active_len()
    }

    /// Number of cooling artifacts.
    pub fn cooling_len(&self) -> usize {
        self.inner.lifecycle.borrow().cooling_len()
    }

    /// Counters of this site's lifecycle.
    pub fn stats(&self) -> LifecycleStats {
        self.inner.lifecycle.borrow().stats()
    }

    /// Destroys every cooling artifact of this site.
    pub fn clear_cooldown(&self) {
        self.inner.lifecycle.borrow_mut().clear();
    }
}

impl<P, T> Clone for StyleSite<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P, T> fmt::Debug for StyleSite<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleSite")
            .field("lifecycle", &*self.inner.lifecycle.borrow())
            .field("themed", &self.inner.theme.is_some())
            .finish()
    }
}

/// One outstanding reference on an artifact.
///
/// Released exactly once: by [`StyleLease::release`] or on drop.
pub struct StyleLease {
    lifecycle: Rc<RefCell<SheetLifecycle>>,
    artifact: Option<Rc<Artifact>>,
}

impl StyleLease {
    fn artifact(&self) -> &Rc<Artifact> {
        match &self.artifact {
            Some(artifact) => artifact,
            None => unreachable!("lease used after release"),
        }
    }

    /// Fingerprint of the leased artifact.
    pub fn fingerprint(&self) -> Fingerprint {
        self.artifact().fingerprint()
    }

    /// Generated class names.
    pub fn classes(&self) -> &Rc<ClassNames> {
        self.artifact().classes()
    }

    /// Canonical style token of a declared class.
    pub fn style(&self, class: &str) -> Option<&Map<String, Value>> {
        self.artifact().style(class)
    }

    /// Releases the reference now, reporting a rejected release.
    pub fn release(mut self) -> Result<(), LifecycleError> {
        match self.artifact.take() {
            Some(artifact) => self.lifecycle.borrow_mut().release(artifact.fingerprint()),
            None => Ok(()),
        }
    }
}

impl Drop for StyleLease {
    fn drop(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            if let Err(err) = self.lifecycle.borrow_mut().release(artifact.fingerprint()) {
                tracing::warn!(error = %err, "lease release rejected");
            }
        }
    }
}

impl fmt::Debug for StyleLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleLease")
            .field("artifact", &self.artifact)
            .finish()
    }
}

/// Tracks the style of one caller across updates.
///
/// Holds at most one lease. Dropping the binding releases it.
pub struct StyleBinding<P, T> {
    site: StyleSite<P, T>,
    current: Option<StyleLease>,
}

impl<P, T: Default> StyleBinding<P, T> {
    /// Computes the style for `params` and returns its class names.
    ///
    /// A new fingerprint is resolved before the previous one is released.
    /// An unchanged fingerprint takes no extra reference.
    ///
    /// # Errors
    ///
    /// On an engine failure the previous lease is kept and the error is
    /// returned.
    pub fn update(&mut self, params: &P) -> Result<Rc<ClassNames>, StyleError> {
        let (style, fingerprint) = self.site.compute(params);
        if let Some(lease) = &self.current {
            if lease.fingerprint() == fingerprint {
                return Ok(Rc::clone(lease.classes()));
            }
        }

        let next = self.site.resolve(fingerprint, &style)?;
        let classes = Rc::clone(next.classes());
        if let Some(previous) = self.current.replace(next) {
            previous.release()?;
        }
        Ok(classes)
    }
}

impl<P, T> StyleBinding<P, T> {
    /// Class names from the last successful update.
    pub fn classes(&self) -> Option<Rc<ClassNames>> {
        self.current.as_ref().map(|lease| Rc::clone(lease.classes()))
    }

    /// Style token of a class from the last successful update.
    pub fn style(&self, class: &str) -> Option<&Map<String, Value>> {
        self.current.as_ref().and_then(|lease| lease.style(class))
    }

    /// Fingerprint from the last successful update.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.current.as_ref().map(StyleLease::fingerprint)
    }

    /// Releases the current lease, if any. Calling it again is a no-op.
    pub fn unmount(&mut self) -> Result<(), StyleError> {
        if let Some(lease) = self.current.take() {
            lease.release()?;
        }
        Ok(())
    }
}

impl<P, T> fmt::Debug for StyleBinding<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleBinding")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
