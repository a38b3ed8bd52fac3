//! Sheet engine abstraction.
//!
//! This module defines the [`SheetEngine`] trait, the boundary between the
//! lifecycle core and whatever turns a [`CanonicalStyle`] into applied rules.
//! The core only ever:
//!
//! 1. calls [`SheetEngine::create`] once per new fingerprint,
//! 2. calls [`Sheet::attach`] right after creation, before any class name is
//!    handed out,
//! 3. calls [`Sheet::detach`] and then [`Sheet::remove`] when the artifact is
//!    evicted from the cooldown cache.
//!
//! The bundled implementation is [`CssEngine`], which renders CSS text and
//! keeps an in-memory registry of attached sheets.

mod css;

use std::collections::BTreeMap;
use std::ops::Index;

use crate::error::EngineError;
use crate::style::CanonicalStyle;

pub use css::{default_engine, CssEngine, CssSheet};

/// Options passed to [`SheetEngine::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetOptions {
    /// Ordering index of the defining site. Higher indexes come later in the
    /// cascade.
    pub index: usize,
    /// Prefix for generated class names.
    pub prefix: Option<String>,
    /// Media query the sheet applies to.
    pub media: Option<String>,
    /// Free-form description, useful when debugging.
    pub meta: Option<String>,
}

/// Mapping from declared class names to generated ones.
///
/// Alongside each generated name the engine may record the style source it
/// emitted for that class, for introspection. Engines that scope keyframe
/// animation names record the generated animation names here too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: BTreeMap<String, String>,
    sources: BTreeMap<String, String>,
    animations: BTreeMap<String, String>,
}

impl ClassNames {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the generated name (and emitted source) for a declared class.
    pub fn insert(
        &mut self,
        class: impl Into<String>,
        generated: impl Into<String>,
        source: impl Into<String>,
    ) {
        let class = class.into();
        self.sources.insert(class.clone(), source.into());
        self.names.insert(class, generated.into());
    }

    /// Records the generated name of a declared keyframe animation.
    pub fn insert_animation(&mut self, name: impl Into<String>, generated: impl Into<String>) {
        self.animations.insert(name.into(), generated.into());
    }

    /// Returns the generated name of a declared keyframe animation.
    pub fn animation(&self, name: &str) -> Option<&str> {
        self.animations.get(name).map(|s| s.as_str())
    }

    /// Returns the generated name for a declared class.
    pub fn get(&self, class: &str) -> Option<&str> {
        self.names.get(class).map(|s| s.as_str())
    }

    /// Returns the style source emitted for a declared class.
    pub fn source(&self, class: &str) -> Option<&str> {
        self.sources.get(class).map(|s| s.as_str())
    }

    /// Returns true if the class was declared.
    pub fn contains(&self, class: &str) -> bool {
        self.names.contains_key(class)
    }

    /// Iterates over `(declared, generated)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no class was declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Index<&str> for ClassNames {
    type Output = str;

    /// Panics if `class` was not declared.
    fn index(&self, class: &str) -> &str {
        match self.get(class) {
            Some(name) => name,
            None => panic!("unknown class '{}'", class),
        }
    }
}

/// A materialized sheet owned by one artifact.
pub trait Sheet {
    /// Returns the class-name mapping produced at creation.
    fn classes(&self) -> &ClassNames;

    /// Makes the sheet's rules apply.
    fn attach(&mut self);

    /// Stops the sheet's rules from applying.
    fn detach(&mut self);

    /// Returns true while attached.
    fn is_attached(&self) -> bool;

    /// Releases the sheet back to its engine. The sheet is gone afterwards.
    fn remove(self: Box<Self>);
}

/// Something that can materialize canonical style objects.
///
/// # Single-Threaded Design
///
/// Sites are confined to one thread, so engines don't require `Send + Sync`.
pub trait SheetEngine {
    /// Creates a detached sheet for `style`.
    ///
    /// Failures are returned to the caller as-is; the core does not retry.
    fn create(
        &self,
        style: &CanonicalStyle,
        options: &SheetOptions,
    ) -> Result<Box<dyn Sheet>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names_lookup() {
        let mut names = ClassNames::new();
        names.insert("root", "root-1-1", "color: red;");
        assert_eq!(names.get("root"), Some("root-1-1"));
        assert_eq!(names.source("root"), Some("color: red;"));
        assert_eq!(&names["root"], "root-1-1");
        assert!(names.get("label").is_none());
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_animations_are_not_classes() {
        let mut names = ClassNames::new();
        names.insert_animation("spin", "spin-1");
        assert_eq!(names.animation("spin"), Some("spin-1"));
        assert!(!names.contains("spin"));
        assert!(names.is_empty());
    }

    #[test]
    #[should_panic(expected = "unknown class 'label'")]
    fn test_class_names_index_panics_on_unknown() {
        let names = ClassNames::new();
        let _ = &names["label"];
    }
}
