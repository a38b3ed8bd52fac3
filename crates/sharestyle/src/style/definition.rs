//! Declarative style descriptors.
//!
//! A descriptor is a tree of maps whose every level may be deferred:
//!
//! ```text
//! StyleDescriptor = Deferred<StyleDefs>
//! StyleDefs       = { classes?: Deferred<FragmentMap>,
//!                     global?:  Deferred<FragmentMap>,
//!                     keyframes?: Deferred<Keyframes> }
//! FragmentMap     = name -> Deferred<Fragment>
//! Keyframes       = name -> Deferred<KeyframeStops>
//! KeyframeStops   = stop -> Deferred<Fragment>
//! Fragment        = property -> Deferred<serde_json::Value>
//!                   + pseudos?: Deferred<name -> Deferred<Fragment>>
//! ```
//!
//! Descriptors are built with chained builder calls:
//!
//! ```rust
//! use sharestyle::{Fragment, StyleDefs};
//!
//! struct Props { active: bool }
//!
//! let defs: StyleDefs<Props, ()> = StyleDefs::new()
//!     .class(
//!         "button",
//!         Fragment::new()
//!             .set("padding", 4)
//!             .set_with("color", |p: &Props, _: &()| {
//!                 if p.active { "red".into() } else { "gray".into() }
//!             })
//!             .pseudo("&:hover", Fragment::new().set("opacity", 0.5)),
//!     );
//! # let _ = defs;
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::value::Deferred;

/// A whole descriptor, itself possibly deferred.
pub type StyleDescriptor<P, T> = Deferred<StyleDefs<P, T>, P, T>;

/// Pseudo fragments keyed by selector (e.g. `&:hover`).
pub type PseudoMap<P, T> = IndexMap<String, Deferred<Fragment<P, T>, P, T>>;

/// One style fragment: an ordered set of properties plus optional pseudo
/// fragments.
///
/// A property whose value forces to `null` is left out of the evaluated
/// output, which makes `Option` values convenient for conditional styles.
pub struct Fragment<P, T> {
    pub(crate) properties: IndexMap<String, Deferred<Value, P, T>>,
    pub(crate) pseudos: Option<Deferred<PseudoMap<P, T>, P, T>>,
}

impl<P, T> Fragment<P, T> {
    /// Creates an empty fragment.
    pub fn new() -> Self {
        Self {
            properties: IndexMap::new(),
            pseudos: None,
        }
    }

    /// Sets a plain property value.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties
            .insert(name.to_string(), Deferred::Value(value.into()));
        self
    }

    /// Sets a property computed from the call parameters and theme.
    pub fn set_with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&P, &T) -> Value + 'static,
    {
        self.properties
            .insert(name.to_string(), Deferred::computed(f));
        self
    }

    /// Sets a property from an arbitrary deferred chain.
    pub fn set_deferred(mut self, name: &str, value: Deferred<Value, P, T>) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    /// Adds a pseudo fragment under `selector`.
    ///
    /// If the pseudo map was previously set as a deferred function, it is
    /// replaced by a plain map holding just this entry.
    pub fn pseudo(mut self, selector: &str, fragment: impl Into<Deferred<Fragment<P, T>, P, T>>) -> Self {
        match &mut self.pseudos {
            Some(Deferred::Value(map)) => {
                map.insert(selector.to_string(), fragment.into());
            }
            _ => {
                let mut map = IndexMap::new();
                map.insert(selector.to_string(), fragment.into());
                self.pseudos = Some(Deferred::Value(map));
            }
        }
        self
    }

    /// Merges an evaluated class body into this fragment.
    ///
    /// Plain entries are set as properties, overriding earlier ones. Object
    /// entries become pseudo fragments under their selector. This is how the
    /// style token of one site's class is composed into another descriptor.
    pub fn merge_style(mut self, style: &Map<String, Value>) -> Self {
        for (key, value) in style {
            self = match value {
                Value::Object(body) => {
                    let pseudo = body
                        .iter()
                        .fold(Fragment::<P, T>::new(), |fragment, (name, value)| {
                            fragment.set(name, value.clone())
                        });
                    self.pseudo(key, pseudo)
                }
                other => self.set(key, other.clone()),
            };
        }
        self
    }

    /// Sets the whole pseudo map from a deferred value.
    pub fn pseudos(mut self, pseudos: Deferred<PseudoMap<P, T>, P, T>) -> Self {
        self.pseudos = Some(pseudos);
        self
    }

    /// Returns the number of declared properties (pseudos not included).
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if the fragment declares no properties and no pseudos.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.pseudos.is_none()
    }
}

impl<P, T> Default for Fragment<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Clone for Fragment<P, T> {
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.clone(),
            pseudos: self.pseudos.clone(),
        }
    }
}

impl<P, T> fmt::Debug for Fragment<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("properties", &self.properties)
            .field("pseudos", &self.pseudos.as_ref().map(|p| p.is_value()))
            .finish()
    }
}

/// Named fragments: used for both class and global sections.
pub struct FragmentMap<P, T> {
    pub(crate) entries: IndexMap<String, Deferred<Fragment<P, T>, P, T>>,
}

impl<P, T> FragmentMap<P, T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Adds a named fragment (plain or deferred).
    pub fn add(mut self, name: &str, fragment: impl Into<Deferred<Fragment<P, T>, P, T>>) -> Self {
        self.entries.insert(name.to_string(), fragment.into());
        self
    }

    /// Adds a fragment computed from the call parameters and theme.
    pub fn add_with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&P, &T) -> Fragment<P, T> + 'static,
    {
        self.entries.insert(name.to_string(), Deferred::computed(f));
        self
    }

    /// Returns the declared names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Returns the number of fragments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no fragment is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P, T> Default for FragmentMap<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Clone for FragmentMap<P, T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<P, T> fmt::Debug for FragmentMap<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// Stops of one keyframe animation, keyed by `from`, `to` or a percentage.
pub struct KeyframeStops<P, T> {
    pub(crate) stops: IndexMap<String, Deferred<Fragment<P, T>, P, T>>,
}

impl<P, T> KeyframeStops<P, T> {
    /// Creates an animation with no stops.
    pub fn new() -> Self {
        Self {
            stops: IndexMap::new(),
        }
    }

    /// Adds a stop. Numeric keys are written without the `%` suffix.
    ///
    /// ```rust
    /// use sharestyle::{Fragment, KeyframeStops};
    ///
    /// let fade: KeyframeStops<(), ()> = KeyframeStops::new()
    ///     .stop("from", Fragment::new().set("opacity", 0))
    ///     .stop(50, Fragment::new().set("opacity", 0.8))
    ///     .stop("to", Fragment::new().set("opacity", 1));
    /// assert_eq!(fade.len(), 3);
    /// ```
    pub fn stop(
        mut self,
        key: impl ToString,
        fragment: impl Into<Deferred<Fragment<P, T>, P, T>>,
    ) -> Self {
        self.stops.insert(key.to_string(), fragment.into());
        self
    }

    /// Returns the number of stops.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Returns true if there are no stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

impl<P, T> Default for KeyframeStops<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Clone for KeyframeStops<P, T> {
    fn clone(&self) -> Self {
        Self {
            stops: self.stops.clone(),
        }
    }
}

impl<P, T> fmt::Debug for KeyframeStops<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.stops.iter()).finish()
    }
}

/// Named keyframe animations.
pub struct Keyframes<P, T> {
    pub(crate) animations: IndexMap<String, Deferred<KeyframeStops<P, T>, P, T>>,
}

impl<P, T> Keyframes<P, T> {
    /// Creates an empty set of animations.
    pub fn new() -> Self {
        Self {
            animations: IndexMap::new(),
        }
    }

    /// Adds a named animation.
    pub fn add(mut self, name: &str, stops: impl Into<Deferred<KeyframeStops<P, T>, P, T>>) -> Self {
        self.animations.insert(name.to_string(), stops.into());
        self
    }

    /// Returns the number of animations.
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    /// Returns true if no animation is declared.
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

impl<P, T> Default for Keyframes<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Clone for Keyframes<P, T> {
    fn clone(&self) -> Self {
        Self {
            animations: self.animations.clone(),
        }
    }
}

impl<P, T> fmt::Debug for Keyframes<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.animations.iter()).finish()
    }
}

/// The three sections of a style descriptor.
pub struct StyleDefs<P, T> {
    pub(crate) classes: Option<Deferred<FragmentMap<P, T>, P, T>>,
    pub(crate) global: Option<Deferred<FragmentMap<P, T>, P, T>>,
    pub(crate) keyframes: Option<Deferred<Keyframes<P, T>, P, T>>,
}

impl<P, T> StyleDefs<P, T> {
    /// Creates a descriptor with no sections.
    pub fn new() -> Self {
        Self {
            classes: None,
            global: None,
            keyframes: None,
        }
    }

    /// Sets the class section.
    pub fn classes(mut self, classes: impl Into<Deferred<FragmentMap<P, T>, P, T>>) -> Self {
        self.classes = Some(classes.into());
        self
    }

    /// Adds a single class to a plain class section.
    ///
    /// A deferred class section is replaced by a plain one.
    pub fn class(mut self, name: &str, fragment: impl Into<Deferred<Fragment<P, T>, P, T>>) -> Self {
        match &mut self.classes {
            Some(Deferred::Value(map)) => {
                map.entries.insert(name.to_string(), fragment.into());
            }
            _ => self.classes = Some(Deferred::Value(FragmentMap::new().add(name, fragment))),
        }
        self
    }

    /// Sets the global (unscoped) section.
    pub fn global(mut self, global: impl Into<Deferred<FragmentMap<P, T>, P, T>>) -> Self {
        self.global = Some(global.into());
        self
    }

    /// Sets the keyframes section.
    pub fn keyframes(mut self, keyframes: impl Into<Deferred<Keyframes<P, T>, P, T>>) -> Self {
        self.keyframes = Some(keyframes.into());
        self
    }
}

impl<P, T> Default for StyleDefs<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Clone for StyleDefs<P, T> {
    fn clone(&self) -> Self {
        Self {
            classes: self.classes.clone(),
            global: self.global.clone(),
            keyframes: self.keyframes.clone(),
        }
    }
}

impl<P, T> fmt::Debug for StyleDefs<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleDefs")
            .field("classes", &self.classes)
            .field("global", &self.global)
            .field("keyframes", &self.keyframes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_builder_keeps_declaration_order() {
        let fragment: Fragment<(), ()> = Fragment::new()
            .set("margin", 0)
            .set("color", "red")
            .set("display", "flex");
        let names: Vec<_> = fragment.properties.keys().cloned().collect();
        assert_eq!(names, vec!["margin", "color", "display"]);
    }

    #[test]
    fn test_fragment_set_overrides_previous_value() {
        let fragment: Fragment<(), ()> = Fragment::new().set("color", "red").set("color", "blue");
        assert_eq!(fragment.len(), 1);
        assert_eq!(
            *fragment.properties["color"].force(&(), &()),
            json!("blue")
        );
    }

    #[test]
    fn test_pseudo_replaces_deferred_map() {
        let fragment: Fragment<(), ()> = Fragment::new()
            .pseudos(Deferred::computed(|_: &(), _: &()| PseudoMap::new()))
            .pseudo("&:focus", Fragment::new().set("outline", "none"));
        match &fragment.pseudos {
            Some(Deferred::Value(map)) => assert!(map.contains_key("&:focus")),
            other => panic!("expected plain pseudo map, got {:?}", other),
        }
    }

    #[test]
    fn test_class_appends_to_plain_section() {
        let defs: StyleDefs<(), ()> = StyleDefs::new()
            .class("a", Fragment::new())
            .class("b", Fragment::new());
        match &defs.classes {
            Some(Deferred::Value(map)) => {
                assert_eq!(map.names().collect::<Vec<_>>(), vec!["a", "b"]);
            }
            other => panic!("expected plain classes, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_style_overrides_and_adds_pseudos() {
        let token = json!({"color": "red", "padding": 4, "&:hover": {"color": "blue"}});
        let fragment: Fragment<(), ()> = Fragment::new()
            .set("color", "black")
            .set("margin", 0)
            .merge_style(token.as_object().unwrap());

        let names: Vec<_> = fragment.properties.keys().cloned().collect();
        assert_eq!(names, vec!["color", "margin", "padding"]);
        assert_eq!(*fragment.properties["color"].force(&(), &()), json!("red"));
        match &fragment.pseudos {
            Some(Deferred::Value(map)) => assert!(map.contains_key("&:hover")),
            other => panic!("expected plain pseudo map, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_fragment() {
        let fragment: Fragment<(), ()> = Fragment::default();
        assert!(fragment.is_empty());
        assert!(!fragment.pseudo("&:hover", Fragment::new()).is_empty());
    }
}
