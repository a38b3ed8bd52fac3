//! Style-tree evaluation.
//!
//! [`evaluate`] forces a [`StyleDescriptor`] against one `(params, theme)`
//! pair and flattens it into a [`CanonicalStyle`]:
//!
//! - keyframes become `@keyframes <name>` blocks whose stop keys are
//!   normalized (`from`/`to` kept, anything else suffixed with `%`);
//! - global fragments are merged under one `@global` block, omitted when
//!   empty;
//! - class fragments keep their declared names.
//!
//! Every level is forced independently: the descriptor, each section, each
//! fragment and each property. Properties that force to `null` are dropped.
//! Pseudo fragments are merged into their parent rule under their selector,
//! but only one level deep: a pseudo declared inside a pseudo is ignored.

use serde_json::{Map, Value};

use super::canonical::{CanonicalStyle, GLOBAL_KEY, KEYFRAMES_PREFIX};
use super::definition::{Fragment, StyleDescriptor};
use super::value::Deferred;

/// Evaluates a descriptor into its canonical form.
///
/// This is a pure function of its three inputs.
///
/// # Example
///
/// ```rust
/// use sharestyle::{evaluate, Fragment, StyleDefs, StyleDescriptor};
/// use serde_json::json;
///
/// let defs = StyleDefs::new().class(
///     "title",
///     Fragment::new().set_with("fontSize", |size: &u32, _: &()| json!(*size)),
/// );
///
/// let style = evaluate(&StyleDescriptor::from(defs), &18, &());
/// assert_eq!(style.get("title").unwrap()["fontSize"], json!(18));
/// ```
pub fn evaluate<P, T>(descriptor: &StyleDescriptor<P, T>, params: &P, theme: &T) -> CanonicalStyle {
    Evaluator { params, theme }.run(descriptor)
}

/// Normalizes a keyframe stop key.
///
/// ```rust
/// use sharestyle::style::stop_selector;
///
/// assert_eq!(stop_selector("from"), "from");
/// assert_eq!(stop_selector("50"), "50%");
/// ```
pub fn stop_selector(key: &str) -> String {
    match key {
        "from" | "to" => key.to_string(),
        _ => format!("{key}%"),
    }
}

struct Evaluator<'a, P, T> {
    params: &'a P,
    theme: &'a T,
}

impl<P, T> Evaluator<'_, P, T> {
    fn force<'d, A: Clone>(&self, value: &'d Deferred<A, P, T>) -> std::borrow::Cow<'d, A> {
        value.force(self.params, self.theme)
    }

    fn run(&self, descriptor: &StyleDescriptor<P, T>) -> CanonicalStyle {
        let defs = self.force(descriptor);
        let mut result = CanonicalStyle::new();

        if let Some(keyframes) = &defs.keyframes {
            let keyframes = self.force(keyframes);
            for (name, stops) in &keyframes.animations {
                let stops = self.force(stops);
                let mut block = Map::new();
                for (key, fragment) in &stops.stops {
                    block.insert(stop_selector(key), Value::Object(self.fragment(fragment, false)));
                }
                result.insert(format!("{KEYFRAMES_PREFIX}{name}"), block);
            }
        }

        if let Some(global) = &defs.global {
            let global = self.force(global);
            let mut block = Map::new();
            for (selector, fragment) in &global.entries {
                block.insert(selector.clone(), Value::Object(self.fragment(fragment, true)));
            }
            if !block.is_empty() {
                result.insert(GLOBAL_KEY, block);
            }
        }

        if let Some(classes) = &defs.classes {
            let classes = self.force(classes);
            for (name, fragment) in &classes.entries {
                result.insert(name.clone(), self.fragment(fragment, true));
            }
        }

        result
    }

    fn fragment(&self, fragment: &Deferred<Fragment<P, T>, P, T>, allow_pseudos: bool) -> Map<String, Value> {
        let fragment = self.force(fragment);
        let mut body = Map::new();

        for (name, value) in &fragment.properties {
            let value = self.force(value);
            if value.is_null() {
                continue;
            }
            body.insert(name.clone(), value.into_owned());
        }

        if allow_pseudos {
            if let Some(pseudos) = &fragment.pseudos {
                let pseudos = self.force(pseudos);
                for (selector, pseudo) in pseudos.iter() {
                    body.insert(selector.clone(), Value::Object(self.fragment(pseudo, false)));
                }
            }
        }

        body
    }
}
