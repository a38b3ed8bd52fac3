//! Content addressing for canonical style objects.
//!
//! A [`Fingerprint`] is the only identity a style artifact has: two
//! evaluations that produce structurally equal [`CanonicalStyle`]s share one
//! sheet. The digest is a fixed-seed SeaHash over a tagged walk of the tree,
//! with object keys visited in sorted order, so it is stable across runs,
//! processes and declaration orders.
//!
//! The hash is not cryptographic. Collisions are treated as identity; caches
//! stay small (tens of variants per site), which keeps that risk negligible.

use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use seahash::SeaHasher;
use serde_json::{Map, Value};

use crate::style::CanonicalStyle;

/// Stable digest of a [`CanonicalStyle`].
///
/// Displays as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Computes the fingerprint of a canonical style object.
    pub fn of(style: &CanonicalStyle) -> Self {
        fingerprint(style)
    }

    /// Returns the raw digest.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Fingerprint {
    fn from(raw: u64) -> Self {
        Fingerprint(raw)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Fingerprint)
    }
}

/// Computes the fingerprint of a canonical style object.
///
/// ```rust
/// use sharestyle::{evaluate, fingerprint, Fragment, StyleDefs, StyleDescriptor};
///
/// let a: StyleDescriptor<(), ()> = StyleDefs::new()
///     .class("x", Fragment::new().set("color", "red").set("margin", 0))
///     .into();
/// let b: StyleDescriptor<(), ()> = StyleDefs::new()
///     .class("x", Fragment::new().set("margin", 0).set("color", "red"))
///     .into();
///
/// assert_eq!(
///     fingerprint(&evaluate(&a, &(), &())),
///     fingerprint(&evaluate(&b, &(), &())),
/// );
/// ```
pub fn fingerprint(style: &CanonicalStyle) -> Fingerprint {
    let mut hasher = SeaHasher::new();
    feed_map(&mut hasher, style.as_map());
    Fingerprint(hasher.finish())
}

fn feed_str(hasher: &mut SeaHasher, s: &str) {
    hasher.write_u64(s.len() as u64);
    hasher.write(s.as_bytes());
}

fn feed_map(hasher: &mut SeaHasher, map: &Map<String, Value>) {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    hasher.write_u8(b'{');
    hasher.write_u64(entries.len() as u64);
    for (key, value) in entries {
        feed_str(hasher, key);
        feed_value(hasher, value);
    }
}

fn feed_value(hasher: &mut SeaHasher, value: &Value) {
    match value {
        Value::Null => hasher.write_u8(b'n'),
        Value::Bool(b) => {
            hasher.write_u8(b'b');
            hasher.write_u8(*b as u8);
        }
        Value::Number(n) => {
            hasher.write_u8(b'#');
            feed_str(hasher, &n.to_string());
        }
        Value::String(s) => {
            hasher.write_u8(b's');
            feed_str(hasher, s);
        }
        Value::Array(items) => {
            hasher.write_u8(b'[');
            hasher.write_u64(items.len() as u64);
            for item in items {
                feed_value(hasher, item);
            }
        }
        Value::Object(map) => feed_map(hasher, map),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn property() -> impl Strategy<Value = (String, Value)> {
        (
            "[a-z]{1,8}",
            prop_oneof![
                any::<i32>().prop_map(Value::from),
                "[a-z0-9 ]{0,12}".prop_map(Value::from),
            ],
        )
    }

    proptest! {
        #[test]
        fn fingerprint_ignores_declaration_order(
            props in proptest::collection::vec(property(), 0..12),
        ) {
            let mut forward = Map::new();
            for (k, v) in props.iter() {
                forward.entry(k.clone()).or_insert_with(|| v.clone());
            }
            let mut backward = Map::new();
            for (k, v) in forward.iter().rev() {
                backward.insert(k.clone(), v.clone());
            }

            let mut a = CanonicalStyle::new();
            a.insert("root", forward);
            let mut b = CanonicalStyle::new();
            b.insert("root", backward);

            prop_assert_eq!(fingerprint(&a), fingerprint(&b));
        }

        #[test]
        fn fingerprint_is_deterministic(
            props in proptest::collection::vec(property(), 0..12),
            class in "[a-z]{1,6}",
        ) {
            let body: Map<String, Value> = props.into_iter().collect();
            let mut a = CanonicalStyle::new();
            a.insert(class.clone(), body.clone());
            let b = a.clone();

            prop_assert_eq!(fingerprint(&a), fingerprint(&b));
            prop_assert_eq!(fingerprint(&a), fingerprint(&a));
        }
    }
}
