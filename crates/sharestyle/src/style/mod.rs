//! Style descriptors and their evaluation.
//!
//! This module holds the declarative side of the crate:
//!
//! - [`Deferred`]: a value or a function of `(params, theme)`, forced to a
//!   fixed point.
//! - [`StyleDefs`] and friends: classes, globals and keyframes built from
//!   [`Fragment`]s.
//! - [`evaluate`]: turns a descriptor into a [`CanonicalStyle`].
//!
//! The canonical object is what gets fingerprinted (see
//! [`crate::fingerprint`]) and handed to a [`SheetEngine`](crate::SheetEngine).

mod canonical;
mod definition;
mod evaluate;
mod value;

pub use canonical::{CanonicalStyle, GLOBAL_KEY, KEYFRAMES_PREFIX};
pub use definition::{
    Fragment, FragmentMap, KeyframeStops, Keyframes, PseudoMap, StyleDefs, StyleDescriptor,
};
pub use evaluate::{evaluate, stop_selector};
pub use value::Deferred;
