//! Prelude for convenient imports.
//!
//! Re-exports the types needed to declare and consume styles:
//!
//! ```rust
//! use sharestyle::prelude::*;
//!
//! let context = StyleContext::new();
//! let site = context.define(
//!     StyleDefs::<(), ()>::new().class("root", Fragment::new().set("margin", 0)),
//!     StyleOptions::new(),
//! );
//! let lease = site.acquire(&()).unwrap();
//! assert!(lease.classes().contains("root"));
//! ```

// Declaring styles
pub use crate::style::{Deferred, Fragment, FragmentMap, KeyframeStops, Keyframes, StyleDefs};

// Defining and consuming sites
pub use crate::config::{SiteConfig, StyleOptions};
pub use crate::site::{StyleBinding, StyleContext, StyleLease, StyleSite};

// Themes
pub use crate::theme::{AmbientTheme, StaticTheme, ThemeProvider};

// Errors
pub use crate::error::StyleError;
