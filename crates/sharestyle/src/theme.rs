//! Theme providers.
//!
//! A site evaluates its descriptor against the theme in effect for each call.
//! Where that theme comes from is up to the host:
//!
//! 1. [`AmbientTheme`]: a shared, settable cell, the stand-in for a value
//!    provided by an enclosing UI context.
//! 2. Any `Fn() -> T` closure, through the blanket implementation.
//! 3. [`StaticTheme`]: always the same value.
//!
//! The site calls its provider at most once per invocation and treats the
//! result as opaque input to evaluation.
//!
//! # Example
//!
//! ```rust
//! use sharestyle::{AmbientTheme, ThemeProvider};
//!
//! let theme = AmbientTheme::new("light");
//! let handle = theme.clone();
//!
//! assert_eq!(theme.theme(), "light");
//! handle.set("dark");
//! assert_eq!(theme.theme(), "dark");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Trait for types that can supply the theme value in effect.
///
/// # Implementing for Closures
///
/// A blanket implementation is provided for closures:
///
/// ```rust
/// use sharestyle::ThemeProvider;
///
/// let provider = || 42u8;
/// assert_eq!(provider.theme(), 42);
/// ```
pub trait ThemeProvider<T> {
    /// Returns the current theme value.
    fn theme(&self) -> T;
}

/// Blanket implementation for zero-argument accessors.
impl<T, F> ThemeProvider<T> for F
where
    F: Fn() -> T,
{
    fn theme(&self) -> T {
        (self)()
    }
}

/// A provider that always returns the same value.
#[derive(Debug, Clone)]
pub struct StaticTheme<T> {
    value: T,
}

impl<T> StaticTheme<T> {
    /// Creates a provider for `value`.
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone> ThemeProvider<T> for StaticTheme<T> {
    fn theme(&self) -> T {
        self.value.clone()
    }
}

/// A shared, replaceable theme value.
///
/// Clones observe the same value, so a host can hand one clone to its sites
/// and keep another to switch themes. Sites pick up the new value on their
/// next invocation.
#[derive(Default)]
pub struct AmbientTheme<T> {
    current: Rc<RefCell<T>>,
}

impl<T> AmbientTheme<T> {
    /// Creates an ambient value holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            current: Rc::new(RefCell::new(initial)),
        }
    }

    /// Replaces the value, returning the previous one.
    pub fn set(&self, value: T) -> T {
        self.current.replace(value)
    }
}

impl<T: Clone> ThemeProvider<T> for AmbientTheme<T> {
    fn theme(&self) -> T {
        self.current.borrow().clone()
    }
}

impl<T> Clone for AmbientTheme<T> {
    fn clone(&self) -> Self {
        Self {
            current: Rc::clone(&self.current),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AmbientTheme<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientTheme")
            .field("current", &*self.current.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_theme() {
        let provider = StaticTheme::new(String::from("solarized"));
        assert_eq!(provider.theme(), "solarized");
        assert_eq!(provider.theme(), "solarized");
    }

    #[test]
    fn test_ambient_theme_shared_between_clones() {
        let theme = AmbientTheme::new(1u32);
        let other = theme.clone();
        assert_eq!(other.set(2), 1);
        assert_eq!(theme.theme(), 2);
    }

    #[test]
    fn test_closure_provider() {
        let mode = Rc::new(RefCell::new("light"));
        let source = Rc::clone(&mode);
        let provider = move || *source.borrow();
        assert_eq!(provider.theme(), "light");
        *mode.borrow_mut() = "dark";
        assert_eq!(provider.theme(), "dark");
    }

    #[test]
    fn test_boxed_provider() {
        let provider: Box<dyn ThemeProvider<u8>> = Box::new(StaticTheme::new(3));
        assert_eq!(provider.theme(), 3);
    }

    #[test]
    fn test_ambient_debug() {
        let theme = AmbientTheme::new("dark");
        assert_eq!(format!("{:?}", theme), r#"AmbientTheme { current: "dark" }"#);
    }
}
