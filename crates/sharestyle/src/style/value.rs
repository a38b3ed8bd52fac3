//! Deferred values: plain values or functions of `(params, theme)`.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

/// A style value that can be either a concrete value or a deferred computation.
///
/// A thunk receives the call parameters and the theme in effect and returns
/// another `Deferred` of the same shape, so chains of functions returning
/// functions are allowed. [`force`](Deferred::force) walks such a chain to its
/// fixed point.
///
/// # Example
///
/// ```rust
/// use sharestyle::Deferred;
///
/// let size: Deferred<u32, u32, ()> = Deferred::thunk(|scale: &u32, _: &()| {
///     let base = *scale * 4;
///     Deferred::thunk(move |_: &u32, _: &()| Deferred::Value(base + 2))
/// });
///
/// assert_eq!(*size.force(&3, &()), 14);
/// ```
pub enum Deferred<A, P, T> {
    /// An already-computed value.
    Value(A),
    /// A computation that produces the next link of the chain.
    Thunk(Rc<dyn Fn(&P, &T) -> Deferred<A, P, T>>),
}

impl<A, P, T> Deferred<A, P, T> {
    /// Wraps a function as a deferred value.
    pub fn thunk<F>(f: F) -> Self
    where
        F: Fn(&P, &T) -> Deferred<A, P, T> + 'static,
    {
        Deferred::Thunk(Rc::new(f))
    }

    /// Wraps a function that returns the final value directly.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&P, &T) -> A + 'static,
    {
        Deferred::Thunk(Rc::new(move |p: &P, t: &T| Deferred::Value(f(p, t))))
    }

    /// Returns true if this is a plain value.
    pub fn is_value(&self) -> bool {
        matches!(self, Deferred::Value(_))
    }

    /// Forces the chain until a plain value is reached.
    ///
    /// Plain values are borrowed; values produced by thunks are owned. The
    /// chain is walked with a loop, so stack depth does not grow with chain
    /// length. A chain that never yields a value does not terminate.
    pub fn force(&self, params: &P, theme: &T) -> Cow<'_, A>
    where
        A: Clone,
    {
        let mut next = match self {
            Deferred::Value(value) => return Cow::Borrowed(value),
            Deferred::Thunk(f) => f(params, theme),
        };
        loop {
            next = match next {
                Deferred::Value(value) => return Cow::Owned(value),
                Deferred::Thunk(f) => f(params, theme),
            };
        }
    }
}

impl<A: Clone, P, T> Clone for Deferred<A, P, T> {
    fn clone(&self) -> Self {
        match self {
            Deferred::Value(value) => Deferred::Value(value.clone()),
            Deferred::Thunk(f) => Deferred::Thunk(Rc::clone(f)),
        }
    }
}

impl<A: fmt::Debug, P, T> fmt::Debug for Deferred<A, P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Deferred::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

impl<A: Default, P, T> Default for Deferred<A, P, T> {
    fn default() -> Self {
        Deferred::Value(A::default())
    }
}

impl<A, P, T> From<A> for Deferred<A, P, T> {
    fn from(value: A) -> Self {
        Deferred::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_force_plain_value_borrows() {
        let value: Deferred<String, (), ()> = Deferred::Value("red".to_string());
        assert!(matches!(value.force(&(), &()), Cow::Borrowed(_)));
        assert_eq!(value.force(&(), &()).as_str(), "red");
    }

    #[test]
    fn test_force_uses_params_and_theme() {
        let value: Deferred<String, u8, &'static str> =
            Deferred::computed(|p: &u8, t: &&str| format!("{t}-{p}"));
        assert_eq!(value.force(&4, &"dark").as_str(), "dark-4");
    }

    #[test]
    fn test_force_walks_long_chain_without_recursion() {
        fn chain(depth: u32) -> Deferred<u32, (), ()> {
            if depth == 0 {
                Deferred::Value(7)
            } else {
                Deferred::thunk(move |_: &(), _: &()| chain(depth - 1))
            }
        }
        let deep = chain(50_000);
        assert_eq!(*deep.force(&(), &()), 7);
    }

    #[test]
    fn test_force_calls_each_link_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let value: Deferred<u8, (), ()> = Deferred::thunk(move |_: &(), _: &()| {
            counter.set(counter.get() + 1);
            Deferred::Value(1)
        });
        value.force(&(), &());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_debug_hides_closures() {
        let value: Deferred<u8, (), ()> = Deferred::computed(|_: &(), _: &()| 1);
        assert_eq!(format!("{:?}", value), "Thunk(..)");
        let value: Deferred<u8, (), ()> = 3.into();
        assert_eq!(format!("{:?}", value), "Value(3)");
    }
}
