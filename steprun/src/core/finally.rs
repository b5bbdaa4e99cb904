//! Scoped guard that runs a closure exactly once when it goes out of scope.

use std::ops::{Deref, DerefMut};

/// Owns `value` for the duration of a scope and hands it to `on_exit` on drop.
///
/// Drop runs on every exit path: normal return, early `?` return and panic
/// unwinding. The guard derefs to the wrapped value so the scope can keep
/// using it.
pub struct Finally<T, F>
where
    F: FnOnce(&mut T),
{
    value: T,
    on_exit: Option<F>,
}

impl<T, F> Finally<T, F>
where
    F: FnOnce(&mut T),
{
    pub fn new(value: T, on_exit: F) -> Self {
        Self {
            value,
            on_exit: Some(on_exit),
        }
    }
}

impl<T, F> Deref for Finally<T, F>
where
    F: FnOnce(&mut T),
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, F> DerefMut for Finally<T, F>
where
    F: FnOnce(&mut T),
{
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T, F> Drop for Finally<T, F>
where
    F: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(&mut self.value);
        }
    }
}
