//! Scoped suppression of gradient tracking.
//!
//! The flag is thread-local: a guard taken on the script thread never changes
//! what another thread observes. Guards nest, and each one restores the state it
//! found when it is dropped.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Returns whether engine operations on this thread should record gradients.
pub fn is_enabled() -> bool {
    GRAD_ENABLED.with(Cell::get)
}

/// Restores the previous grad mode when dropped.
#[must_use = "grad tracking is restored as soon as the guard is dropped"]
pub struct GradModeGuard {
    prev: bool,
    // Tied to the thread whose flag it saved.
    _not_send: PhantomData<*const ()>,
}

impl GradModeGuard {
    fn set(enabled: bool) -> Self {
        let prev = GRAD_ENABLED.with(|flag| flag.replace(enabled));
        GradModeGuard {
            prev,
            _not_send: PhantomData,
        }
    }
}

impl Drop for GradModeGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|flag| flag.set(self.prev));
    }
}

/// Disables gradient tracking until the returned guard is dropped.
pub fn no_grad() -> GradModeGuard {
    GradModeGuard::set(false)
}

/// Re-enables gradient tracking until the returned guard is dropped.
pub fn enable_grad() -> GradModeGuard {
    GradModeGuard::set(true)
}
