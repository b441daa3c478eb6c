//! Echo suppression token for presentation adapters.
//!
//! An observer's notification handler commonly writes the incoming model
//! value into a presentation widget, and the widget's own "value changed"
//! signal would otherwise re-enter `set` and loop. The discipline: hold an
//! [`EchoGuard`] while applying a model value to the presentation, and drop
//! outgoing edit events whenever the flag is active.

use std::sync::atomic::{AtomicBool, Ordering};

/// Per-observer re-entrancy flag with scoped acquisition.
///
/// Not nested: one guard at a time per observer, matching the one
/// model-to-presentation update in flight that the discipline allows.
#[derive(Debug, Default)]
pub struct EchoSuppressor {
    active: AtomicBool,
}

impl EchoSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag for the duration of a presentation update.
    ///
    /// The flag clears when the guard drops, on every exit path, including
    /// a panic during the update.
    pub fn suppress(&self) -> EchoGuard<'_> {
        self.active.store(true, Ordering::Release);
        EchoGuard { flag: &self.active }
    }

    /// Whether a presentation update is in flight; outgoing edit events
    /// must be dropped while this is true.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Scoped hold on an [`EchoSuppressor`]; clears the flag on drop.
#[derive(Debug)]
pub struct EchoGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for EchoGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_on_drop() {
        let suppressor = EchoSuppressor::new();
        assert!(!suppressor.is_active());
        {
            let _guard = suppressor.suppress();
            assert!(suppressor.is_active());
        }
        assert!(!suppressor.is_active());
    }

    #[test]
    fn guard_clears_on_panic_path() {
        let suppressor = EchoSuppressor::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = suppressor.suppress();
            panic!("presentation update failed");
        }));
        assert!(result.is_err());
        assert!(!suppressor.is_active());
    }
}
