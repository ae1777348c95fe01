//! Scoped muting of change notifications

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared switch that mutes the auto-transfer observer.
///
/// Muting is reference counted: nested guards keep notifications muted
/// until the outermost one is dropped.
#[derive(Debug, Clone, Default)]
pub struct NotifySuppressor {
    depth: Arc<AtomicUsize>,
}

impl NotifySuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute notifications until the returned guard is dropped.
    #[must_use = "notifications are unmuted as soon as the guard is dropped"]
    pub fn suppress(&self) -> SuppressGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        SuppressGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

/// Keeps notifications muted while alive; released on drop, including
/// during unwinding and early returns.
#[derive(Debug)]
pub struct SuppressGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_guards_release_in_order() {
        let suppressor = NotifySuppressor::new();
        assert!(!suppressor.is_suppressed());

        let outer = suppressor.suppress();
        let inner = suppressor.clone().suppress();
        assert!(suppressor.is_suppressed());

        drop(inner);
        assert!(suppressor.is_suppressed());
        drop(outer);
        assert!(!suppressor.is_suppressed());
    }

    #[test]
    fn guard_released_on_early_return() {
        fn fallible(suppressor: &NotifySuppressor) -> Result<(), &'static str> {
            let _guard = suppressor.suppress();
            Err("boom")?;
            Ok(())
        }

        let suppressor = NotifySuppressor::new();
        assert!(fallible(&suppressor).is_err());
        assert!(!suppressor.is_suppressed());
    }
}
