//! Write Lock Flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that suppresses writes to the board when set.
///
/// The relay only ever reads it. Relaxed ordering is enough: the flag changes
/// rarely and a few bytes of lag are acceptable.
#[derive(Debug, Clone, Default)]
pub struct LockFlag(Arc<AtomicBool>);

impl LockFlag {
    /// Create a flag with the given initial value
    pub fn new(locked: bool) -> Self {
        Self(Arc::new(AtomicBool::new(locked)))
    }

    /// Check whether writes are suppressed
    pub fn is_locked(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Change the flag (owner side)
    pub fn set_locked(&self, locked: bool) {
        self.0.store(locked, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let owner = LockFlag::new(false);
        let reader = owner.clone();
        assert!(!reader.is_locked());
        owner.set_locked(true);
        assert!(reader.is_locked());
    }
}
