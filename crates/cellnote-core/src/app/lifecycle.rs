//! Lifecycle - トリガー側とワーカー側で共有する状態フラグ
//!
//! プロセス全体のグローバル変数の代わりに、このオブジェクトを `Arc` で共有します。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Phase::Starting,
            1 => Phase::Running,
            2 => Phase::ShuttingDown,
            _ => Phase::Stopped,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting_down",
            Phase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic phase flag. Phases only move forward.
#[derive(Debug)]
pub struct Lifecycle {
    phase: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Starting as u8),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Advance to `next`. Returns `false` when already at or past it.
    pub fn advance(&self, next: Phase) -> bool {
        let target = next as u8;
        let previous = self.phase.fetch_max(target, Ordering::AcqRel);
        previous < target
    }

    /// Triggers are accepted while starting or running.
    pub fn accepts_triggers(&self) -> bool {
        matches!(self.phase(), Phase::Starting | Phase::Running)
    }

    pub fn is_stopped(&self) -> bool {
        self.phase() == Phase::Stopped
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Starting);
        assert!(lifecycle.accepts_triggers());

        assert!(lifecycle.advance(Phase::Running));
        assert!(lifecycle.advance(Phase::ShuttingDown));
        assert!(!lifecycle.accepts_triggers());

        assert!(!lifecycle.advance(Phase::Running));
        assert_eq!(lifecycle.phase(), Phase::ShuttingDown);

        assert!(lifecycle.advance(Phase::Stopped));
        assert!(lifecycle.is_stopped());
        assert!(!lifecycle.advance(Phase::Stopped));
    }
}
