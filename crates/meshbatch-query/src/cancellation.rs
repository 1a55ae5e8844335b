//! A cooperative cancellation signal shared by every node in one plan enumeration (spec §5
//! "Cancellation").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Checked once per produced row by every [`crate::plan::PlanNode`]; set by the caller that
/// owns the enumeration.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
