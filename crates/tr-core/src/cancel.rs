//! Cooperative cancellation.
//!
//! Every pipeline stage accepts a [`CancelToken`] and checks it between
//! records in outer loops and at every algorithmic superstep (per anchor in
//! the lollipop search, per source in KSP, per circuit batch in cycle
//! enumeration).  On cancel, stages return whatever partial results exist;
//! the pipeline marks the run summary cancelled and writes no artifact.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag shared between the caller and the pipeline.
///
/// Cheap to clone (one `Arc`); all clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.  Idempotent; never blocks.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
