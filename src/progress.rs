//! Per-step reporting and cooperative stopping.
//!
//! [`StepCallback`] lets a caller observe each completed extraction step
//! without owning the loop; [`CancellationToken`] lets it request a graceful
//! stop between steps (a SIGINT handler, a preview surface's quit key, or a
//! supervising thread).
//!
//! # Example
//!
//! ```
//! use mvextract::CancellationToken;
//!
//! let token = CancellationToken::new();
//! assert!(!token.is_cancelled());
//!
//! // From another thread (or a signal handler):
//! token.cancel();
//! assert!(token.is_cancelled());
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use crate::record::CodingType;

/// A snapshot of one completed extraction step.
#[derive(Debug, Clone)]
pub struct StepInfo {
    /// The step counter, starting at 0.
    pub step: u64,
    /// The frame's presentation timestamp in stream seconds.
    pub timestamp: f64,
    /// The frame's prediction mode.
    pub coding_type: CodingType,
    /// How many motion-vector records the frame carried.
    pub motion_vector_count: usize,
    /// Wall-clock time spent inside the acquisition `read()` call alone —
    /// rendering and persistence are excluded.
    pub read_time: Duration,
}

/// Trait for receiving a notification after every extraction step.
///
/// Implementations must be [`Send`] and [`Sync`]: the token wiring means a
/// callback may share state with a signal handler. Callbacks are
/// infallible — they observe but cannot halt the loop; use
/// [`CancellationToken`] for that.
pub trait StepCallback: Send + Sync {
    /// Called once per processed frame, in step order.
    fn on_step(&self, info: &StepInfo);
}

/// Cooperative stop token backed by an [`AtomicBool`].
///
/// Clone the token and hand one clone to whatever should be able to stop the
/// run; the extraction loop checks [`is_cancelled`](CancellationToken::is_cancelled)
/// before each iteration. There is no mid-call cancellation: a `read()`
/// already in flight completes first.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. All clones of this token observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
