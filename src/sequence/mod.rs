//! Upload sequencing pipeline.
//!
//! Admission gates (rate limiter, batch coalescer) run before the
//! per-user lock; the sequencer owns the critical section.

pub mod batch;
pub mod caption;
pub mod locks;
pub mod ratelimit;
pub mod sequencer;

pub use batch::BatchCoalescer;
pub use ratelimit::RateLimiter;
pub use sequencer::{MediaRef, SequenceError, Sequencer, UploadOutcome, Uploader};
