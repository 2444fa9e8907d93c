//! # Background Work Handles
//!
//! The only concurrency in the bookkeeping core.
//!
//! ```text
//! Frame N:
//!   Render thread: chunk.visible ──move──► PendingJob (worker fills it)
//!   Render thread: ... other chunks ...
//!   Render thread: job.complete() ◄──join── worker
//!
//! Swap-remove / truncate / dispose of a chunk:
//!   complete() FIRST, then touch the storage
//! ```
//!
//! A pending job owns its buffer until joined. Nothing else can observe
//! or free that buffer while the worker runs.

mod job;

pub use job::PendingJob;
