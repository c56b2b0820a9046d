//! Bounded worker thread pool bridging blocking calls into futures.
//!
//! A [`WorkerPool`] owns a fixed number of OS threads that pull jobs from one
//! shared queue. [`WorkerPool::call`] packages a blocking closure into a job,
//! enqueues it without blocking, and returns a [`Completion`] future that
//! resolves once a worker has run the closure.
//!
//! ## Submodules
//!
//! - [`manager`] - The pool handle: sizing, submission and shutdown.
//! - [`worker`] - The loop each worker thread runs.
//! - [`request`] - Packaging of closures into queueable jobs.
//! - [`completion`] - The future handed back to the caller.
//!
//! Completion is signalled through a oneshot channel that does not depend on
//! any async runtime, so the same pool serves Tokio, smol or any other
//! executor.

mod completion;
mod manager;
mod request;
mod worker;

pub use completion::Completion;
pub use manager::{PoolConfig, WorkerPool};
