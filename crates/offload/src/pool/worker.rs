use super::request::Job;
use crossbeam_channel::Receiver;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Body of a single worker thread.
///
/// Pulls jobs off the shared queue one at a time until every sender is gone
/// and the queue is drained. `active` counts jobs currently executing across
/// the whole pool.
pub(crate) fn worker_loop(_worker_id: usize, rx: Receiver<Job>, active: Arc<AtomicUsize>) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} started");

    while let Ok(job) = rx.recv() {
        active.fetch_add(1, Ordering::AcqRel);
        job();
        active.fetch_sub(1, Ordering::AcqRel);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {_worker_id} stopped");
}
