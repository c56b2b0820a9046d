//! Packaging of blocking closures into queueable jobs.

use core::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::oneshot;

/// A type-erased unit of work run by exactly one worker.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// What a worker reports back for one job.
///
/// The outer `Err` carries the panic message when the closure panicked.
pub(crate) type Outcome<T, E> = Result<Result<T, E>, String>;

/// Wraps `f` so that running the job sends its outcome through `tx`.
///
/// Panics are caught here so a misbehaving closure never takes its worker
/// down with it.
pub(crate) fn package<F, T, E>(f: F, tx: oneshot::Sender<Outcome<T, E>>) -> Job
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message);

        #[cfg(feature = "tracing")]
        if let Err(message) = &outcome {
            tracing::warn!("Blocking call panicked: {message}");
        }

        if tx.send(outcome).is_err() {
            // The caller dropped its `Completion`; the work itself is done.
            #[cfg(feature = "tracing")]
            tracing::trace!("Caller detached before the blocking call completed");
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
