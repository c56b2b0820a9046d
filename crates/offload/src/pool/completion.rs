use super::request::Outcome;
use crate::error::{Error, Result};
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use pin_project_lite::pin_project;
use tokio::sync::oneshot;

pin_project! {
    /// A future that resolves once a worker has run a blocking call.
    ///
    /// Returned by [`WorkerPool::call`]. The call is already queued when this
    /// value is created; polling only waits for the outcome. Dropping it
    /// detaches the caller without stopping the call, which runs to
    /// completion on its worker regardless.
    ///
    /// [`WorkerPool::call`]: crate::WorkerPool::call
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Completion<T, E> {
        #[pin]
        rx: Option<oneshot::Receiver<Outcome<T, E>>>,
        rejected: Option<Error<E>>,
    }
}

impl<T, E> Completion<T, E> {
    pub(crate) const fn pending(rx: oneshot::Receiver<Outcome<T, E>>) -> Self {
        Self {
            rx: Some(rx),
            rejected: None,
        }
    }

    pub(crate) const fn rejected(err: Error<E>) -> Self {
        Self {
            rx: None,
            rejected: Some(err),
        }
    }
}

impl<T, E> Future for Completion<T, E> {
    type Output = Result<T, E>;

    /// Waits for the worker's outcome.
    ///
    /// A closure error is surfaced as [`Error::Client`] holding the very value
    /// the closure returned. A worker that drops the job unrun (the pool went
    /// away) is reported as [`Error::PoolShutdown`].
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if let Some(err) = this.rejected.take() {
            return Poll::Ready(Err(err));
        }

        let Some(rx) = this.rx.as_mut().as_pin_mut() else {
            return Poll::Ready(Err(Error::PoolShutdown));
        };

        let outcome = match rx.poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(outcome) => outcome,
        };
        this.rx.set(None);

        Poll::Ready(match outcome {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(Error::Client(err)),
            Ok(Err(message)) => Err(Error::WorkerPanicked { message }),
            Err(_) => Err(Error::PoolShutdown),
        })
    }
}
