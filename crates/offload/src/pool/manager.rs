use super::{
    completion::Completion,
    request::{Job, package},
    worker::worker_loop,
};
use crate::{
    error::{Error, Result},
    sync::ClientConfig,
};
use core::fmt;
use crossbeam_channel::Sender;
use parking_lot::RwLock;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use tokio::sync::oneshot;

/// Sizing and naming of a [`WorkerPool`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads, and therefore the maximum number of blocking
    /// calls running at once.
    pub capacity: usize,
    /// Prefix for worker thread names; workers are named `{prefix}-{index}`.
    pub thread_name: String,
}

impl PoolConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: ClientConfig::DEFAULT_MAX_POOL_CONNECTIONS,
            thread_name: "offload-worker".to_owned(),
        }
    }
}

struct PoolInner {
    capacity: usize,
    queue: RwLock<Option<Sender<Job>>>,
    active: Arc<AtomicUsize>,
}

/// A bounded pool of OS threads that runs blocking calls for async callers.
///
/// Cloning the handle is cheap and every clone refers to the same threads, so
/// one pool can back several clients. Jobs queue without bound; at most
/// [`capacity`](WorkerPool::capacity) of them run at any moment.
///
/// The threads exit once the pool is [shut down](WorkerPool::shutdown), or
/// once the last handle is dropped, after draining whatever was queued.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Spawns a pool with `capacity` workers and default thread names.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if `capacity` is zero.
    /// - [`Error::Spawn`] if a worker thread could not be started.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(capacity))
    }

    /// Spawns a pool described by `config`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if `config.capacity` is zero.
    /// - [`Error::Spawn`] if a worker thread could not be started. Workers
    ///   already started wind down on their own.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let active = Arc::new(AtomicUsize::new(0));

        for worker_id in 0..config.capacity {
            let rx = rx.clone();
            let active = Arc::clone(&active);
            thread::Builder::new()
                .name(format!("{}-{worker_id}", config.thread_name))
                .spawn(move || worker_loop(worker_id, rx, active))
                .map_err(Error::Spawn)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Started worker pool '{}' with {} workers",
            config.thread_name,
            config.capacity
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                capacity: config.capacity,
                queue: RwLock::new(Some(tx)),
                active,
            }),
        })
    }

    /// Queues `f` on the pool and returns a future for its result.
    ///
    /// Queueing never blocks. `Ok` values are returned as-is and `Err` values
    /// come back as [`Error::Client`] holding the same value, so callers can
    /// match on `f`'s own error type. If the pool is shut down the returned
    /// future resolves to [`Error::PoolShutdown`] and `f` is never run.
    pub fn call<F, T, E>(&self, f: F) -> Completion<T, E>
    where
        F: FnOnce() -> core::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        match self.submit(package(f, tx)) {
            Ok(()) => Completion::pending(rx),
            Err(err) => Completion::rejected(err.widen()),
        }
    }

    fn submit(&self, job: Job) -> Result<()> {
        let queue = self.inner.queue.read();
        let Some(tx) = queue.as_ref() else {
            return Err(Error::PoolShutdown);
        };
        tx.send(job).map_err(|_| Error::PoolShutdown)
    }

    /// Stops accepting new work.
    ///
    /// Jobs already queued still run; each worker exits once the queue is
    /// empty. Calling this more than once has no further effect. This never
    /// waits for the workers.
    pub fn shutdown(&self) {
        let closed = self.inner.queue.write().take();
        if let Some(_tx) = closed {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Worker pool shutting down ({} queued, {} active)",
                _tx.len(),
                self.active()
            );
        }
    }

    /// Returns `true` once [`shutdown`](WorkerPool::shutdown) was called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.queue.read().is_none()
    }

    /// The number of worker threads.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.inner.queue.read().as_ref().map_or(0, Sender::len)
    }

    /// Jobs currently running on a worker.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Returns `true` if both handles refer to the same pool.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity())
            .field("queued", &self.queued())
            .field("active", &self.active())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}
