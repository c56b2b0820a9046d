//! Dynamic forwarding of a sync client's operations.
//!
//! [`AsyncClient`] never enumerates the operations it forwards. A name is
//! checked against [`SyncClient::operations`] the first time it is looked up
//! and turned into an [`Operation`], which is memoized so every later lookup
//! of the same name returns the same wrapper.

use crate::{
    error::{Error, Result},
    paginator::AsyncPaginator,
    pool::{Completion, WorkerPool},
    sync::{Document, Kwargs, SyncClient},
};
use core::fmt;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// An awaitable wrapper around one named operation of a sync client.
///
/// Obtained from [`AsyncClient::operation`]. Every [`call`](Operation::call)
/// runs [`SyncClient::invoke`] for this name on the client's worker pool.
pub struct Operation<C: SyncClient> {
    name: Arc<str>,
    client: Arc<C>,
    pool: WorkerPool,
}

impl<C: SyncClient> Operation<C> {
    fn new(name: &str, client: Arc<C>, pool: WorkerPool) -> Self {
        Self {
            name: Arc::from(name),
            client,
            pool,
        }
    }

    /// The operation name as known to the sync client.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the operation with `kwargs` on a worker thread.
    ///
    /// The call is queued immediately; the returned future resolves to the
    /// client's response, or to [`Error::Client`] carrying the client's own
    /// error unchanged.
    pub fn call(&self, kwargs: Kwargs) -> Completion<Document, C::Error> {
        let client = Arc::clone(&self.client);
        let name = Arc::clone(&self.name);
        self.pool.call(move || client.invoke(&name, kwargs))
    }
}

impl<C: SyncClient> fmt::Debug for Operation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An async facade over a blocking [`SyncClient`].
///
/// Every operation of the wrapped client is reachable by name through
/// [`operation`](AsyncClient::operation) or [`call`](AsyncClient::call), and
/// runs on a bounded [`WorkerPool`] so the caller's executor is never blocked.
///
/// ## Pool ownership
///
/// [`AsyncClient::new`] spawns a pool sized to the client's
/// `max_pool_connections`, keeping in-flight blocking calls within the
/// client's connection budget. Its threads exit once the client and every
/// paginator created from it are gone. [`AsyncClient::with_pool`] borrows a
/// caller-supplied pool instead, which the client never shuts down.
pub struct AsyncClient<C: SyncClient> {
    client: Arc<C>,
    pool: WorkerPool,
    owns_pool: bool,
    operations: RwLock<HashMap<String, Arc<Operation<C>>>>,
}

impl<C: SyncClient> AsyncClient<C> {
    /// Wraps `client` with a dedicated pool of
    /// `client.config().max_pool_connections` workers.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if the client reports a connection pool
    ///   size of zero.
    /// - [`Error::Spawn`] if a worker thread could not be started.
    pub fn new(client: Arc<C>) -> Result<Self, C::Error> {
        let pool =
            WorkerPool::new(client.config().max_pool_connections).map_err(|err| err.widen())?;
        Ok(Self::from_parts(client, pool, true))
    }

    /// Takes ownership of `client` and wraps it as [`new`](Self::new) does.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn from_client(client: C) -> Result<Self, C::Error> {
        Self::new(Arc::new(client))
    }

    /// Wraps `client` using an externally owned `pool`.
    ///
    /// The pool's capacity overrides the client's connection pool size.
    pub fn with_pool(client: Arc<C>, pool: WorkerPool) -> Self {
        Self::from_parts(client, pool, false)
    }

    fn from_parts(client: Arc<C>, pool: WorkerPool, owns_pool: bool) -> Self {
        Self {
            client,
            pool,
            owns_pool,
            operations: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves `name` to its awaitable wrapper.
    ///
    /// The first successful lookup of a name builds the wrapper and caches it;
    /// later lookups return the same [`Arc`].
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOperation`] if the sync client has no operation called
    /// `name`. Nothing is queued in that case.
    pub fn operation(&self, name: &str) -> Result<Arc<Operation<C>>, C::Error> {
        if let Some(operation) = self.operations.read().get(name) {
            return Ok(Arc::clone(operation));
        }

        if !self.client.has_operation(name) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Rejected unknown operation `{name}`");
            return Err(Error::UnknownOperation {
                name: name.to_owned(),
            });
        }

        // Re-checked under the write lock so two racing lookups of the same
        // name still end up sharing one wrapper.
        let mut operations = self.operations.write();
        let operation = operations.entry(name.to_owned()).or_insert_with(|| {
            #[cfg(feature = "tracing")]
            tracing::debug!("Resolved operation `{name}`");
            Arc::new(Operation::new(
                name,
                Arc::clone(&self.client),
                self.pool.clone(),
            ))
        });
        Ok(Arc::clone(operation))
    }

    /// Looks up `name` and runs it with `kwargs`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownOperation`] if `name` is not an operation of the
    ///   client.
    /// - [`Error::Client`] with the client's error if the operation fails.
    /// - [`Error::WorkerPanicked`] or [`Error::PoolShutdown`] if the pool
    ///   could not deliver a result.
    pub async fn call(&self, name: &str, kwargs: Kwargs) -> Result<Document, C::Error> {
        self.operation(name)?.call(kwargs).await
    }

    /// Returns an async paginator for the operation `name`.
    ///
    /// # Errors
    ///
    /// [`Error::Client`] with whatever the sync client raises for `name`.
    pub fn get_paginator(&self, name: &str) -> Result<AsyncPaginator<C::Paginator>, C::Error> {
        let paginator = self.client.get_paginator(name).map_err(Error::Client)?;
        Ok(AsyncPaginator::new(self.pool.clone(), paginator))
    }

    /// The sync client's error namespace, passed through as-is.
    pub fn exceptions(&self) -> &C::Exceptions {
        self.client.exceptions()
    }

    /// Every operation name the client accepts.
    pub fn operation_names(&self) -> &[&'static str] {
        self.client.operations()
    }

    /// How many operation wrappers have been resolved so far.
    pub fn resolved(&self) -> usize {
        self.operations.read().len()
    }

    /// The wrapped sync client.
    pub const fn sync_client(&self) -> &Arc<C> {
        &self.client
    }

    /// The pool every operation and paginator of this client runs on.
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Returns `true` if the pool was created by this client.
    pub const fn owns_pool(&self) -> bool {
        self.owns_pool
    }
}

impl<C: SyncClient> fmt::Debug for AsyncClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncClient")
            .field("pool", &self.pool)
            .field("owns_pool", &self.owns_pool)
            .field("resolved", &self.resolved())
            .finish_non_exhaustive()
    }
}
