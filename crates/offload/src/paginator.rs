use crate::{
    page_iterator::AsyncPageIterator,
    pool::WorkerPool,
    sync::{Kwargs, SyncPaginator},
};
use core::fmt;
use std::sync::Arc;

/// An async wrapper around a sync client's paginator.
///
/// Usually obtained from [`AsyncClient::get_paginator`]. It shares the
/// client's worker pool, so page fetches count against the same concurrency
/// limit as ordinary operations.
///
/// [`AsyncClient::get_paginator`]: crate::AsyncClient::get_paginator
pub struct AsyncPaginator<P: SyncPaginator> {
    pool: WorkerPool,
    paginator: Arc<P>,
}

impl<P: SyncPaginator> AsyncPaginator<P> {
    pub fn new(pool: WorkerPool, paginator: P) -> Self {
        Self {
            pool,
            paginator: Arc::new(paginator),
        }
    }

    /// Starts a new paginated request described by `kwargs`.
    ///
    /// Nothing is fetched until the returned iterator is advanced. Each call
    /// yields an independent iterator.
    pub fn paginate(&self, kwargs: Kwargs) -> AsyncPageIterator<P::Source> {
        AsyncPageIterator::new(self.pool.clone(), self.paginator.paginate(kwargs))
    }

    /// The wrapped sync paginator.
    pub fn sync_paginator(&self) -> &P {
        &self.paginator
    }
}

impl<P: SyncPaginator> Clone for AsyncPaginator<P> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            paginator: Arc::clone(&self.paginator),
        }
    }
}

impl<P: SyncPaginator> fmt::Debug for AsyncPaginator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPaginator")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
