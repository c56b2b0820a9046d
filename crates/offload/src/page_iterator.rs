use crate::{
    error::Result,
    pool::{Completion, WorkerPool},
    sync::{Page, PageSource},
};
use core::{
    fmt,
    future::{Future, poll_fn},
    pin::Pin,
    task::{Context, Poll},
};
use futures::stream::{FusedStream, Stream};
use parking_lot::Mutex;
use std::sync::Arc;

/// The outcome of one [`AsyncPageIterator::advance`].
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// The next page of results.
    Page(Page),
    /// The page sequence has ended. Once returned, every later advance
    /// returns this again until the iterator is restarted.
    EndOfSequence,
}

impl Step {
    /// Returns the page, if this step carries one.
    pub fn into_page(self) -> Option<Page> {
        match self {
            Self::Page(page) => Some(page),
            Self::EndOfSequence => None,
        }
    }
}

/// Lifecycle of an [`AsyncPageIterator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// More pages may follow.
    Ready,
    /// The end of the sequence was reached.
    Exhausted,
}

type Fetch<S> = Pin<Box<Completion<Option<Page>, <S as PageSource>::Error>>>;

type Cursor<S> = Arc<Mutex<Option<<S as PageSource>::Pages>>>;

/// Asynchronously walks the pages of a sync [`PageSource`].
///
/// Every page is fetched on the worker pool by advancing the source's blocking
/// iterator there. A fetch that is in flight when the caller stops waiting is
/// kept, and the next [`advance`](Self::advance) picks up its page, so
/// abandoning an `advance` neither loses nor refetches a page.
///
/// Errors raised by the source are returned as [`Error::Client`] and leave the
/// iterator [`State::Ready`]: calling `advance` again retries from the same
/// position.
///
/// The iterator is also a [`Stream`] of `Result<Page, _>` that ends where
/// `advance` would return [`Step::EndOfSequence`].
///
/// [`Error::Client`]: crate::Error::Client
pub struct AsyncPageIterator<S: PageSource> {
    pool: WorkerPool,
    source: Arc<S>,
    cursor: Cursor<S>,
    state: State,
    in_flight: Option<Fetch<S>>,
}

impl<S: PageSource> AsyncPageIterator<S> {
    /// Wraps `source`, fetching its pages on `pool`.
    pub fn new(pool: WorkerPool, source: S) -> Self {
        Self {
            pool,
            source: Arc::new(source),
            cursor: Arc::new(Mutex::new(None)),
            state: State::Ready,
            in_flight: None,
        }
    }

    /// Resets the iterator to the first page.
    ///
    /// A fresh traversal of the source is begun lazily by the next advance,
    /// so restarting never blocks. Any fetch still in flight is abandoned.
    pub fn start(&mut self) -> &mut Self {
        #[cfg(feature = "tracing")]
        tracing::trace!("Restarting page iterator");

        self.cursor = Arc::new(Mutex::new(None));
        self.state = State::Ready;
        self.in_flight = None;
        self
    }

    pub const fn state(&self) -> State {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// Fetches the next page.
    ///
    /// # Errors
    ///
    /// - [`Error::Client`] if the source failed to produce the page.
    /// - [`Error::WorkerPanicked`] or [`Error::PoolShutdown`] if the pool
    ///   could not run the fetch.
    ///
    /// None of these exhaust the iterator.
    ///
    /// [`Error::Client`]: crate::Error::Client
    /// [`Error::WorkerPanicked`]: crate::Error::WorkerPanicked
    /// [`Error::PoolShutdown`]: crate::Error::PoolShutdown
    pub async fn advance(&mut self) -> Result<Step, S::Error> {
        poll_fn(|cx| self.poll_advance(cx)).await
    }

    /// Polls for the next page. See [`advance`](Self::advance).
    pub fn poll_advance(&mut self, cx: &mut Context<'_>) -> Poll<Result<Step, S::Error>> {
        if self.state == State::Exhausted {
            return Poll::Ready(Ok(Step::EndOfSequence));
        }

        let mut fetch = match self.in_flight.take() {
            Some(fetch) => fetch,
            None => self.fetch_next(),
        };

        match fetch.as_mut().poll(cx) {
            Poll::Pending => {
                self.in_flight = Some(fetch);
                Poll::Pending
            }
            Poll::Ready(Ok(Some(page))) => Poll::Ready(Ok(Step::Page(page))),
            Poll::Ready(Ok(None)) => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Page iterator exhausted");

                self.state = State::Exhausted;
                Poll::Ready(Ok(Step::EndOfSequence))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
        }
    }

    fn fetch_next(&self) -> Fetch<S> {
        let source = Arc::clone(&self.source);
        let cursor = Arc::clone(&self.cursor);
        Box::pin(self.pool.call(move || {
            let mut cursor = cursor.lock();
            let pages = cursor.get_or_insert_with(|| source.pages());
            pages.next().transpose()
        }))
    }
}

impl<S: PageSource> Stream for AsyncPageIterator<S> {
    type Item = core::result::Result<Page, crate::Error<S::Error>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_advance(cx).map(|step| match step {
            Ok(Step::Page(page)) => Some(Ok(page)),
            Ok(Step::EndOfSequence) => None,
            Err(err) => Some(Err(err)),
        })
    }
}

impl<S: PageSource> FusedStream for AsyncPageIterator<S> {
    fn is_terminated(&self) -> bool {
        self.is_exhausted()
    }
}

impl<S: PageSource> fmt::Debug for AsyncPageIterator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPageIterator")
            .field("state", &self.state)
            .field("in_flight", &self.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AsyncClient, Error, Kwargs,
        testing::{MockClient, MockError, item_names, kwargs},
    };
    use futures::{FutureExt, StreamExt, TryStreamExt};
    use serde_json::json;

    fn client(items: &[&str]) -> AsyncClient<MockClient> {
        AsyncClient::from_client(MockClient::with_items(items.iter().copied())).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn yields_every_page_then_ends() {
        let client = client(&["a", "b", "c", "d", "e"]);
        let paginator = client.get_paginator("list_items").unwrap();
        let mut pages = paginator.paginate(kwargs(json!({ "PageSize": 2 })));

        let mut names = Vec::new();
        while let Step::Page(page) = pages.advance().await.unwrap() {
            names.extend(item_names(&page));
        }
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
        assert!(pages.is_exhausted());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exhausted_iterator_stays_exhausted_without_fetching() {
        let sync = Arc::new(MockClient::with_items(["a"]));
        let client = AsyncClient::new(Arc::clone(&sync)).unwrap();
        let mut pages = client
            .get_paginator("list_items")
            .unwrap()
            .paginate(kwargs(json!({ "PageSize": 10 })));

        assert!(matches!(pages.advance().await.unwrap(), Step::Page(_)));
        assert_eq!(pages.advance().await.unwrap(), Step::EndOfSequence);
        let fetched = sync.page_fetches();

        for _ in 0..3 {
            assert_eq!(pages.advance().await.unwrap(), Step::EndOfSequence);
            assert_eq!(pages.state(), State::Exhausted);
        }
        assert_eq!(sync.page_fetches(), fetched);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn source_errors_do_not_exhaust() {
        let sync = Arc::new(MockClient::with_items(["a", "b", "c"]).failing_fetch(2));
        let client = AsyncClient::new(Arc::clone(&sync)).unwrap();
        let mut pages = client
            .get_paginator("list_items")
            .unwrap()
            .paginate(kwargs(json!({ "PageSize": 1 })));

        let first = pages.advance().await.unwrap().into_page().unwrap();
        assert_eq!(item_names(&first), ["a"]);

        let err = pages.advance().await.unwrap_err();
        assert!(matches!(err, Error::Client(MockError::Transient)));
        assert_eq!(pages.state(), State::Ready);

        let retried = pages.advance().await.unwrap().into_page().unwrap();
        assert_eq!(item_names(&retried), ["b"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_result_yields_a_single_empty_page() {
        let client = client(&[]);
        let mut pages = client
            .get_paginator("list_items")
            .unwrap()
            .paginate(Kwargs::new());

        let page = pages.advance().await.unwrap().into_page().unwrap();
        assert!(item_names(&page).is_empty());
        assert_eq!(pages.advance().await.unwrap(), Step::EndOfSequence);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_restarts_from_the_first_page() {
        let client = client(&["a", "b", "c"]);
        let mut pages = client
            .get_paginator("list_items")
            .unwrap()
            .paginate(kwargs(json!({ "PageSize": 2 })));

        let first: Vec<Page> = (&mut pages).try_collect().await.unwrap();
        assert!(pages.is_terminated());

        let second: Vec<Page> = pages.start().try_collect().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn paginate_returns_independent_iterators() {
        let client = client(&["a", "b", "c"]);
        let paginator = client.get_paginator("list_items").unwrap();
        let args = kwargs(json!({ "PageSize": 1 }));
        let mut left = paginator.paginate(args.clone());
        let mut right = paginator.paginate(args);

        left.advance().await.unwrap();
        left.advance().await.unwrap();
        let page = right.advance().await.unwrap().into_page().unwrap();
        assert_eq!(item_names(&page), ["a"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_advance_neither_skips_nor_refetches() {
        let sync = Arc::new(MockClient::with_items(["a", "b", "c"]));
        let client = AsyncClient::new(Arc::clone(&sync)).unwrap();
        let mut pages = client
            .get_paginator("list_items")
            .unwrap()
            .paginate(kwargs(json!({ "PageSize": 1 })));

        let mut names = Vec::new();
        if let Some(step) = pages.advance().now_or_never() {
            names.extend(item_names(&step.unwrap().into_page().unwrap()));
        }
        while let Some(page) = pages.next().await {
            names.extend(item_names(&page.unwrap()));
        }

        assert_eq!(names, ["a", "b", "c"]);
        // Three pages plus the fetch that found the end.
        assert_eq!(sync.page_fetches(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shut_down_pool_is_reported_without_exhausting() {
        let client = client(&["a"]);
        let mut pages = client
            .get_paginator("list_items")
            .unwrap()
            .paginate(Kwargs::new());

        client.pool().shutdown();
        assert!(matches!(pages.advance().await, Err(Error::PoolShutdown)));
        assert_eq!(pages.state(), State::Ready);
    }
}
