//! The contract a blocking client has to fulfil to be wrapped.
//!
//! `offload` never reimplements a client's operations. It only needs a way to
//! list the operation names, to invoke one of them by name with keyword
//! arguments, and to build paginators. Everything in this module runs on
//! worker threads except [`SyncClient::get_paginator`] and
//! [`SyncPaginator::paginate`], which must not block.

/// A mapping from field name to value.
///
/// Keyword arguments, operation responses and pages all share this shape.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Keyword arguments passed verbatim to a sync client operation.
pub type Kwargs = Document;

/// A single page of a paginated result set.
pub type Page = Document;

/// Connection settings a sync client exposes to its wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Number of connections the client keeps in its pool.
    ///
    /// This is also the default worker pool capacity, so the async layer
    /// never has more blocking calls in flight than the client has
    /// connections for.
    pub max_pool_connections: usize,
}

impl ClientConfig {
    /// Connection pool size used when a client does not configure one.
    pub const DEFAULT_MAX_POOL_CONNECTIONS: usize = 10;

    pub const fn new(max_pool_connections: usize) -> Self {
        Self {
            max_pool_connections,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_POOL_CONNECTIONS)
    }
}

/// A blocking client with a fixed, named operation set.
///
/// Implementations are shared across worker threads behind an [`Arc`], so
/// they must be `Send + Sync`. [`invoke`] may block for as long as it needs.
///
/// [`Arc`]: std::sync::Arc
/// [`invoke`]: SyncClient::invoke
pub trait SyncClient: Send + Sync + 'static {
    /// The error every operation returns.
    type Error: Send + 'static;

    /// The namespace of error kinds the client raises.
    ///
    /// Wrappers hand out a reference to the client's own value so callers
    /// can classify errors exactly as they would against the client.
    type Exceptions: ?Sized;

    /// The paginator type returned by [`SyncClient::get_paginator`].
    type Paginator: SyncPaginator<Error = Self::Error>;

    /// The client's connection configuration.
    fn config(&self) -> &ClientConfig;

    /// The client's error kind namespace.
    fn exceptions(&self) -> &Self::Exceptions;

    /// Every operation name accepted by [`SyncClient::invoke`].
    fn operations(&self) -> &[&'static str];

    /// Returns `true` if `name` is one of [`SyncClient::operations`].
    fn has_operation(&self, name: &str) -> bool {
        self.operations().iter().any(|op| *op == name)
    }

    /// Runs the operation `name` with keyword arguments `kwargs`, blocking
    /// until the client produces a response.
    ///
    /// # Errors
    ///
    /// Whatever the client raises for this operation.
    fn invoke(&self, name: &str, kwargs: Kwargs) -> Result<Document, Self::Error>;

    /// Builds the paginator for the operation `name`.
    ///
    /// # Errors
    ///
    /// Whatever the client raises for a name it cannot paginate.
    fn get_paginator(&self, name: &str) -> Result<Self::Paginator, Self::Error>;
}

/// A blocking paginator for one operation.
pub trait SyncPaginator: Send + Sync + 'static {
    type Error: Send + 'static;

    /// The lazily evaluated page sequence returned by
    /// [`SyncPaginator::paginate`].
    type Source: PageSource<Error = Self::Error>;

    /// Captures `kwargs` into a page source. No page is fetched until the
    /// source is iterated.
    fn paginate(&self, kwargs: Kwargs) -> Self::Source;
}

/// A re-iterable, lazily fetched sequence of pages.
///
/// Every call to [`PageSource::pages`] starts a fresh traversal from the first
/// page. Advancing the returned iterator is where the blocking happens.
pub trait PageSource: Send + Sync + 'static {
    type Error: Send + 'static;

    type Pages: Iterator<Item = Result<Page, Self::Error>> + Send + 'static;

    fn pages(&self) -> Self::Pages;
}
