//! An in-memory sync client shared by the unit tests.

use crate::sync::{ClientConfig, Document, Kwargs, Page, PageSource, SyncClient, SyncPaginator};
use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};
use serde_json::{Value, json};
use std::sync::Arc;

pub(crate) fn kwargs(value: Value) -> Kwargs {
    match value {
        Value::Object(map) => map,
        other => panic!("kwargs must be an object, got {other}"),
    }
}

pub(crate) fn item_names(page: &Page) -> Vec<String> {
    page.get("Items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MockError {
    NotFound(String),
    NotPageable(String),
    Transient,
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "{name} not found"),
            Self::NotPageable(name) => write!(f, "{name} cannot be paginated"),
            Self::Transient => write!(f, "transient failure"),
        }
    }
}

impl core::error::Error for MockError {}

#[derive(Debug, Default)]
pub(crate) struct MockExceptions;

#[derive(Default)]
pub(crate) struct MockClient {
    config: ClientConfig,
    exceptions: MockExceptions,
    items: Arc<Vec<String>>,
    invocations: AtomicUsize,
    fetches: Arc<AtomicUsize>,
    fail_fetch: Option<usize>,
}

impl MockClient {
    pub(crate) const OPERATIONS: &'static [&'static str] =
        &["echo", "count_items", "get_item", "list_items"];

    pub(crate) fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: Arc::new(items.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn with_max_pool_connections(max_pool_connections: usize) -> Self {
        Self {
            config: ClientConfig::new(max_pool_connections),
            ..Self::default()
        }
    }

    /// Makes the `n`th page fetch (1-based) of each traversal fail once.
    pub(crate) fn failing_fetch(mut self, n: usize) -> Self {
        self.fail_fetch = Some(n);
        self
    }

    pub(crate) fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub(crate) fn page_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn list(&self, offset: usize, limit: usize) -> Document {
        let end = (offset + limit).min(self.items.len());
        let mut page = Document::new();
        page.insert("Items".into(), json!(self.items[offset.min(end)..end]));
        if end < self.items.len() {
            page.insert("Next".into(), json!(end));
        }
        page
    }
}

fn usize_arg(kwargs: &Kwargs, key: &str, default: usize) -> usize {
    kwargs
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

impl SyncClient for MockClient {
    type Error = MockError;
    type Exceptions = MockExceptions;
    type Paginator = MockPaginator;

    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn exceptions(&self) -> &MockExceptions {
        &self.exceptions
    }

    fn operations(&self) -> &[&'static str] {
        Self::OPERATIONS
    }

    fn invoke(&self, name: &str, kwargs: Kwargs) -> Result<Document, MockError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match name {
            "echo" => Ok(kwargs),
            "count_items" => {
                let mut reply = Document::new();
                reply.insert("Count".into(), json!(self.items.len()));
                Ok(reply)
            }
            "get_item" => {
                let wanted = kwargs.get("Name").and_then(Value::as_str).unwrap_or("");
                if self.items.iter().any(|item| item == wanted) {
                    let mut reply = Document::new();
                    reply.insert("Item".into(), json!(wanted));
                    Ok(reply)
                } else {
                    Err(MockError::NotFound(wanted.to_owned()))
                }
            }
            "list_items" => Ok(self.list(
                usize_arg(&kwargs, "Offset", 0),
                usize_arg(&kwargs, "PageSize", 10),
            )),
            other => Err(MockError::NotFound(other.to_owned())),
        }
    }

    fn get_paginator(&self, name: &str) -> Result<MockPaginator, MockError> {
        if name != "list_items" {
            return Err(MockError::NotPageable(name.to_owned()));
        }
        Ok(MockPaginator {
            items: Arc::clone(&self.items),
            fetches: Arc::clone(&self.fetches),
            fail_fetch: self.fail_fetch,
        })
    }
}

pub(crate) struct MockPaginator {
    items: Arc<Vec<String>>,
    fetches: Arc<AtomicUsize>,
    fail_fetch: Option<usize>,
}

impl SyncPaginator for MockPaginator {
    type Error = MockError;
    type Source = MockSource;

    fn paginate(&self, kwargs: Kwargs) -> MockSource {
        MockSource {
            items: Arc::clone(&self.items),
            fetches: Arc::clone(&self.fetches),
            fail_fetch: self.fail_fetch,
            page_size: usize_arg(&kwargs, "PageSize", 10).max(1),
        }
    }
}

pub(crate) struct MockSource {
    items: Arc<Vec<String>>,
    fetches: Arc<AtomicUsize>,
    fail_fetch: Option<usize>,
    page_size: usize,
}

impl PageSource for MockSource {
    type Error = MockError;
    type Pages = MockPages;

    fn pages(&self) -> MockPages {
        MockPages {
            items: Arc::clone(&self.items),
            fetches: Arc::clone(&self.fetches),
            fail_fetch: self.fail_fetch,
            page_size: self.page_size,
            attempt: 0,
            offset: 0,
            done: false,
        }
    }
}

pub(crate) struct MockPages {
    items: Arc<Vec<String>>,
    fetches: Arc<AtomicUsize>,
    fail_fetch: Option<usize>,
    page_size: usize,
    attempt: usize,
    offset: usize,
    done: bool,
}

impl Iterator for MockPages {
    type Item = Result<Page, MockError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.done {
            return None;
        }

        self.attempt += 1;
        if self.fail_fetch == Some(self.attempt) {
            return Some(Err(MockError::Transient));
        }

        let end = (self.offset + self.page_size).min(self.items.len());
        let mut page = Page::new();
        page.insert("Items".into(), json!(self.items[self.offset..end]));
        self.offset = end;
        self.done = end >= self.items.len();
        Some(Ok(page))
    }
}
