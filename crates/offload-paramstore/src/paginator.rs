//! `NextToken`-driven paginators for the listing operations.
//!
//! A paginator captures the request once and replays it page after page,
//! feeding each response's `NextToken` into the following request. A
//! `PaginationConfig` entry in the arguments is consumed by the paginator
//! itself and never reaches the operation.

use crate::{
    client::{decode, encode},
    error::{Error, Result},
    model::{DescribeParametersRequest, GetParametersByPathRequest, PaginationConfig},
    store::{BY_PATH_MAX_RESULTS, DESCRIBE_MAX_RESULTS, Store},
};
use offload::{Kwargs, Page, PageSource, SyncPaginator};
use serde_json::Value;
use std::sync::Arc;

const PAGINATION_CONFIG: &str = "PaginationConfig";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageableOperation {
    DescribeParameters,
    GetParametersByPath,
}

impl PageableOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "describe_parameters" => Some(Self::DescribeParameters),
            "get_parameters_by_path" => Some(Self::GetParametersByPath),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::DescribeParameters => "describe_parameters",
            Self::GetParametersByPath => "get_parameters_by_path",
        }
    }

    /// The largest page the operation returns.
    pub const fn max_results(self) -> usize {
        match self {
            Self::DescribeParameters => DESCRIBE_MAX_RESULTS,
            Self::GetParametersByPath => BY_PATH_MAX_RESULTS,
        }
    }

    fn fetch(self, store: &Store, kwargs: Kwargs) -> Result<Page> {
        let _call = store.enter();
        match self {
            Self::DescribeParameters => {
                let req: DescribeParametersRequest = decode(kwargs)?;
                encode(&store.describe_parameters(&req)?)
            }
            Self::GetParametersByPath => {
                let req: GetParametersByPathRequest = decode(kwargs)?;
                encode(&store.get_parameters_by_path(&req)?)
            }
        }
    }
}

/// A paginator for one listing operation of a [`ParamStoreClient`].
///
/// [`ParamStoreClient`]: crate::ParamStoreClient
#[derive(Debug)]
pub struct ParamStorePaginator {
    operation: PageableOperation,
    store: Arc<Store>,
}

impl ParamStorePaginator {
    pub(crate) const fn new(operation: PageableOperation, store: Arc<Store>) -> Self {
        Self { operation, store }
    }

    pub const fn operation(&self) -> PageableOperation {
        self.operation
    }
}

impl SyncPaginator for ParamStorePaginator {
    type Error = Error;
    type Source = ParamStorePages;

    fn paginate(&self, mut kwargs: Kwargs) -> ParamStorePages {
        let config = kwargs
            .remove(PAGINATION_CONFIG)
            .map(|value| match value {
                Value::Object(config) => decode::<PaginationConfig>(config),
                _ => Err(Error::validation("PaginationConfig must be a mapping")),
            })
            .transpose();

        ParamStorePages {
            operation: self.operation,
            store: Arc::clone(&self.store),
            kwargs,
            config,
        }
    }
}

/// The page source returned by [`ParamStorePaginator::paginate`].
///
/// An invalid `PaginationConfig` is reported by the first page fetch rather
/// than by `paginate`, which never fails.
#[derive(Debug)]
pub struct ParamStorePages {
    operation: PageableOperation,
    store: Arc<Store>,
    kwargs: Kwargs,
    config: Result<Option<PaginationConfig>>,
}

impl PageSource for ParamStorePages {
    type Error = Error;
    type Pages = PageIter;

    fn pages(&self) -> PageIter {
        let (config, invalid) = match &self.config {
            Ok(config) => (config.clone().unwrap_or_default(), None),
            Err(err) => (PaginationConfig::default(), Some(err.to_string())),
        };
        PageIter {
            operation: self.operation,
            store: Arc::clone(&self.store),
            kwargs: self.kwargs.clone(),
            next_token: config.starting_token,
            page_size: config.page_size,
            remaining: config.max_items,
            invalid,
            done: false,
        }
    }
}

/// One traversal of a [`ParamStorePages`].
///
/// A failed fetch leaves the position unchanged, so calling `next` again
/// retries the same page. With `MaxItems` set, no request asks for more items
/// than are left, so every page's `NextToken` resumes right after its last
/// item. `MaxItems` of zero yields no pages at all.
#[derive(Debug)]
pub struct PageIter {
    operation: PageableOperation,
    store: Arc<Store>,
    kwargs: Kwargs,
    next_token: Option<String>,
    page_size: Option<usize>,
    remaining: Option<usize>,
    invalid: Option<String>,
    done: bool,
}

impl PageIter {
    fn request(&self) -> Kwargs {
        let mut kwargs = self.kwargs.clone();
        if let Some(token) = &self.next_token {
            kwargs.insert("NextToken".into(), Value::from(token.as_str()));
        }
        let size = match (self.page_size, self.remaining) {
            (Some(size), Some(left)) => Some(size.min(left)),
            (size, None) => size,
            (None, Some(left)) => {
                let requested = kwargs
                    .get("MaxResults")
                    .and_then(Value::as_u64)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(self.operation.max_results());
                Some(requested.min(left))
            }
        };
        if let Some(size) = size {
            kwargs.insert("MaxResults".into(), Value::from(size));
        }
        kwargs
    }
}

impl Iterator for PageIter {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            self.done = true;
        }
        if self.done {
            return None;
        }
        if let Some(reason) = &self.invalid {
            return Some(Err(Error::validation(reason.clone())));
        }

        let page = match self.operation.fetch(&self.store, self.request()) {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };

        if let Some(left) = self.remaining.as_mut() {
            let fetched = page
                .get("Parameters")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            *left = left.saturating_sub(fetched);
            if *left == 0 {
                self.done = true;
            }
        }

        self.next_token = page
            .get("NextToken")
            .and_then(Value::as_str)
            .map(str::to_owned);
        if self.next_token.is_none() {
            self.done = true;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            "Fetched {} page (last: {})",
            self.operation.name(),
            self.done
        );

        Some(Ok(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParamStoreClient, model::PutParameterRequest};
    use offload::SyncClient;
    use serde_json::json;

    fn seeded(count: usize) -> ParamStoreClient {
        let client = ParamStoreClient::new();
        for n in 0..count {
            client
                .put_parameter(PutParameterRequest {
                    name: format!("/seed/{n:03}"),
                    value: n.to_string(),
                    kind: None,
                    overwrite: false,
                    description: None,
                })
                .unwrap();
        }
        client
    }

    fn kwargs(value: Value) -> Kwargs {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn names(page: &Page) -> Vec<String> {
        page["Parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["Name"].as_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn follows_next_token_to_the_end() {
        let client = seeded(7);
        let source = client
            .get_paginator("describe_parameters")
            .unwrap()
            .paginate(kwargs(json!({ "MaxResults": 3 })));

        let pages: Vec<Page> = source.pages().collect::<Result<_>>().unwrap();
        assert_eq!(pages.len(), 3);
        let all: Vec<String> = pages.iter().flat_map(names).collect();
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_traversal_starts_over() {
        let client = seeded(4);
        let source = client
            .get_paginator("describe_parameters")
            .unwrap()
            .paginate(kwargs(json!({ "MaxResults": 2 })));

        let first: Vec<Page> = source.pages().collect::<Result<_>>().unwrap();
        let second: Vec<Page> = source.pages().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn pagination_config_limits_items() {
        let client = seeded(10);
        let source = client
            .get_paginator("get_parameters_by_path")
            .unwrap()
            .paginate(kwargs(json!({
                "Path": "/seed",
                "PaginationConfig": { "PageSize": 3, "MaxItems": 5 },
            })));

        let pages: Vec<Page> = source.pages().collect::<Result<_>>().unwrap();
        let sizes: Vec<usize> = pages.iter().map(|p| names(p).len()).collect();
        assert_eq!(sizes, [3, 2]);
    }

    #[test]
    fn zero_max_items_yields_no_pages() {
        let client = seeded(3);
        let paginator = client.get_paginator("describe_parameters").unwrap();
        let calls = client.calls();
        for config in [json!({ "MaxItems": 0, "PageSize": 2 }), json!({ "MaxItems": 0 })] {
            let mut pages = paginator
                .paginate(kwargs(json!({ "PaginationConfig": config })))
                .pages();
            assert!(pages.next().is_none());
            assert!(pages.next().is_none());
        }
        assert_eq!(client.calls(), calls);
    }

    #[test]
    fn max_items_without_page_size_resumes_after_the_last_item() {
        let client = seeded(6);
        let paginator = client.get_paginator("get_parameters_by_path").unwrap();
        let first: Vec<Page> = paginator
            .paginate(kwargs(json!({
                "Path": "/seed",
                "PaginationConfig": { "MaxItems": 4 },
            })))
            .pages()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(names(&first[0]), ["/seed/000", "/seed/001", "/seed/002", "/seed/003"]);
        let token = first[0]["NextToken"].clone();

        let rest: Vec<Page> = paginator
            .paginate(kwargs(json!({
                "Path": "/seed",
                "PaginationConfig": { "StartingToken": token },
            })))
            .pages()
            .collect::<Result<_>>()
            .unwrap();
        let rest: Vec<String> = rest.iter().flat_map(names).collect();
        assert_eq!(rest, ["/seed/004", "/seed/005"]);
    }

    #[test]
    fn starting_token_resumes() {
        let client = seeded(4);
        let paginator = client.get_paginator("describe_parameters").unwrap();
        let first = paginator
            .paginate(kwargs(json!({ "MaxResults": 2 })))
            .pages()
            .next()
            .unwrap()
            .unwrap();
        let token = first["NextToken"].clone();

        let rest: Vec<Page> = paginator
            .paginate(kwargs(json!({ "PaginationConfig": { "StartingToken": token } })))
            .pages()
            .collect::<Result<_>>()
            .unwrap();
        let rest: Vec<String> = rest.iter().flat_map(names).collect();
        assert_eq!(rest, ["/seed/002", "/seed/003"]);
    }

    #[test]
    fn errors_leave_the_position_unchanged() {
        let client = seeded(2);
        let mut pages = client
            .get_paginator("describe_parameters")
            .unwrap()
            .paginate(kwargs(json!({ "ParameterFilters": [{ "Key": "Tier", "Values": ["x"] }] })))
            .pages();

        for _ in 0..2 {
            let err = pages.next().unwrap().unwrap_err();
            assert!(matches!(err, Error::InvalidFilterKey { .. }));
        }
    }

    #[test]
    fn invalid_pagination_config_surfaces_on_fetch() {
        let client = seeded(1);
        let mut pages = client
            .get_paginator("describe_parameters")
            .unwrap()
            .paginate(kwargs(json!({ "PaginationConfig": 5 })))
            .pages();
        assert!(matches!(pages.next(), Some(Err(Error::Validation { .. }))));
    }
}
