use crate::{
    error::{Error, Exceptions, Result},
    model::{
        DeleteParameterRequest, DeleteParametersRequest, DeleteParametersResponse,
        DescribeParametersRequest, DescribeParametersResponse, GetParameterRequest,
        GetParameterResponse, GetParametersByPathRequest, GetParametersByPathResponse,
        GetParametersRequest, GetParametersResponse, PutParameterRequest, PutParameterResponse,
    },
    paginator::{PageableOperation, ParamStorePaginator},
    store::Store,
};
use core::time::Duration;
use offload::{ClientConfig, Document, Kwargs, SyncClient};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;

/// Settings for a [`ParamStoreClient`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection settings reported to wrappers.
    pub client: ClientConfig,
    /// Time every call and page fetch blocks before it is served.
    pub latency: Duration,
}

impl StoreConfig {
    pub const fn new(max_pool_connections: usize, latency: Duration) -> Self {
        Self {
            client: ClientConfig::new(max_pool_connections),
            latency,
        }
    }
}

/// A blocking, in-memory parameter store.
///
/// Parameters are kept in name order in a table shared with every paginator
/// the client hands out. Each operation can be called either through its
/// typed method or by name through [`SyncClient::invoke`] with a keyword
/// argument document, which is what the async adapter uses.
pub struct ParamStoreClient {
    config: StoreConfig,
    exceptions: Exceptions,
    store: Arc<Store>,
}

impl ParamStoreClient {
    pub const OPERATIONS: &'static [&'static str] = &[
        "delete_parameter",
        "delete_parameters",
        "describe_parameters",
        "get_parameter",
        "get_parameters",
        "get_parameters_by_path",
        "put_parameter",
    ];

    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let store = Arc::new(Store::new(config.latency));
        Self {
            config,
            exceptions: Exceptions::new(),
            store,
        }
    }

    pub const fn store_config(&self) -> &StoreConfig {
        &self.config
    }

    /// The largest number of calls and page fetches that were ever served
    /// at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.store.peak_concurrency()
    }

    /// Total calls and page fetches served so far.
    pub fn calls(&self) -> usize {
        self.store.calls()
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_parameter(&self, req: PutParameterRequest) -> Result<PutParameterResponse> {
        let _call = self.store.enter();
        self.store.put_parameter(req)
    }

    pub fn get_parameter(&self, req: &GetParameterRequest) -> Result<GetParameterResponse> {
        let _call = self.store.enter();
        self.store
            .get_parameter(&req.name)
            .map(|parameter| GetParameterResponse { parameter })
    }

    pub fn get_parameters(&self, req: &GetParametersRequest) -> Result<GetParametersResponse> {
        let _call = self.store.enter();
        self.store.get_parameters(&req.names)
    }

    pub fn delete_parameter(&self, req: &DeleteParameterRequest) -> Result<()> {
        let _call = self.store.enter();
        self.store.delete_parameter(&req.name)
    }

    pub fn delete_parameters(
        &self,
        req: &DeleteParametersRequest,
    ) -> Result<DeleteParametersResponse> {
        let _call = self.store.enter();
        self.store.delete_parameters(&req.names)
    }

    pub fn describe_parameters(
        &self,
        req: &DescribeParametersRequest,
    ) -> Result<DescribeParametersResponse> {
        let _call = self.store.enter();
        self.store.describe_parameters(req)
    }

    pub fn get_parameters_by_path(
        &self,
        req: &GetParametersByPathRequest,
    ) -> Result<GetParametersByPathResponse> {
        let _call = self.store.enter();
        self.store.get_parameters_by_path(req)
    }
}

impl Default for ParamStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ParamStoreClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParamStoreClient")
            .field("config", &self.config)
            .field("parameters", &self.store.len())
            .finish_non_exhaustive()
    }
}

pub(crate) fn decode<T: DeserializeOwned>(kwargs: Kwargs) -> Result<T> {
    serde_json::from_value(Value::Object(kwargs)).map_err(|err| Error::validation(err.to_string()))
}

pub(crate) fn encode<T: Serialize>(response: &T) -> Result<Document> {
    match serde_json::to_value(response)? {
        Value::Object(document) => Ok(document),
        other => Err(Error::validation(format!(
            "response is not a document: {other}"
        ))),
    }
}

impl SyncClient for ParamStoreClient {
    type Error = Error;
    type Exceptions = Exceptions;
    type Paginator = ParamStorePaginator;

    fn config(&self) -> &ClientConfig {
        &self.config.client
    }

    fn exceptions(&self) -> &Exceptions {
        &self.exceptions
    }

    fn operations(&self) -> &[&'static str] {
        Self::OPERATIONS
    }

    fn invoke(&self, name: &str, kwargs: Kwargs) -> Result<Document> {
        #[cfg(feature = "tracing")]
        tracing::trace!("Invoking {name}");

        match name {
            "put_parameter" => encode(&self.put_parameter(decode(kwargs)?)?),
            "get_parameter" => encode(&self.get_parameter(&decode(kwargs)?)?),
            "get_parameters" => encode(&self.get_parameters(&decode(kwargs)?)?),
            "delete_parameter" => {
                self.delete_parameter(&decode(kwargs)?)?;
                Ok(Document::new())
            }
            "delete_parameters" => encode(&self.delete_parameters(&decode(kwargs)?)?),
            "describe_parameters" => encode(&self.describe_parameters(&decode(kwargs)?)?),
            "get_parameters_by_path" => encode(&self.get_parameters_by_path(&decode(kwargs)?)?),
            other => Err(Error::UnknownOperation {
                name: other.to_owned(),
            }),
        }
    }

    fn get_paginator(&self, name: &str) -> Result<ParamStorePaginator> {
        let operation = PageableOperation::from_name(name).ok_or_else(|| {
            Error::OperationNotPageable {
                name: name.to_owned(),
            }
        })?;
        Ok(ParamStorePaginator::new(operation, Arc::clone(&self.store)))
    }
}
