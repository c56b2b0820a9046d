//! The in-memory parameter table and its operations.

use crate::{
    error::{Error, Result},
    filter::{Filter, Scope, is_descendant, is_direct_child, normalize_path},
    model::{
        DeleteParametersResponse, DescribeParametersRequest, DescribeParametersResponse,
        GetParametersByPathRequest, GetParametersByPathResponse, GetParametersResponse, Parameter,
        ParameterMetadata, ParameterType, PutParameterRequest, PutParameterResponse,
    },
};
use core::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

const MAX_NAME_LEN: usize = 2048;
const MAX_HIERARCHY_DEPTH: usize = 15;
pub(crate) const DESCRIBE_MAX_RESULTS: usize = 50;
pub(crate) const BY_PATH_MAX_RESULTS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    kind: ParameterType,
    value: String,
    version: u64,
    last_modified_date: u64,
    description: Option<String>,
}

impl Entry {
    fn parameter(&self, name: &str) -> Parameter {
        Parameter {
            name: name.to_owned(),
            kind: self.kind,
            value: self.value.clone(),
            version: self.version,
            last_modified_date: self.last_modified_date,
            data_type: "text".to_owned(),
        }
    }

    fn metadata(&self, name: &str) -> ParameterMetadata {
        ParameterMetadata {
            name: name.to_owned(),
            kind: self.kind,
            version: self.version,
            last_modified_date: self.last_modified_date,
            data_type: "text".to_owned(),
            description: self.description.clone(),
        }
    }
}

/// Shared state behind a client and all of its paginators.
#[derive(Debug, Default)]
pub(crate) struct Store {
    parameters: RwLock<BTreeMap<String, Entry>>,
    latency: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

/// Marks one call as in flight for as long as it is held.
pub(crate) struct CallGuard<'a> {
    store: &'a Store,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.store.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Store {
    pub(crate) fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Records a call and blocks for the configured latency.
    pub(crate) fn enter(&self) -> CallGuard<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        CallGuard { store: self }
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn len(&self) -> usize {
        self.parameters.read().len()
    }

    pub(crate) fn put_parameter(&self, req: PutParameterRequest) -> Result<PutParameterResponse> {
        validate_name(&req.name)?;
        if req.value.is_empty() {
            return Err(Error::validation("parameter value must not be empty"));
        }

        let mut parameters = self.parameters.write();
        let version = match parameters.get(&req.name) {
            Some(_) if !req.overwrite => {
                return Err(Error::ParameterAlreadyExists { name: req.name });
            }
            Some(existing) => existing.version + 1,
            None => 1,
        };
        let kind = req.kind.unwrap_or_default();

        #[cfg(feature = "tracing")]
        tracing::trace!("Storing {} version {version}", req.name);

        parameters.insert(
            req.name,
            Entry {
                kind,
                value: req.value,
                version,
                last_modified_date: unix_now(),
                description: req.description,
            },
        );
        Ok(PutParameterResponse {
            version,
            tier: "Standard",
        })
    }

    pub(crate) fn get_parameter(&self, name: &str) -> Result<Parameter> {
        self.parameters
            .read()
            .get(name)
            .map(|entry| entry.parameter(name))
            .ok_or_else(|| Error::ParameterNotFound {
                name: name.to_owned(),
            })
    }

    pub(crate) fn get_parameters(&self, names: &[String]) -> Result<GetParametersResponse> {
        if names.is_empty() || names.len() > 10 {
            return Err(Error::validation("Names must contain between 1 and 10 names"));
        }
        let table = self.parameters.read();
        let mut parameters = Vec::new();
        let mut invalid_parameters = Vec::new();
        for name in names {
            match table.get(name) {
                Some(entry) => parameters.push(entry.parameter(name)),
                None => invalid_parameters.push(name.clone()),
            }
        }
        Ok(GetParametersResponse {
            parameters,
            invalid_parameters,
        })
    }

    pub(crate) fn delete_parameter(&self, name: &str) -> Result<()> {
        self.parameters
            .write()
            .remove(name)
            .map(drop)
            .ok_or_else(|| Error::ParameterNotFound {
                name: name.to_owned(),
            })
    }

    pub(crate) fn delete_parameters(&self, names: &[String]) -> Result<DeleteParametersResponse> {
        if names.is_empty() || names.len() > 10 {
            return Err(Error::validation("Names must contain between 1 and 10 names"));
        }
        let mut table = self.parameters.write();
        let (deleted_parameters, invalid_parameters): (Vec<String>, Vec<String>) = names
            .iter()
            .cloned()
            .partition(|name| table.remove(name).is_some());
        Ok(DeleteParametersResponse {
            deleted_parameters,
            invalid_parameters,
        })
    }

    pub(crate) fn describe_parameters(
        &self,
        req: &DescribeParametersRequest,
    ) -> Result<DescribeParametersResponse> {
        let filters = Filter::compile_all(&req.parameter_filters, Scope::Describe)?;
        let limit = page_limit(req.max_results, DESCRIBE_MAX_RESULTS)?;
        let after = req.next_token.as_deref().map(decode_token).transpose()?;

        let (parameters, next_token) = self.page(after.as_deref(), limit, |name, entry| {
            filters.iter().all(|f| f.matches(name, entry.kind)).then(|| entry.metadata(name))
        });
        Ok(DescribeParametersResponse {
            parameters,
            next_token,
        })
    }

    pub(crate) fn get_parameters_by_path(
        &self,
        req: &GetParametersByPathRequest,
    ) -> Result<GetParametersByPathResponse> {
        if !req.path.starts_with('/') {
            return Err(Error::validation("Path must begin with /"));
        }
        let path = normalize_path(&req.path);
        let filters = Filter::compile_all(&req.parameter_filters, Scope::ByPath)?;
        let limit = page_limit(req.max_results, BY_PATH_MAX_RESULTS)?;
        let after = req.next_token.as_deref().map(decode_token).transpose()?;

        let (parameters, next_token) = self.page(after.as_deref(), limit, |name, entry| {
            let in_path = if req.recursive {
                is_descendant(name, &path)
            } else {
                is_direct_child(name, &path)
            };
            (in_path && filters.iter().all(|f| f.matches(name, entry.kind)))
                .then(|| entry.parameter(name))
        });
        Ok(GetParametersByPathResponse {
            parameters,
            next_token,
        })
    }

    /// Collects up to `limit` matches in name order, strictly after `after`.
    /// Returns a token for the following page if more matches remain.
    fn page<T>(
        &self,
        after: Option<&str>,
        limit: usize,
        mut select: impl FnMut(&str, &Entry) -> Option<T>,
    ) -> (Vec<T>, Option<String>) {
        use core::ops::Bound::{Excluded, Unbounded};

        let table = self.parameters.read();
        let lower = after.map_or(Unbounded, Excluded);
        let mut matches = table
            .range::<str, _>((lower, Unbounded))
            .filter_map(|(name, entry)| select(name, entry).map(|item| (name, item)));

        let mut items = Vec::with_capacity(limit);
        let mut last = None;
        for (name, item) in matches.by_ref().take(limit) {
            items.push(item);
            last = Some(name);
        }
        let next_token = match (last, matches.next()) {
            (Some(last), Some(_)) => Some(encode_token(last)),
            _ => None,
        };
        (items, next_token)
    }
}

fn page_limit(requested: Option<usize>, max: usize) -> Result<usize> {
    match requested {
        None => Ok(max),
        Some(n) if (1..=max).contains(&n) => Ok(n),
        Some(n) => Err(Error::validation(format!(
            "MaxResults must be between 1 and {max}, got {n}"
        ))),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "parameter name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }
    if name.contains('/') && !name.starts_with('/') {
        return Err(Error::validation(
            "parameter name must be fully qualified: a hierarchy begins with /",
        ));
    }
    if name.ends_with('/') || name.contains("//") {
        return Err(Error::validation("parameter name has an empty path segment"));
    }
    if name.matches('/').count() > MAX_HIERARCHY_DEPTH {
        return Err(Error::validation(format!(
            "parameter hierarchy is limited to {MAX_HIERARCHY_DEPTH} levels"
        )));
    }
    let reserved = name.trim_start_matches('/').to_ascii_lowercase();
    if reserved.starts_with("aws") || reserved.starts_with("ssm") {
        return Err(Error::validation(
            "parameter names beginning with aws or ssm are reserved",
        ));
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_secs())
}

// A token is the hex encoding of the last name already returned.
fn encode_token(name: &str) -> String {
    name.bytes().map(|b| format!("{b:02x}")).collect()
}

fn decode_token(token: &str) -> Result<String> {
    let invalid = || Error::InvalidNextToken {
        token: token.to_owned(),
    };
    if token.is_empty() || token.len() % 2 != 0 {
        return Err(invalid());
    }
    let bytes = (0..token.len())
        .step_by(2)
        .map(|i| {
            token
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        })
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(invalid)?;
    String::from_utf8(bytes).map_err(|_| invalid())
}
