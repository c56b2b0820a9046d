//! Error types raised by the parameter store.
//!
//! Every [`Error`] maps to exactly one [`ErrorCode`], the stable name a caller
//! matches on. The [`Exceptions`] catalog lists those codes and is what
//! [`ParamStoreClient::exceptions`] hands out, so the same classification
//! works whether the error came back from a direct call or through the async
//! adapter.
//!
//! [`ParamStoreClient::exceptions`]: offload::SyncClient::exceptions

use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Every failure the parameter store reports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No parameter exists under the requested name.
    #[error("Parameter {name} not found.")]
    ParameterNotFound { name: String },

    /// `put_parameter` targeted an existing name without `Overwrite`.
    #[error("The parameter {name} already exists.")]
    ParameterAlreadyExists { name: String },

    /// The request was malformed or out of bounds.
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    /// The supplied `NextToken` was not issued by this store.
    #[error("The NextToken {token:?} is not valid.")]
    InvalidNextToken { token: String },

    /// A parameter filter used a key the operation does not support.
    #[error("The filter key {key} is not valid for this operation.")]
    InvalidFilterKey { key: String },

    /// A parameter filter used an option its key does not support.
    #[error("The filter option {option} is not valid for key {key}.")]
    InvalidFilterOption { key: String, option: String },

    /// `get_paginator` was asked for an operation that does not paginate.
    #[error("Operation cannot be paginated: {name}")]
    OperationNotPageable { name: String },

    /// `invoke` was asked for an operation the store does not have.
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },

    /// A response could not be converted into a document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The catalog code identifying this error's kind.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ParameterNotFound { .. } => ErrorCode::ParameterNotFound,
            Self::ParameterAlreadyExists { .. } => ErrorCode::ParameterAlreadyExists,
            Self::Validation { .. } => ErrorCode::ValidationException,
            Self::InvalidNextToken { .. } => ErrorCode::InvalidNextToken,
            Self::InvalidFilterKey { .. } => ErrorCode::InvalidFilterKey,
            Self::InvalidFilterOption { .. } => ErrorCode::InvalidFilterOption,
            Self::OperationNotPageable { .. } => ErrorCode::OperationNotPageable,
            Self::UnknownOperation { .. } => ErrorCode::UnknownOperation,
            Self::Serialization(_) => ErrorCode::InternalServerError,
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

/// Stable identifiers for each kind of [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParameterNotFound,
    ParameterAlreadyExists,
    ValidationException,
    InvalidNextToken,
    InvalidFilterKey,
    InvalidFilterOption,
    OperationNotPageable,
    UnknownOperation,
    InternalServerError,
}

impl ErrorCode {
    pub const ALL: &'static [Self] = &[
        Self::ParameterNotFound,
        Self::ParameterAlreadyExists,
        Self::ValidationException,
        Self::InvalidNextToken,
        Self::InvalidFilterKey,
        Self::InvalidFilterOption,
        Self::OperationNotPageable,
        Self::UnknownOperation,
        Self::InternalServerError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParameterNotFound => "ParameterNotFound",
            Self::ParameterAlreadyExists => "ParameterAlreadyExists",
            Self::ValidationException => "ValidationException",
            Self::InvalidNextToken => "InvalidNextToken",
            Self::InvalidFilterKey => "InvalidFilterKey",
            Self::InvalidFilterOption => "InvalidFilterOption",
            Self::OperationNotPageable => "OperationNotPageable",
            Self::UnknownOperation => "UnknownOperation",
            Self::InternalServerError => "InternalServerError",
        }
    }

    /// Returns `true` if `err` is of this kind.
    pub const fn matches(self, err: &Error) -> bool {
        err.code() as u8 == self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error catalog of a [`ParamStoreClient`].
///
/// [`ParamStoreClient`]: crate::ParamStoreClient
#[derive(Debug, Default)]
pub struct Exceptions {
    _priv: (),
}

impl Exceptions {
    pub const fn new() -> Self {
        Self { _priv: () }
    }

    /// Every code the store can raise.
    pub const fn codes(&self) -> &'static [ErrorCode] {
        ErrorCode::ALL
    }

    /// Looks a code up by its name, e.g. `"ParameterNotFound"`.
    pub fn from_code(&self, code: &str) -> Option<ErrorCode> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.as_str() == code)
    }

    /// Classifies `err`.
    pub const fn classify(&self, err: &Error) -> ErrorCode {
        err.code()
    }
}
