use crate::{
    error::{Error, Result},
    model::{ParameterFilter, ParameterType},
};

/// A validated [`ParameterFilter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Filter {
    NameEquals(Vec<String>),
    NameBeginsWith(Vec<String>),
    NameContains(Vec<String>),
    TypeEquals(Vec<ParameterType>),
    PathOneLevel(Vec<String>),
    PathRecursive(Vec<String>),
}

/// Which filter keys an operation accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    Describe,
    ByPath,
}

impl Filter {
    pub(crate) fn compile_all(filters: &[ParameterFilter], scope: Scope) -> Result<Vec<Self>> {
        filters.iter().map(|f| Self::compile(f, scope)).collect()
    }

    fn compile(filter: &ParameterFilter, scope: Scope) -> Result<Self> {
        let key = filter.key.as_str();
        let option = filter.option.as_deref();
        let invalid_option = |option: &str| Error::InvalidFilterOption {
            key: key.to_owned(),
            option: option.to_owned(),
        };

        if filter.values.is_empty() {
            return Err(Error::validation(format!(
                "filter {key} requires at least one value"
            )));
        }
        let values = filter.values.clone();

        match (key, scope) {
            ("Name", _) => match option.unwrap_or("Equals") {
                "Equals" => Ok(Self::NameEquals(values)),
                "BeginsWith" => Ok(Self::NameBeginsWith(values)),
                "Contains" => Ok(Self::NameContains(values)),
                other => Err(invalid_option(other)),
            },
            ("Type", _) => match option.unwrap_or("Equals") {
                "Equals" => values
                    .iter()
                    .map(|v| parse_type(v))
                    .collect::<Result<_>>()
                    .map(Self::TypeEquals),
                other => Err(invalid_option(other)),
            },
            ("Path", Scope::Describe) => {
                let values = values.iter().map(|v| normalize_path(v)).collect();
                match option.unwrap_or("OneLevel") {
                    "OneLevel" => Ok(Self::PathOneLevel(values)),
                    "Recursive" => Ok(Self::PathRecursive(values)),
                    other => Err(invalid_option(other)),
                }
            }
            _ => Err(Error::InvalidFilterKey {
                key: key.to_owned(),
            }),
        }
    }

    pub(crate) fn matches(&self, name: &str, kind: ParameterType) -> bool {
        match self {
            Self::NameEquals(values) => values.iter().any(|v| name == v),
            Self::NameBeginsWith(values) => values.iter().any(|v| name.starts_with(v.as_str())),
            Self::NameContains(values) => values.iter().any(|v| name.contains(v.as_str())),
            Self::TypeEquals(kinds) => kinds.contains(&kind),
            Self::PathOneLevel(paths) => paths.iter().any(|p| is_direct_child(name, p)),
            Self::PathRecursive(paths) => paths.iter().any(|p| is_descendant(name, p)),
        }
    }
}

fn parse_type(value: &str) -> Result<ParameterType> {
    match value {
        "String" => Ok(ParameterType::String),
        "StringList" => Ok(ParameterType::StringList),
        "SecureString" => Ok(ParameterType::SecureString),
        other => Err(Error::validation(format!("unknown parameter type {other}"))),
    }
}

/// Strips a trailing `/` from every path but the root.
pub(crate) fn normalize_path(path: &str) -> String {
    match path.trim_end_matches('/') {
        "" => "/".to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

/// The hierarchy level `name` lives in. Names without a leading `/` live at
/// the root.
fn parent(name: &str) -> &str {
    match name.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

pub(crate) fn is_direct_child(name: &str, path: &str) -> bool {
    parent(name) == path
}

pub(crate) fn is_descendant(name: &str, path: &str) -> bool {
    if path == "/" {
        return true;
    }
    name.strip_prefix(path)
        .is_some_and(|rest| rest.starts_with('/'))
}
