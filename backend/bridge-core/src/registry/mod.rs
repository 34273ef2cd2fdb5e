//! Operation Registry.
//!
//! The canonical name → contract table. The typed half is generated at
//! build time from `operations.toml` (see [`operations`]); the runtime half
//! is [`OperationRegistry`], a read-only map of [`OperationDescriptor`]s that
//! the dispatch bridge, the proxy and the mock engine all consult.

pub mod naming;
pub mod operations;

pub use naming::{InvalidSegment, derive_operation_name};

use crate::error::registry::RegistryError;

use common::ErrorLocation;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One typed backend operation.
///
/// Implemented by the zero-sized types generated into [`operations`].
pub trait Operation: Send + Sync + 'static {
    const NAME: &'static str;
    const METHOD: HttpMethod;
    const PATH: &'static str;

    type Request: Serialize + DeserializeOwned + Send + 'static;
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Name, method and path of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: Cow<'static, str>,
    pub method: HttpMethod,
    pub path: Cow<'static, str>,
}

impl OperationDescriptor {
    pub const fn new(name: &'static str, method: HttpMethod, path: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            method,
            path: Cow::Borrowed(path),
        }
    }

    /// Descriptor of a generated typed operation.
    pub fn of<O: Operation>() -> Self {
        Self::new(O::NAME, O::METHOD, O::PATH)
    }
}

/// Declared identity of an operation, used by [`OperationRegistry::generate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub method: String,
    pub path: String,
}

impl OperationSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

static BUILTIN: Lazy<OperationRegistry> = Lazy::new(|| {
    OperationRegistry::from_descriptors(operations::DESCRIPTORS.iter().cloned())
        .expect("build.rs already rejected duplicate operation names")
});

/// Immutable name-keyed operation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationRegistry {
    operations: BTreeMap<String, OperationDescriptor>,
}

impl OperationRegistry {
    /// The registry generated from `operations.toml`.
    pub fn builtin() -> &'static OperationRegistry {
        &BUILTIN
    }

    /// Build a registry from declared method + path pairs, deriving names the
    /// same way the build script does.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Malformed`] if a method or path segment cannot be named
    /// - [`RegistryError::Duplicate`] if two specs derive the same name
    pub fn generate(specs: &[OperationSpec]) -> Result<Self, RegistryError> {
        let mut descriptors = Vec::with_capacity(specs.len());

        for spec in specs {
            let name = derive_operation_name(&spec.method, &spec.path).map_err(|e| {
                RegistryError::Malformed {
                    message: format!(
                        "{} {}: '{}' ({})",
                        spec.method, spec.path, e.segment, e.reason
                    ),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

            let method = parse_method(&spec.method)?;

            descriptors.push(OperationDescriptor {
                name: Cow::Owned(name),
                method,
                path: Cow::Owned(spec.path.clone()),
            });
        }

        Self::from_descriptors(descriptors)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if two descriptors share a name.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut operations = BTreeMap::new();

        for descriptor in descriptors {
            let name = descriptor.name.to_string();
            if let Some(existing) = operations.insert(name.clone(), descriptor.clone()) {
                return Err(RegistryError::Duplicate {
                    message: format!(
                        "'{name}' is derived by both {} {} and {} {}",
                        existing.method, existing.path, descriptor.method, descriptor.path
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(Self { operations })
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Operation names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.values()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[track_caller]
fn parse_method(method: &str) -> Result<HttpMethod, RegistryError> {
    match method.to_ascii_lowercase().as_str() {
        "get" => Ok(HttpMethod::Get),
        "post" => Ok(HttpMethod::Post),
        "put" => Ok(HttpMethod::Put),
        "patch" => Ok(HttpMethod::Patch),
        "delete" => Ok(HttpMethod::Delete),
        other => Err(RegistryError::Malformed {
            message: format!("unsupported HTTP method '{other}'"),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
