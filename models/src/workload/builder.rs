use crate::error::model_error::ModelError;
use crate::workload::DEFAULT_GROUP;
use crate::{ErrorLocation, Workload, WorkloadStatus};

use std::panic::Location;

/// Builder for validated [`Workload`] instances.
///
/// `url` and `group` are derived when not given: the URL follows the
/// `http://127.0.0.1:<port>/sse#<name>` convention of the backend.
#[derive(Debug, Default)]
pub struct WorkloadBuilder {
    name: Option<String>,
    package: Option<String>,
    port: Option<u16>,
    url: Option<String>,
    status: Option<WorkloadStatus>,
    status_context: Option<String>,
    created_at: Option<String>,
    group: Option<String>,
}

impl WorkloadBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: WorkloadStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_status_context(mut self, context: impl Into<String>) -> Self {
        self.status_context = Some(context.into());
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Build the Workload with validation.
    #[track_caller]
    pub fn build(self) -> Result<Workload, ModelError> {
        let name = self.name.ok_or_else(|| ModelError::Validation {
            message: String::from("Workload name is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if name.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Workload name cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let package = self.package.ok_or_else(|| ModelError::Validation {
            message: String::from("Package is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if package.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Package cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let port = self.port.ok_or_else(|| ModelError::Validation {
            message: String::from("Port is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if port == 0 {
            return Err(ModelError::Validation {
                message: String::from("Port must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let url = self.url.unwrap_or_else(|| Workload::local_url(port, &name));

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ModelError::Validation {
                message: format!("Invalid workload URL format: {url}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Workload {
            name,
            package,
            url,
            port,
            status: self.status.unwrap_or(WorkloadStatus::Stopped),
            status_context: self.status_context.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
            group: self.group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        })
    }
}
