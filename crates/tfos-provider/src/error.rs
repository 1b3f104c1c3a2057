//! Provider errors and their diagnostic form.

use crate::resource_data::ResourceData;
use serde::{Deserialize, Serialize};
use tfos_client::ServiceError;
use thiserror::Error;
use tracing::warn;

/// Errors returned by provider operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// A service client could not be built for the requested region.
    #[error("Error creating OpenStack {service} client: {source}")]
    Client {
        service: &'static str,
        #[source]
        source: ServiceError,
    },

    /// A service call failed; `context` names the failed operation.
    #[error("{context}: {source}")]
    Service {
        context: String,
        #[source]
        source: ServiceError,
    },

    /// A lookup did not produce exactly one object.
    #[error("{0}")]
    Lookup(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Unknown data source type: {0}")]
    UnknownDataSourceType(String),

    /// An in-place update was requested for attributes that force replacement.
    #[error("Attributes require replacement: {}", .0.join(", "))]
    RequiresReplacement(Vec<String>),

    /// The object disappeared while it was being created or imported.
    #[error("{resource_type} {id} no longer exists")]
    Vanished { resource_type: String, id: String },
}

impl ProviderError {
    /// Wraps a service error with the operation that failed.
    pub fn service(context: impl Into<String>, source: ServiceError) -> Self {
        Self::Service {
            context: context.into(),
            source,
        }
    }

    /// Returns the underlying service error, if any.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Client { source, .. } | Self::Service { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic reported back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            attribute: None,
        }
    }

    /// Attaches the attribute path the diagnostic refers to.
    pub fn at(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        Diagnostic::error(err.to_string())
    }
}

/// Returns true if any diagnostic is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Handles a failed lookup of an object tracked in state.
///
/// A not-found error means the object is gone: the id is cleared so the
/// object drops out of state, and no error is returned. Any other error is
/// wrapped with `context`.
pub fn check_deleted(d: &mut ResourceData, err: ServiceError, context: &str) -> ProviderResult<()> {
    if err.is_not_found() {
        warn!(id = %d.id(), "Removing object from state: {}", err);
        d.clear_id();
        return Ok(());
    }
    Err(ProviderError::service(context, err))
}
