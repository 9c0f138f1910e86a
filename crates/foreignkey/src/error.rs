//! Error types for reference resolution
//!
//! Every broken reference is reported individually, with its spec path and
//! address, and categorized so the caller can print focused advice.

use crate::context::Interrupt;
use crate::document::ExtractError;
use crate::kind::{Provider, ResourceKind};
use crate::scalar::ConversionError;
use crate::store::StoreError;
use crate::types::{Address, Reference};
use std::fmt;
use thiserror::Error;

/// Categories of reference failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// No output document for the `(Kind, Env, Name)` triple
    ResourceNotFound,
    /// The field path does not resolve within the document
    FieldNotFound,
    /// The field path resolves to a map or list
    NotScalar,
    /// The scalar cannot be coerced to the field's declared type
    TypeConversionFailed,
    /// The reference lacks a member and no default supplies it
    InvalidReference,
    /// The output store failed
    StoreFailed,
}

impl ErrorCategory {
    /// Short name, as printed in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceNotFound => "ResourceNotFound",
            Self::FieldNotFound => "FieldNotFound",
            Self::NotScalar => "NotScalar",
            Self::TypeConversionFailed => "TypeConversionFailed",
            Self::InvalidReference => "InvalidReference",
            Self::StoreFailed => "StoreFailed",
        }
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ResourceNotFound => "Referenced resource has no stored outputs",
            Self::FieldNotFound => "Referenced output field does not exist",
            Self::NotScalar => "Referenced output field is not a single value",
            Self::TypeConversionFailed => "Referenced value has the wrong type",
            Self::InvalidReference => "Reference is incomplete",
            Self::StoreFailed => "Output store could not be read",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::ResourceNotFound => {
                "Check the kind, env and name, and make sure the resource was provisioned first"
            }
            Self::FieldNotFound => {
                "Check the field path against the resource's outputs (the resource may still be provisioning)"
            }
            Self::NotScalar => "Point the field path at a leaf value, not a map or list",
            Self::TypeConversionFailed => {
                "Point the reference at an output of the field's type, or use a literal value"
            }
            Self::InvalidReference => "Set the missing member explicitly on the reference",
            Self::StoreFailed => "Check the output store location and permissions, then retry",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong with a single reference
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("invalid reference: {message}")]
    InvalidReference { message: String },

    #[error("resource not found")]
    ResourceNotFound,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

impl Failure {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidReference { .. } => ErrorCategory::InvalidReference,
            Self::ResourceNotFound => ErrorCategory::ResourceNotFound,
            Self::Extract(ExtractError::NotScalar { .. }) => ErrorCategory::NotScalar,
            Self::Extract(_) => ErrorCategory::FieldNotFound,
            Self::Conversion(_) => ErrorCategory::TypeConversionFailed,
            Self::Store(_) => ErrorCategory::StoreFailed,
        }
    }
}

/// One broken reference, located in the spec and in the output store
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceError {
    /// Location of the field inside the spec
    pub path: String,
    /// The reference as written
    pub reference: Reference,
    /// The fully-populated address, when defaults could complete it
    pub address: Option<Address>,
    pub failure: Failure,
}

impl ReferenceError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        self.failure.category()
    }

    /// The address if complete, otherwise the reference with gaps marked
    pub fn target(&self) -> String {
        match &self.address {
            Some(address) => address.to_string(),
            None => self.reference.to_string(),
        }
    }
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.target(), self.failure)
    }
}

impl std::error::Error for ReferenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.failure)
    }
}

/// Errors returned by a resolution pass
#[derive(Debug, Error)]
pub enum ResolveError {
    /// One or more references could not be resolved
    #[error("{} unresolved reference(s):{}", .failures.len(), render(.failures))]
    Unresolved { failures: Vec<ReferenceError> },

    /// The pass was cancelled or ran out of time
    #[error("resolution {reason}{}", render_partial(.failures))]
    Interrupted {
        reason: Interrupt,
        /// Failures already known when the pass stopped
        failures: Vec<ReferenceError>,
    },

    /// The worker pool could not be created
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}

impl ResolveError {
    /// Every broken reference this error reports
    pub fn failures(&self) -> &[ReferenceError] {
        match self {
            Self::Unresolved { failures } | Self::Interrupted { failures, .. } => failures,
            Self::ThreadPool(_) => &[],
        }
    }

    /// Distinct categories among the failures, sorted
    pub fn categories(&self) -> Vec<ErrorCategory> {
        let mut categories: Vec<_> = self.failures().iter().map(ReferenceError::category).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}

fn render(failures: &[ReferenceError]) -> String {
    failures
        .iter()
        .map(|f| format!("\n  - {f} [{}]", f.category()))
        .collect()
}

fn render_partial(failures: &[ReferenceError]) -> String {
    if failures.is_empty() {
        String::new()
    } else {
        format!("; {} failure(s) before stopping:{}", failures.len(), render(failures))
    }
}

/// Errors returned when bundling a resolved spec for provisioning
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// The spec still holds references; the resolver's contract was broken
    #[error(
        "invariant violation: {} reference(s) reached the assembler unresolved: {}",
        .paths.len(),
        .paths.join(", ")
    )]
    InvariantViolation { paths: Vec<String> },

    /// Credentials are for a different provider than the resource kind
    #[error("{kind} is provisioned by {expected}, but credentials are for {found}")]
    ProviderMismatch {
        kind: ResourceKind,
        expected: Provider,
        found: Provider,
    },
}

/// Result type for resolution
pub type Result<T> = std::result::Result<T, ResolveError>;
