//! Error types for Charter Core
//!
//! One taxonomy for every handler and mutation path:
//! - Validation / Security: bad input, rejected before any write
//! - NotFound / AlreadyExists: addressing outcomes
//! - Immutable / CascadeProtected: lifecycle rules, recoverable by choosing another action
//! - LockTimeout: the only retryable failure
//! - ApprovalNotPending: carries the current status for idempotent-retry detection

use crate::model::ApprovalStatus;
use charter_identity::{EntityKind, IdentityError, SecurityError, ValidationError};
use charter_storage::StorageError;
use std::time::Duration;

/// Main Charter error type
#[derive(Debug, thiserror::Error)]
pub enum CharterError {
    /// Field-scoped input problem
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Addressing attempt outside the store root
    #[error("security violation: {0}")]
    Security(#[from] SecurityError),

    /// Entity does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    /// Entity already exists
    #[error("{kind} {id} already exists")]
    AlreadyExists { kind: EntityKind, id: String },

    /// Operation forbidden on an immutable kind
    #[error("{kind} records are immutable: {operation} is not allowed")]
    Immutable {
        kind: EntityKind,
        operation: &'static str,
    },

    /// Delete refused because live records still point here
    #[error("cannot delete {kind} {id}: referenced by {}", .referenced_by.join(", "))]
    CascadeProtected {
        kind: EntityKind,
        id: String,
        referenced_by: Vec<String>,
    },

    /// Resource lock not acquired in time
    #[error("lock busy: {resource} not acquired within {}ms", .waited.as_millis())]
    LockTimeout { resource: String, waited: Duration },

    /// Approval already resolved
    #[error("approval {id} is not pending (current status: {current})")]
    ApprovalNotPending { id: String, current: ApprovalStatus },

    /// Payload variant does not belong to the handler's kind
    #[error("expected {expected} payload, got {actual}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    /// Operation not offered by this kind
    #[error("{operation} is not supported for {kind}")]
    UnsupportedOperation {
        kind: EntityKind,
        operation: &'static str,
    },

    /// Cancellation observed before the operation could complete
    #[error("operation cancelled")]
    Cancelled,

    /// Storage failure (I/O, encoding)
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Malformed configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl CharterError {
    /// Check if error is retryable
    ///
    /// Only lock contention is; everything else needs a different request.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Check if error is a security event
    #[inline]
    #[must_use]
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Check if error maps to "not found" at the boundary
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Shorthand for [`CharterError::NotFound`]
    #[inline]
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<StorageError> for CharterError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Security(e) => Self::Security(e),
            StorageError::Cancelled => Self::Cancelled,
            other => Self::Storage(other),
        }
    }
}

impl From<IdentityError> for CharterError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(e) => Self::Validation(e),
            IdentityError::Security(e) => Self::Security(e),
        }
    }
}

/// Result alias for Charter Core
pub type Result<T, E = CharterError> = std::result::Result<T, E>;
