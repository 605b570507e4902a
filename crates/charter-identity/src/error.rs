//! Error types for identity and addressing
//!
//! - [`ValidationError`]: field-scoped input problems, fixable by the caller
//! - [`SecurityError`]: addressing attempts that escape the store root

use std::path::PathBuf;

/// Field-scoped validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Entity kind is not part of the catalogue
    #[error("unknown entity type: {0}")]
    UnknownKind(String),

    /// Identifier does not match the kind's grammar
    #[error("invalid {kind} id: {id:?}")]
    InvalidId { kind: String, id: String },

    /// Sequential counter has run past the id grammar
    #[error("{kind} id space exhausted at {value}")]
    IdSpaceExhausted { kind: String, value: u32 },

    /// Required field is empty
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Field longer than its cap
    #[error("{field} exceeds {max} characters (got {actual})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    /// Too many entries in a list field
    #[error("{field} allows at most {max} entries (got {actual})")]
    TooMany {
        field: String,
        max: usize,
        actual: usize,
    },

    /// Character outside the allowed class
    #[error("{field} contains disallowed character {ch:?}")]
    DisallowedCharacter { field: String, ch: char },

    /// Value out of range or otherwise unacceptable
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    /// Name of the offending field, when the error is field-scoped
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownKind(_) | Self::IdSpaceExhausted { .. } => None,
            Self::InvalidId { .. } => Some("id"),
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::TooMany { field, .. }
            | Self::DisallowedCharacter { field, .. }
            | Self::Invalid { field, .. } => Some(field),
        }
    }

    /// Shorthand for [`ValidationError::Invalid`]
    #[inline]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Addressing attempt rejected at the store boundary
///
/// Always fatal to the request; never partially honored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// Requested path carries a NUL byte
    #[error("path contains NUL byte: {path:?}")]
    NulByte { path: String },

    /// Requested path carries a control character
    #[error("path contains control character {ch:?}: {path:?}")]
    ControlCharacter { path: String, ch: char },

    /// Cleaned path falls outside the base directory
    #[error("path {path:?} escapes {base}")]
    PathTraversal { path: String, base: PathBuf },
}

/// Any identity-layer failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Input validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Path-safety failure
    #[error(transparent)]
    Security(#[from] SecurityError),
}
