//! Charter Identity & Addressing
//!
//! Per-kind identifier grammar, path-safe resolution inside a store root, and
//! sanitization of free-text fields before they reach disk.
//!
//! # Core Concepts
//!
//! - [`EntityKind`]: closed catalogue of record kinds, with id scheme and layout
//! - [`validate_id`]: grammar check (`obj-001`, `task-1a2b3c4d`, ...)
//! - [`resolve_path`]: lexical containment check, the store's security boundary
//! - [`entity_file_path`]: id validation composed with path resolution
//!
//! # Example
//!
//! ```rust
//! use charter_identity::{entity_file_path, EntityKind};
//! use std::path::Path;
//!
//! let path = entity_file_path(Path::new("/srv/project"), EntityKind::Objective, "obj-001").unwrap();
//! assert!(path.ends_with("objectives/obj-001.yaml"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod id;
mod kind;
mod path;
pub mod sanitize;

pub use error::{IdentityError, SecurityError, ValidationError};
pub use id::{
    format_sequential, mint_hashed, parse_sequential, validate_id, validate_id_for,
    MAX_SEQUENTIAL,
};
pub use kind::{EntityKind, IdScheme, Layout};
pub use path::{
    approval_outcome_dir, approval_outcome_path, approval_queue_path, entity_file_path,
    entity_relative_path, file_name, id_from_file_name, kind_directory, resolve_path, Resolution,
    APPROVALS_DIR, COUNTER_SNAPSHOT, EXTENSION,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
