//! Charter Storage
//!
//! The file-backed storage capability consumed by the entity layer:
//! exists / read-typed / write-typed / list-directory / delete / ensure-directory.
//! Every call takes a [`CancellationToken`] and a path relative to the store
//! root, and every path is re-checked against the root before use.
//!
//! Records are encoded as YAML; writes go through a temp file and an atomic
//! rename.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cancel;
mod error;
mod fs;

pub use cancel::{checkpoint, CancellationToken};
pub use error::StorageError;
pub use fs::FileStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
