//! Charter Core - entity persistence and integrity
//!
//! Typed handlers for the project-record kinds (vision, objectives,
//! deliverables, risks, considerations, decisions, tasks, actors, approvals)
//! over a [`charter_storage::FileStore`]:
//! - ids are minted per kind and validated on every lookup
//! - references are checked on write and deletes are refused while
//!   dependents remain
//! - shared files (arrays, counters, the approval queue) are mutated under
//!   an in-process and an advisory file lock
//! - every operation takes a cancellation token and commits nothing once
//!   cancellation is observed
//!
//! # Example
//!
//! ```rust,ignore
//! use charter_core::prelude::*;
//!
//! # async fn example() -> charter_core::Result<()> {
//! let cancel = CancellationToken::new();
//! let store = Store::open("./project", &cancel).await?;
//!
//! let risk = store.risks().add(&cancel, RiskDraft::titled("DB outage")).await?;
//! assert_eq!(risk.risk_score, 4);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod collection;

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod integrity;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod registry;
pub mod store;

pub use collection::Scanned;
pub use config::{IntegrityMode, StoreConfig};
pub use context::StoreContext;
pub use error::{CharterError, Result};
pub use handler::{DynHandler, EntityHandler, ListFilter, StandardHandler};
pub use integrity::{Integrity, LintFinding, LintReport, ReferenceCheck, Severity};
pub use model::{Entity, EntityDraft, EntityPatch, Record};
pub use mutation::{ApprovalLevel, ApprovalMode, ApprovalQueue, IdCounters, LockManager};
pub use registry::{Registry, RegistryReferences};
pub use store::{Handlers, Store};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Charter Core
    pub use crate::model::*;
    pub use crate::{
        CharterError, DynHandler, EntityHandler, ListFilter, Registry, Store, StoreConfig,
    };
    pub use charter_identity::EntityKind;
    pub use charter_storage::CancellationToken;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
