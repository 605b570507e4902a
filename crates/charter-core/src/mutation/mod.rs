//! Concurrency-guarded mutation
//!
//! Everything here that rewrites a shared file does it as a full
//! read-modify-write under the resource lock for that file.

mod approval;
mod counter;
mod lock;
mod policy;

pub use approval::ApprovalQueue;
pub use counter::IdCounters;
pub use lock::{LockManager, ResourceGuard, DEFAULT_LOCK_TIMEOUT};
pub use policy::{approval_level, ApprovalLevel, ApprovalMode};
