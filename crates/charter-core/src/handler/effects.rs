//! One-time side effects of creating a record

use super::{EntityHandler, StandardHandler};
use crate::error::Result;
use crate::model::{decided_by, Consideration, ConsiderationStatus, Decision, Record};
use async_trait::async_trait;
use charter_identity::ValidationError;
use charter_storage::CancellationToken;
use std::sync::Arc;

/// Work tied to the creation of an `R`
///
/// `prepare` runs before anything is written; `apply` runs after the record
/// is stored. If `apply` fails the handler deletes the new record again, so
/// creation is all-or-nothing.
#[async_trait]
pub trait CreateEffect<R: Record>: Send + Sync {
    /// Refuse the create up front
    async fn prepare(&self, _cancel: &CancellationToken, _record: &R) -> Result<()> {
        Ok(())
    }

    async fn apply(&self, cancel: &CancellationToken, record: &R) -> Result<()>;
}

/// Settles the consideration a new decision answers
#[derive(Debug)]
pub struct MarkConsiderationDecided {
    considerations: Arc<StandardHandler<Consideration>>,
}

impl MarkConsiderationDecided {
    #[must_use]
    pub fn new(considerations: Arc<StandardHandler<Consideration>>) -> Self {
        Self { considerations }
    }
}

#[async_trait]
impl CreateEffect<Decision> for MarkConsiderationDecided {
    async fn prepare(&self, cancel: &CancellationToken, decision: &Decision) -> Result<()> {
        let Some(consideration_id) = &decision.consideration_id else {
            return Ok(());
        };
        let consideration = self.considerations.get(cancel, consideration_id).await?;
        if consideration.status == ConsiderationStatus::Decided {
            return Err(ValidationError::invalid(
                "consideration_id",
                format!("{consideration_id} is already decided"),
            )
            .into());
        }
        Ok(())
    }

    async fn apply(&self, cancel: &CancellationToken, decision: &Decision) -> Result<()> {
        let Some(consideration_id) = &decision.consideration_id else {
            return Ok(());
        };
        self.considerations
            .update(cancel, consideration_id, decided_by(&decision.id))
            .await?;
        tracing::info!(
            consideration = %consideration_id,
            decision = %decision.id,
            "marked consideration decided"
        );
        Ok(())
    }
}
