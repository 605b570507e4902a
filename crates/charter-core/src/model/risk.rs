//! Risks, scored from probability and impact

use super::{
    patch_optional, patch_reference, patch_required, reference_id, MetaDraft, MetaPatch, Metadata,
    Record, Reference,
};
use charter_identity::sanitize::{sanitize_optional, sanitize_required};
use charter_identity::{EntityKind, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

status_enum! {
    /// Three-point scale for probability and impact
    Level("level") {
        Medium => "medium",
        Low => "low",
        High => "high",
    }
}

impl Level {
    /// Scoring weight: low 1, medium 2, high 3
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

status_enum! {
    /// Risk lifecycle
    RiskStatus("status") {
        Open => "open",
        Mitigated => "mitigated",
        Closed => "closed",
        Accepted => "accepted",
    }
}

/// Derived score for a probability/impact pair
#[must_use]
pub fn risk_score(probability: Level, impact: Level) -> u8 {
    probability.weight() * impact.weight()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub probability: Level,
    #[serde(default)]
    pub impact: Level,
    /// Derived from probability and impact
    pub risk_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_id: Option<String>,
    #[serde(default)]
    pub status: RiskStatus,
    pub metadata: Metadata,
}

impl Risk {
    /// Score the current probability/impact pair implies
    #[must_use]
    pub fn expected_score(&self) -> u8 {
        risk_score(self.probability, self.impact)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskDraft {
    pub title: String,
    pub description: Option<String>,
    pub probability: Option<Level>,
    pub impact: Option<Level>,
    pub mitigation: Option<String>,
    pub objective_id: Option<String>,
    pub status: Option<RiskStatus>,
    pub meta: MetaDraft,
}

impl RiskDraft {
    /// Draft with only a title; everything else defaults
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub probability: Option<Level>,
    pub impact: Option<Level>,
    pub mitigation: Option<Option<String>>,
    pub objective_id: Option<Option<String>>,
    pub status: Option<RiskStatus>,
    pub meta: MetaPatch,
}

impl Record for Risk {
    const KIND: EntityKind = EntityKind::Risk;
    type Draft = RiskDraft;
    type Patch = RiskPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    fn status_label(&self) -> Option<&'static str> {
        Some(self.status.as_str())
    }

    fn references(&self) -> Vec<Reference> {
        Reference::optional("objective_id", EntityKind::Objective, self.objective_id.as_ref())
            .into_iter()
            .collect()
    }

    fn from_draft(draft: RiskDraft, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let probability = draft.probability.unwrap_or_default();
        let impact = draft.impact.unwrap_or_default();
        Ok(Self {
            id: String::new(),
            title: sanitize_required("title", &draft.title)?,
            description: sanitize_optional("description", draft.description.as_deref())?,
            probability,
            impact,
            risk_score: risk_score(probability, impact),
            mitigation: sanitize_optional("mitigation", draft.mitigation.as_deref())?,
            objective_id: reference_id(
                "objective_id",
                EntityKind::Objective,
                draft.objective_id.as_deref(),
            )?,
            status: draft.status.unwrap_or_default(),
            metadata: Metadata::from_draft(draft.meta, now)?,
        })
    }

    fn apply_patch(&mut self, patch: RiskPatch) -> Result<(), ValidationError> {
        let title = patch_required("title", patch.title.as_deref())?;
        let description = patch_optional("description", patch.description)?;
        let mitigation = patch_optional("mitigation", patch.mitigation)?;
        let objective_id =
            patch_reference("objective_id", EntityKind::Objective, patch.objective_id)?;
        let mut metadata = self.metadata.clone();
        metadata.apply(patch.meta)?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(mitigation) = mitigation {
            self.mitigation = mitigation;
        }
        if let Some(objective_id) = objective_id {
            self.objective_id = objective_id;
        }
        if let Some(probability) = patch.probability {
            self.probability = probability;
        }
        if let Some(impact) = patch.impact {
            self.impact = impact;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.risk_score = self.expected_score();
        self.metadata = metadata;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_medium_medium() {
        let risk = Risk::from_draft(RiskDraft::titled("DB outage"), Utc::now()).unwrap();
        assert_eq!(risk.probability, Level::Medium);
        assert_eq!(risk.impact, Level::Medium);
        assert_eq!(risk.risk_score, 4);
        assert_eq!(risk.status, RiskStatus::Open);
    }

    #[test]
    fn score_follows_patched_levels() {
        let mut risk = Risk::from_draft(RiskDraft::titled("Vendor lock-in"), Utc::now()).unwrap();
        risk.apply_patch(RiskPatch {
            probability: Some(Level::High),
            impact: Some(Level::Low),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(risk.risk_score, 3);
    }

    #[test]
    fn score_table() {
        assert_eq!(risk_score(Level::Low, Level::Low), 1);
        assert_eq!(risk_score(Level::High, Level::High), 9);
        assert_eq!(risk_score(Level::Medium, Level::High), 6);
    }

    #[test]
    fn mitigation_is_escaped() {
        let risk = Risk::from_draft(
            RiskDraft {
                mitigation: Some("<b>failover</b>".into()),
                ..RiskDraft::titled("DB outage")
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(risk.mitigation.as_deref(), Some("&lt;b&gt;failover&lt;/b&gt;"));
    }

    #[test]
    fn clearing_the_objective_drops_the_reference() {
        let mut risk = Risk::from_draft(
            RiskDraft {
                objective_id: Some("obj-001".into()),
                ..RiskDraft::titled("Scope creep")
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(risk.references().len(), 1);
        risk.apply_patch(RiskPatch {
            objective_id: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert!(risk.references().is_empty());
    }
}
