//! Read-only self-consistency scan
//!
//! Every registered kind is scanned from disk and each record is checked
//! independently of how it was written: id grammar, file name, duplicate ids,
//! dangling references, approval placement and derived fields. Findings are
//! reported, never enforced; auto-fixable ones can be applied afterwards.

use crate::collection::Scanned;
use crate::error::Result;
use crate::handler::DynHandler;
use crate::model::{
    ApprovalStatus, Entity, EntityPatch, RiskPatch, TaskPatch, TaskStatus, MAX_PROGRESS,
};
use crate::registry::Registry;
use charter_identity::{id_from_file_name, validate_id, EntityKind, Layout, APPROVALS_DIR};
use charter_storage::{checkpoint, CancellationToken};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How bad a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Inconsistent but usable; usually auto-fixable
    Warning,
    /// Needs a human
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Mechanical repair for a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintFix {
    /// Progress is 100 but the task is not done
    MarkTaskDone,
    /// Task is done but progress is below 100
    CompleteTaskProgress,
    /// Stored risk score disagrees with probability/impact
    RecomputeRiskScore,
}

impl LintFix {
    fn patch(self) -> EntityPatch {
        match self {
            Self::MarkTaskDone => TaskPatch {
                status: Some(TaskStatus::Done),
                ..TaskPatch::default()
            }
            .into(),
            Self::CompleteTaskProgress => TaskPatch {
                progress: Some(MAX_PROGRESS),
                ..TaskPatch::default()
            }
            .into(),
            // applying any risk patch recomputes the score
            Self::RecomputeRiskScore => RiskPatch::default().into(),
        }
    }
}

/// One problem found by the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub kind: EntityKind,
    /// Record id, when the record could be read
    pub id: Option<String>,
    /// File the record lives in, relative to the store root
    pub file: PathBuf,
    pub severity: Severity,
    pub message: String,
    pub fix: Option<LintFix>,
}

impl LintFinding {
    #[must_use]
    pub fn auto_fixable(&self) -> bool {
        self.fix.is_some()
    }
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ", self.severity, self.kind)?;
        match &self.id {
            Some(id) => write!(f, "{id}")?,
            None => write!(f, "({})", self.file.display())?,
        }
        write!(f, ": {}", self.message)
    }
}

/// Everything one scan found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub findings: Vec<LintFinding>,
    /// Records (or unreadable files) looked at
    pub scanned: usize,
}

impl LintReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn fixable(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings.iter().filter(|f| f.auto_fixable())
    }
}

struct Collector {
    findings: Vec<LintFinding>,
}

impl Collector {
    fn push(
        &mut self,
        kind: EntityKind,
        id: Option<&str>,
        file: &Path,
        severity: Severity,
        message: impl Into<String>,
        fix: Option<LintFix>,
    ) {
        self.findings.push(LintFinding {
            kind,
            id: id.map(str::to_string),
            file: file.to_path_buf(),
            severity,
            message: message.into(),
            fix,
        });
    }
}

/// Scan every kind registered in `registry`
///
/// References to kinds the registry does not hold are not checked.
///
/// # Errors
/// Cancellation or storage failures other than undecodable records.
pub async fn lint(registry: &Registry, cancel: &CancellationToken) -> Result<LintReport> {
    let mut population: BTreeMap<EntityKind, Vec<Scanned<Entity>>> = BTreeMap::new();
    for handler in registry.handlers() {
        checkpoint(cancel)?;
        population.insert(handler.entity_kind(), handler.scan_entities(cancel).await?);
    }

    let known: BTreeSet<(EntityKind, &str)> = population
        .iter()
        .flat_map(|(kind, entries)| {
            entries
                .iter()
                .filter_map(|e| e.record.as_ref().ok())
                .map(move |entity| (*kind, entity.id()))
        })
        .collect();

    let mut out = Collector {
        findings: Vec::new(),
    };
    let mut scanned = 0;

    for (&kind, entries) in &population {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for entry in entries {
            scanned += 1;
            let entity = match &entry.record {
                Ok(entity) => entity,
                Err(reason) => {
                    let message = format!("unreadable record: {reason}");
                    out.push(kind, None, &entry.file, Severity::Error, message, None);
                    continue;
                }
            };
            let id = entity.id();

            if validate_id(kind, id).is_err() {
                let message = "id does not match the kind's grammar";
                out.push(kind, Some(id), &entry.file, Severity::Error, message, None);
            }
            if !seen.insert(id) {
                out.push(kind, Some(id), &entry.file, Severity::Error, "duplicate id", None);
            }
            check_file_name(&mut out, kind, id, &entry.file);

            for reference in entity.references() {
                let target_registered = population.contains_key(&reference.kind);
                if target_registered && !known.contains(&(reference.kind, reference.id.as_str())) {
                    out.push(
                        kind,
                        Some(id),
                        &entry.file,
                        Severity::Error,
                        format!(
                            "{} points to missing {} {}",
                            reference.field, reference.kind, reference.id
                        ),
                        None,
                    );
                }
            }

            check_derived(&mut out, entity, &entry.file);
        }
    }

    let report = LintReport {
        findings: out.findings,
        scanned,
    };
    tracing::info!(
        scanned = report.scanned,
        errors = report.errors().count(),
        warnings = report.warnings().count(),
        "lint finished"
    );
    Ok(report)
}

/// Apply every auto-fixable finding through the registry
///
/// Returns the number of records rewritten.
///
/// # Errors
/// The first failing update.
pub async fn apply_fixes(
    registry: &Registry,
    cancel: &CancellationToken,
    report: &LintReport,
) -> Result<usize> {
    let mut applied = 0;
    for finding in report.fixable() {
        let (Some(fix), Some(id)) = (finding.fix, finding.id.as_deref()) else {
            continue;
        };
        let handler: Arc<dyn DynHandler> = match registry.handler(finding.kind) {
            Some(handler) => handler,
            None => continue,
        };
        handler.update_entity(cancel, id, fix.patch()).await?;
        tracing::info!(kind = %finding.kind, id, fix = ?fix, "applied lint fix");
        applied += 1;
    }
    Ok(applied)
}

fn check_file_name(out: &mut Collector, kind: EntityKind, id: &str, file: &Path) {
    match kind.layout() {
        Layout::Directory(_) => {
            let stem = file
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(id_from_file_name);
            if stem != Some(id) {
                let message = "file name does not match id";
                out.push(kind, Some(id), file, Severity::Error, message, None);
            }
        }
        Layout::Queue => {
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                return;
            };
            if file.starts_with(Path::new(APPROVALS_DIR).join("pending")) {
                return;
            }
            if id_from_file_name(name) != Some(id) {
                let message = "file name does not match id";
                out.push(kind, Some(id), file, Severity::Error, message, None);
            }
        }
        Layout::Singleton(_) | Layout::Array(_) => {}
    }
}

fn check_derived(out: &mut Collector, entity: &Entity, file: &Path) {
    let kind = entity.kind();
    let id = Some(entity.id());
    match entity {
        Entity::Task(task) if task.completion_mismatch() => {
            let fix = if task.status == TaskStatus::Done {
                LintFix::CompleteTaskProgress
            } else {
                LintFix::MarkTaskDone
            };
            out.push(
                kind,
                id,
                file,
                Severity::Warning,
                format!("progress {} disagrees with status {}", task.progress, task.status),
                Some(fix),
            );
        }
        Entity::Risk(risk) if risk.risk_score != risk.expected_score() => {
            out.push(
                kind,
                id,
                file,
                Severity::Warning,
                format!(
                    "risk score {} should be {} for {}/{}",
                    risk.risk_score,
                    risk.expected_score(),
                    risk.probability,
                    risk.impact
                ),
                Some(LintFix::RecomputeRiskScore),
            );
        }
        Entity::Consideration(consideration) if consideration.missing_decision_link() => {
            let message = "decided without a decision_id";
            out.push(kind, id, file, Severity::Error, message, None);
        }
        Entity::Approval(approval) => {
            let in_pending = file.starts_with(Path::new(APPROVALS_DIR).join("pending"));
            let placed_right = match approval.status {
                ApprovalStatus::Pending => in_pending,
                resolved => file.starts_with(Path::new(APPROVALS_DIR).join(resolved.as_str())),
            };
            if !placed_right {
                out.push(
                    kind,
                    id,
                    file,
                    Severity::Error,
                    format!("{} approval stored in the wrong place", approval.status),
                    None,
                );
            }
        }
        _ => {}
    }
}
