//! Path-safe addressing
//!
//! Every read and write of the store goes through [`resolve_path`], which
//! guarantees the resulting path lies lexically inside the store root. The
//! check is not symlink-aware: a symlink planted inside the root is followed.

use crate::error::{IdentityError, SecurityError, ValidationError};
use crate::id::validate_id;
use crate::kind::{EntityKind, Layout};
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// File extension of every record file
pub const EXTENSION: &str = "yaml";

/// Counter snapshot, relative to the store root
pub const COUNTER_SNAPSHOT: &str = "id_counters.yaml";

/// Approval queue directory, relative to the store root
pub const APPROVALS_DIR: &str = "approvals";

/// Terminal approval outcome, selecting the permanent directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// `approvals/approved/`
    Approved,
    /// `approvals/rejected/`
    Rejected,
}

impl Resolution {
    /// Directory name under [`APPROVALS_DIR`]
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Resolve `requested` against `base`, refusing anything that escapes it
///
/// NUL bytes, control characters and `..` components are rejected before any
/// path arithmetic. The joined path is then cleaned lexically and accepted
/// only if it equals `base` or lies beneath it.
///
/// # Errors
/// [`SecurityError`] on any violation.
pub fn resolve_path(base: &Path, requested: impl AsRef<Path>) -> Result<PathBuf, SecurityError> {
    let requested = requested.as_ref();
    let raw = requested.to_string_lossy();

    if raw.contains('\0') {
        return Err(SecurityError::NulByte {
            path: raw.into_owned(),
        });
    }
    if let Some(ch) = raw.chars().find(|c| c.is_control()) {
        return Err(SecurityError::ControlCharacter {
            path: raw.into_owned(),
            ch,
        });
    }

    let base = base.clean();
    let traversal = || SecurityError::PathTraversal {
        path: raw.to_string(),
        base: base.clone(),
    };

    if requested
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(traversal());
    }

    let joined = base.join(requested).clean();
    if joined == base || joined.starts_with(&base) {
        Ok(joined)
    } else {
        Err(traversal())
    }
}

/// Relative location of the file holding entity `id` of `kind`
///
/// Singletons and array kinds map to their shared file regardless of `id`
/// (the id is still validated for array kinds). Approvals map to the pending
/// queue; see [`approval_outcome_path`] for resolved ones.
///
/// # Errors
/// [`ValidationError::InvalidId`] if `id` does not match the kind's grammar.
pub fn entity_relative_path(kind: EntityKind, id: &str) -> Result<PathBuf, ValidationError> {
    match kind.layout() {
        Layout::Singleton(name) => Ok(file_name(name)),
        Layout::Array(name) => {
            validate_id(kind, id)?;
            Ok(file_name(name))
        }
        Layout::Directory(dir) => {
            validate_id(kind, id)?;
            Ok(Path::new(dir).join(file_name(id)))
        }
        Layout::Queue => {
            validate_id(kind, id)?;
            Ok(approval_queue_path())
        }
    }
}

/// Absolute location of entity `id` of `kind` under `base`
///
/// # Errors
/// [`IdentityError`] on invalid id or unsafe resolution.
pub fn entity_file_path(base: &Path, kind: EntityKind, id: &str) -> Result<PathBuf, IdentityError> {
    let relative = entity_relative_path(kind, id)?;
    Ok(resolve_path(base, relative)?)
}

/// Relative directory holding one file per instance, for directory kinds
#[must_use]
pub fn kind_directory(kind: EntityKind) -> Option<PathBuf> {
    match kind.layout() {
        Layout::Directory(dir) => Some(PathBuf::from(dir)),
        _ => None,
    }
}

/// Relative path of the shared pending approval queue
#[must_use]
pub fn approval_queue_path() -> PathBuf {
    Path::new(APPROVALS_DIR).join("pending").join(file_name("queue"))
}

/// Relative directory holding resolved approvals of one outcome
#[must_use]
pub fn approval_outcome_dir(resolution: Resolution) -> PathBuf {
    Path::new(APPROVALS_DIR).join(resolution.dir_name())
}

/// Relative path of the permanent file for a resolved approval
///
/// # Errors
/// [`ValidationError::InvalidId`] if `id` is not an approval id.
pub fn approval_outcome_path(resolution: Resolution, id: &str) -> Result<PathBuf, ValidationError> {
    validate_id(EntityKind::Approval, id)?;
    Ok(approval_outcome_dir(resolution).join(file_name(id)))
}

/// `<stem>.yaml`
#[must_use]
pub fn file_name(stem: &str) -> PathBuf {
    PathBuf::from(format!("{stem}.{EXTENSION}"))
}

/// Record id implied by a file name, if it carries the record extension
#[must_use]
pub fn id_from_file_name(name: &str) -> Option<&str> {
    name.strip_suffix(EXTENSION)?.strip_suffix('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/srv/project")
    }

    #[test]
    fn resolves_plain_relative_path() {
        let p = resolve_path(&base(), "objectives/obj-001.yaml").unwrap();
        assert_eq!(p, PathBuf::from("/srv/project/objectives/obj-001.yaml"));
    }

    #[test]
    fn base_itself_is_accepted() {
        assert_eq!(resolve_path(&base(), "").unwrap(), base());
        assert_eq!(resolve_path(&base(), ".").unwrap(), base());
    }

    #[test]
    fn rejects_parent_traversal() {
        let err = resolve_path(&base(), "../etc/passwd").unwrap_err();
        assert!(matches!(err, SecurityError::PathTraversal { .. }));

        let err = resolve_path(&base(), "objectives/../../x").unwrap_err();
        assert!(matches!(err, SecurityError::PathTraversal { .. }));
    }

    #[test]
    fn rejects_absolute_escape() {
        let err = resolve_path(&base(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, SecurityError::PathTraversal { .. }));
    }

    #[test]
    fn absolute_path_inside_base_is_contained() {
        let p = resolve_path(&base(), "/srv/project/risks/risk-0000beef.yaml").unwrap();
        assert_eq!(p, PathBuf::from("/srv/project/risks/risk-0000beef.yaml"));
    }

    #[test]
    fn rejects_sibling_with_common_prefix() {
        let err = resolve_path(&base(), "/srv/project2/file").unwrap_err();
        assert!(matches!(err, SecurityError::PathTraversal { .. }));
    }

    #[test]
    fn rejects_nul_and_control_characters() {
        assert!(matches!(
            resolve_path(&base(), "risks/a\0b.yaml"),
            Err(SecurityError::NulByte { .. })
        ));
        assert!(matches!(
            resolve_path(&base(), "risks/a\nb.yaml"),
            Err(SecurityError::ControlCharacter { ch: '\n', .. })
        ));
        assert!(matches!(
            resolve_path(&base(), "risks/\u{1b}[0m"),
            Err(SecurityError::ControlCharacter { .. })
        ));
    }

    #[test]
    fn entity_paths_per_layout() {
        assert_eq!(
            entity_relative_path(EntityKind::Objective, "obj-003").unwrap(),
            PathBuf::from("objectives/obj-003.yaml")
        );
        assert_eq!(
            entity_relative_path(EntityKind::Task, "task-0a0b0c0d").unwrap(),
            PathBuf::from("tasks.yaml")
        );
        assert_eq!(
            entity_relative_path(EntityKind::Vision, "anything").unwrap(),
            PathBuf::from("vision.yaml")
        );
        assert_eq!(
            entity_relative_path(EntityKind::Approval, "apr-0a0b0c0d").unwrap(),
            PathBuf::from("approvals/pending/queue.yaml")
        );
    }

    #[test]
    fn entity_path_validates_id() {
        let err = entity_file_path(&base(), EntityKind::Risk, "../risk-1a2b3c4d").unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[test]
    fn approval_outcome_paths() {
        assert_eq!(
            approval_outcome_path(Resolution::Rejected, "apr-12345678").unwrap(),
            PathBuf::from("approvals/rejected/apr-12345678.yaml")
        );
        assert!(approval_outcome_path(Resolution::Approved, "obj-001").is_err());
    }

    #[test]
    fn id_from_file_name_strips_extension() {
        assert_eq!(id_from_file_name("obj-001.yaml"), Some("obj-001"));
        assert_eq!(id_from_file_name("obj-001.yml"), None);
        assert_eq!(id_from_file_name("yaml"), None);
    }
}
