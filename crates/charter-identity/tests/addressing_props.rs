//! Property tests for id grammar and path safety

use charter_identity::{
    entity_file_path, format_sequential, mint_hashed, resolve_path, validate_id, EntityKind,
    IdentityError, SecurityError,
};
use proptest::prelude::*;
use std::path::PathBuf;

fn hashed_kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Risk),
        Just(EntityKind::Consideration),
        Just(EntityKind::Decision),
        Just(EntityKind::Task),
        Just(EntityKind::Actor),
        Just(EntityKind::Approval),
    ]
}

fn sequential_kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![Just(EntityKind::Objective), Just(EntityKind::Deliverable)]
}

proptest! {
    #[test]
    fn prop_formatted_sequential_ids_validate(kind in sequential_kind(), n in 1u32..=999) {
        let id = format_sequential(kind, n).unwrap();
        prop_assert!(validate_id(kind, &id).is_ok());
    }

    #[test]
    fn prop_hashed_ids_validate(kind in hashed_kind(), hex in "[a-f0-9]{8}") {
        let id = format!("{}-{hex}", kind.id_scheme().prefix());
        prop_assert!(validate_id(kind, &id).is_ok());
    }

    #[test]
    fn prop_uppercased_hashed_ids_rejected(kind in hashed_kind(), hex in "[a-f]{1}[a-f0-9]{7}") {
        let id = format!("{}-{}", kind.id_scheme().prefix(), hex.to_uppercase());
        prop_assert!(validate_id(kind, &id).is_err());
    }

    #[test]
    fn prop_wrong_digit_count_rejected(kind in sequential_kind(), digits in "[0-9]{1,2}|[0-9]{4,6}") {
        let id = format!("{}-{digits}", kind.id_scheme().prefix());
        prop_assert!(validate_id(kind, &id).is_err());
    }

    #[test]
    fn prop_embedded_separator_rejected(
        kind in hashed_kind(),
        hex in "[a-f0-9]{8}",
        at in 0usize..8,
        sep in prop_oneof![Just('/'), Just('\\')],
    ) {
        let mut id = format!("{}-{hex}", kind.id_scheme().prefix());
        let prefix_len = kind.id_scheme().prefix().len() + 1;
        id.insert(prefix_len + at, sep);
        prop_assert!(validate_id(kind, &id).is_err());
    }

    #[test]
    fn prop_wrong_prefix_rejected(kind in hashed_kind(), other in hashed_kind(), hex in "[a-f0-9]{8}") {
        prop_assume!(kind != other);
        let id = format!("{}-{hex}", other.id_scheme().prefix());
        prop_assert!(validate_id(kind, &id).is_err());
    }

    #[test]
    fn prop_parent_segments_are_security_errors(
        head in "[a-z]{0,8}",
        tail in "[a-z]{1,8}",
    ) {
        let requested = if head.is_empty() {
            format!("../{tail}")
        } else {
            format!("{head}/../../{tail}")
        };
        let err = resolve_path(&PathBuf::from("/srv/project"), &requested).unwrap_err();
        prop_assert!(matches!(err, SecurityError::PathTraversal { .. }), "{err:?}");
    }

    #[test]
    fn prop_control_characters_are_security_errors(
        head in "[a-z]{0,8}",
        ctrl in prop::char::range('\u{0}', '\u{1f}'),
        tail in "[a-z]{0,8}",
    ) {
        let requested = format!("{head}{ctrl}{tail}");
        let err = resolve_path(&PathBuf::from("/srv/project"), &requested).unwrap_err();
        prop_assert!(matches!(
            err,
            SecurityError::NulByte { .. } | SecurityError::ControlCharacter { .. }
        ), "{err:?}");
    }

    #[test]
    fn prop_resolved_paths_stay_under_base(segments in proptest::collection::vec("[a-z0-9_.-]{1,8}", 1..5)) {
        let base = PathBuf::from("/srv/project");
        let requested = segments.join("/");
        if let Ok(path) = resolve_path(&base, &requested) {
            prop_assert!(path.starts_with(&base));
        }
    }
}

#[test]
fn minted_ids_are_addressable() {
    let base = PathBuf::from("/srv/project");
    let id = mint_hashed(EntityKind::Decision).unwrap();
    let path = entity_file_path(&base, EntityKind::Decision, &id).unwrap();
    assert_eq!(path, base.join("decisions").join(format!("{id}.yaml")));
}

#[test]
fn traversal_in_id_is_rejected_before_resolution() {
    let err = entity_file_path(
        &PathBuf::from("/srv/project"),
        EntityKind::Objective,
        "../../etc",
    )
    .unwrap_err();
    assert!(matches!(err, IdentityError::Validation(_)));
}
