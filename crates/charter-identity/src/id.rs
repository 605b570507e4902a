//! Identifier grammar and minting
//!
//! Sequential kinds use `prefix-NNN` (three zero-padded decimal digits);
//! hashed kinds use `prefix-` followed by 8 lowercase hex characters taken from
//! a v4 UUID. Singletons accept only their fixed id.

use crate::error::ValidationError;
use crate::kind::{EntityKind, IdScheme};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static SEQUENTIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+)-([0-9]{3})$").expect("valid sequential id regex"));
static HASHED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+)-([a-f0-9]{8})$").expect("valid hashed id regex"));

/// Largest number representable in the sequential grammar
pub const MAX_SEQUENTIAL: u32 = 999;

/// Check `id` against the grammar of `kind`
///
/// # Errors
/// [`ValidationError::InvalidId`] when the id does not match.
pub fn validate_id(kind: EntityKind, id: &str) -> Result<(), ValidationError> {
    let ok = match kind.id_scheme() {
        IdScheme::Singleton(fixed) => id == fixed,
        IdScheme::Sequential(prefix) => prefix_matches(&SEQUENTIAL_RE, id, prefix),
        IdScheme::Hashed(prefix) => prefix_matches(&HASHED_RE, id, prefix),
    };

    if ok {
        Ok(())
    } else {
        Err(invalid(kind, id))
    }
}

/// Check `id` against the grammar of the kind named `type_name`
///
/// Unknown type names are always rejected.
///
/// # Errors
/// [`ValidationError::UnknownKind`] or [`ValidationError::InvalidId`].
pub fn validate_id_for(type_name: &str, id: &str) -> Result<EntityKind, ValidationError> {
    let kind: EntityKind = type_name.parse()?;
    validate_id(kind, id)?;
    Ok(kind)
}

fn prefix_matches(re: &Regex, id: &str, prefix: &str) -> bool {
    re.captures(id)
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| m.as_str() == prefix)
}

fn invalid(kind: EntityKind, id: &str) -> ValidationError {
    ValidationError::InvalidId {
        kind: kind.name().to_string(),
        id: id.to_string(),
    }
}

/// Render counter value `n` as a sequential id
///
/// # Errors
/// - [`ValidationError::InvalidId`] if `kind` is not sequential
/// - [`ValidationError::IdSpaceExhausted`] if `n` is 0 or above [`MAX_SEQUENTIAL`]
pub fn format_sequential(kind: EntityKind, n: u32) -> Result<String, ValidationError> {
    let IdScheme::Sequential(prefix) = kind.id_scheme() else {
        return Err(ValidationError::invalid(
            "id",
            format!("{kind} does not use sequential ids"),
        ));
    };
    if n == 0 || n > MAX_SEQUENTIAL {
        return Err(ValidationError::IdSpaceExhausted {
            kind: kind.name().to_string(),
            value: n,
        });
    }
    Ok(format!("{prefix}-{n:03}"))
}

/// Extract the counter value from a well-formed sequential id
#[must_use]
pub fn parse_sequential(kind: EntityKind, id: &str) -> Option<u32> {
    let IdScheme::Sequential(prefix) = kind.id_scheme() else {
        return None;
    };
    let caps = SEQUENTIAL_RE.captures(id)?;
    if caps.get(1)?.as_str() != prefix {
        return None;
    }
    caps.get(2)?.as_str().parse().ok()
}

/// Mint a fresh UUID-derived id for a hashed kind
///
/// Singletons get their fixed id. Sequential kinds must go through the
/// counter instead.
///
/// # Errors
/// [`ValidationError::Invalid`] when called for a sequential kind.
pub fn mint_hashed(kind: EntityKind) -> Result<String, ValidationError> {
    match kind.id_scheme() {
        IdScheme::Singleton(fixed) => Ok(fixed.to_string()),
        IdScheme::Hashed(prefix) => {
            let hex = Uuid::new_v4().simple().to_string();
            Ok(format!("{prefix}-{}", &hex[..8]))
        }
        IdScheme::Sequential(_) => Err(ValidationError::invalid(
            "id",
            format!("{kind} ids are minted by the sequential counter"),
        )),
    }
}
