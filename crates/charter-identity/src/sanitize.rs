//! Free-text sanitization applied before a record is persisted
//!
//! Text fields are length-capped per field name, stripped of control
//! characters (newline, carriage return and tab survive), HTML-escaped when the
//! field is rich text, and normalized to NFC. Tags and owner names are checked
//! against an allow-listed character class. Violations are reported, never
//! silently truncated.

use crate::error::ValidationError;
use unicode_normalization::UnicodeNormalization;

/// Maximum number of tags on a record
pub const MAX_TAGS: usize = 20;
/// Maximum length of a single tag
pub const MAX_TAG_LEN: usize = 32;
/// Maximum length of an owner name
pub const MAX_OWNER_LEN: usize = 100;

/// Sanitization rules for one text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    /// Maximum length in characters, measured on the raw input
    pub max_chars: usize,
    /// Whether the field may ever be rendered as markup
    pub rich: bool,
}

impl FieldPolicy {
    /// Rules for the field called `field`
    #[must_use]
    pub fn for_field(field: &str) -> Self {
        match field {
            "title" => Self::plain(200),
            "name" | "role" | "requested_by" | "resolved_by" => Self::plain(120),
            "contact" => Self::plain(254),
            "summary" => Self::plain(500),
            "statement" | "mitigation" => Self::rich(5_000),
            "note" => Self::rich(2_000),
            "description" | "rationale" => Self::rich(10_000),
            _ => Self::plain(1_000),
        }
    }

    const fn plain(max_chars: usize) -> Self {
        Self {
            max_chars,
            rich: false,
        }
    }

    const fn rich(max_chars: usize) -> Self {
        Self {
            max_chars,
            rich: true,
        }
    }
}

/// Sanitize an optional free-text field
///
/// # Errors
/// [`ValidationError::TooLong`] when the raw value exceeds the field's cap.
pub fn sanitize_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let policy = FieldPolicy::for_field(field);

    let actual = value.chars().count();
    if actual > policy.max_chars {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: policy.max_chars,
            actual,
        });
    }

    let stripped: String = value
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    let escaped = if policy.rich {
        escape_html(&stripped)
    } else {
        stripped
    };

    Ok(escaped.nfc().collect())
}

/// Sanitize a field that must carry visible content
///
/// # Errors
/// [`ValidationError::Empty`] for blank input, otherwise as [`sanitize_text`].
pub fn sanitize_required(field: &str, value: &str) -> Result<String, ValidationError> {
    let clean = sanitize_text(field, value)?;
    if clean.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }
    Ok(clean)
}

/// Sanitize an optional text value, passing `None` through
///
/// # Errors
/// As [`sanitize_text`].
pub fn sanitize_optional(field: &str, value: Option<&str>) -> Result<Option<String>, ValidationError> {
    value.map(|v| sanitize_text(field, v)).transpose()
}

/// Case-fold and validate a tag list
///
/// Tags are lowercased, limited to `[a-z0-9_-]`, and deduplicated preserving
/// first occurrence.
///
/// # Errors
/// [`ValidationError`] scoped to `tags` on any violation.
pub fn sanitize_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>, ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::TooMany {
            field: "tags".into(),
            max: MAX_TAGS,
            actual: tags.len(),
        });
    }

    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if tag.is_empty() {
            return Err(ValidationError::Empty {
                field: "tags".into(),
            });
        }
        let len = tag.chars().count();
        if len > MAX_TAG_LEN {
            return Err(ValidationError::TooLong {
                field: "tags".into(),
                max: MAX_TAG_LEN,
                actual: len,
            });
        }
        if let Some(ch) = tag
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_')))
        {
            return Err(ValidationError::DisallowedCharacter {
                field: "tags".into(),
                ch,
            });
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}

/// Validate an owner name against the allow-listed character class
///
/// # Errors
/// [`ValidationError`] scoped to `owner` on any violation.
pub fn sanitize_owner(owner: &str) -> Result<String, ValidationError> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(ValidationError::Empty {
            field: "owner".into(),
        });
    }
    let len = owner.chars().count();
    if len > MAX_OWNER_LEN {
        return Err(ValidationError::TooLong {
            field: "owner".into(),
            max: MAX_OWNER_LEN,
            actual: len,
        });
    }
    if let Some(ch) = owner
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '@' | '-')))
    {
        return Err(ValidationError::DisallowedCharacter {
            field: "owner".into(),
            ch,
        });
    }
    Ok(owner.to_string())
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_control_characters_but_keeps_whitespace() {
        let clean = sanitize_text("title", "a\u{0}b\u{7}c\td\ne\rf").unwrap();
        assert_eq!(clean, "abc\td\ne\rf");
    }

    #[test]
    fn rich_fields_are_escaped() {
        let clean = sanitize_text("description", "<script>alert('x')</script> & more").unwrap();
        assert_eq!(
            clean,
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt; &amp; more"
        );
    }

    #[test]
    fn plain_fields_are_not_escaped() {
        assert_eq!(sanitize_text("title", "R&D <core>").unwrap(), "R&D <core>");
    }

    #[test]
    fn normalizes_to_nfc() {
        let decomposed = "Cafe\u{301}";
        assert_eq!(sanitize_text("title", decomposed).unwrap(), "Caf\u{e9}");
    }

    #[test]
    fn over_length_is_an_error_not_truncation() {
        let long = "x".repeat(201);
        let err = sanitize_text("title", &long).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "title".into(),
                max: 200,
                actual: 201
            }
        );
    }

    #[test]
    fn required_rejects_blank() {
        assert!(matches!(
            sanitize_required("title", "  \u{1}  "),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn tags_are_case_folded_and_deduplicated() {
        let tags = sanitize_tags(&["Infra", "infra", "db_ops", "Q3-2025"]).unwrap();
        assert_eq!(tags, vec!["infra", "db_ops", "q3-2025"]);
    }

    #[test]
    fn tags_reject_disallowed_characters() {
        let err = sanitize_tags(&["ok", "no space"]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DisallowedCharacter { ch: ' ', .. }
        ));
        assert_eq!(err.field(), Some("tags"));
    }

    #[test]
    fn tags_reject_too_many() {
        let many: Vec<String> = (0..=MAX_TAGS).map(|i| format!("t{i}")).collect();
        assert!(matches!(
            sanitize_tags(&many),
            Err(ValidationError::TooMany { .. })
        ));
    }

    #[test]
    fn owner_allow_list() {
        assert_eq!(sanitize_owner(" jane.doe@corp ").unwrap(), "jane.doe@corp");
        assert!(matches!(
            sanitize_owner("jane;rm"),
            Err(ValidationError::DisallowedCharacter { ch: ';', .. })
        ));
        assert!(sanitize_owner("").is_err());
    }
}
