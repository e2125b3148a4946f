//! Validation and cleanup of observed strings

use regex::Regex;
use std::sync::OnceLock;

use crate::types::*;

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

/// Trim and collapse inner whitespace runs; blank input becomes `None`
pub fn sanitize(raw: &str) -> Option<String> {
    let cleaned = ws_re().replace_all(raw.trim(), " ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.into_owned())
    }
}

/// Build an identifier from raw export cells
pub fn observed_identifier(number: &str, name: &str) -> Identifier {
    Identifier::new(sanitize(number), sanitize(name))
}

/// Sanitize both components of an identifier
pub fn sanitize_identifier(identifier: &Identifier) -> Identifier {
    Identifier::new(
        identifier.number().and_then(sanitize),
        identifier.name().and_then(sanitize),
    )
}

/// Validate that an identifier can be used as evidence
pub fn validate_identifier(identifier: &Identifier) -> ResolveResult<()> {
    if identifier.is_empty() {
        return Err(ResolveError::Validation(
            "Identifier must have a number or a name".to_string(),
        ));
    }

    for part in [identifier.number(), identifier.name()].into_iter().flatten() {
        if part.trim().is_empty() {
            return Err(ResolveError::Validation(format!(
                "Identifier {} has a blank component",
                identifier
            )));
        }
    }

    Ok(())
}
