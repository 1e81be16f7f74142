//! Internal helpers for input normalization and model conversion.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Folds free text into a lookup key: accents and emoji are dropped, letters
/// are lowercased and runs of whitespace become a single `_`.
///
/// `"🍽️ Comida"` and `"comida"` fold to the same key, as do `"Educación"` and
/// `"educacion"`.
pub(crate) fn fold_key(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;
    for ch in input.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_sep = true;
        }
    }
    out
}

/// Trim optional free text, mapping blanks to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_emoji_and_case() {
        assert_eq!(fold_key("🍽️ Comida"), "comida");
        assert_eq!(fold_key("Educación"), "educacion");
        assert_eq!(fold_key("  No   especificado "), "no_especificado");
        assert_eq!(fold_key("otros_gasto"), "otros_gasto");
        assert_eq!(fold_key("🔄 Transfer."), "transfer");
    }

    #[test]
    fn optional_text_blank_is_none() {
        assert_eq!(normalize_optional_text(Some("   ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" almuerzo ")),
            Some("almuerzo".to_string())
        );
    }
}
