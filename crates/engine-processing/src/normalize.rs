use model::cast::ForcedCast;
use model::value::AttributeValue;
use std::collections::HashMap;
use tracing::warn;

/// Converts a raw cell into a typed value, honoring an optional forced cast.
/// Returns `None` for whitespace-only cells, which carry no update.
pub fn normalize(raw: &str, forced: Option<ForcedCast>) -> Option<AttributeValue> {
    if raw.trim().is_empty() {
        return None;
    }
    if forced == Some(ForcedCast::String) {
        return Some(AttributeValue::String(raw.to_string()));
    }

    let value = normalize_unforced(raw);
    match forced {
        None => Some(value),
        Some(cast) => Some(apply_cast(value, cast, raw)),
    }
}

fn normalize_unforced(raw: &str) -> AttributeValue {
    let stripped = raw.trim().to_lowercase();

    if stripped == "null" {
        return AttributeValue::Null;
    }
    if !is_leading_zero_numeric(&stripped) {
        if let Ok(n) = stripped.parse::<i64>() {
            return AttributeValue::Int(n);
        }
        if let Ok(f) = stripped.parse::<f64>() {
            return AttributeValue::Float(f);
        }
    }
    if stripped == "true" {
        return AttributeValue::Boolean(true);
    }
    if stripped == "false" {
        return AttributeValue::Boolean(false);
    }
    if stripped.len() > 1 && stripped.starts_with('[') && stripped.ends_with(']') {
        // parse from the trimmed original so quoted items keep their case
        if let Some(items) = parse_array_literal(raw.trim()) {
            return AttributeValue::Array(items);
        }
        return AttributeValue::String(raw.to_string());
    }

    AttributeValue::String(raw.to_string())
}

/// True for strings like `"0123"` where an integer parse would lose the
/// leading zeros. A run of zeros is the value zero, not a formatted code,
/// and `"0.5"`-style fractions are not affected.
fn is_leading_zero_numeric(stripped: &str) -> bool {
    stripped.len() > 1
        && stripped.starts_with('0')
        && !stripped.starts_with("0.")
        && stripped.chars().any(|c| c != '0')
}

fn apply_cast(value: AttributeValue, cast: ForcedCast, raw: &str) -> AttributeValue {
    // a null stays null under every cast
    if value.is_null() {
        return value;
    }

    let coerced = match cast {
        ForcedCast::String => return AttributeValue::String(raw.to_string()),
        ForcedCast::Integer => value.as_i64().map(AttributeValue::Int),
        ForcedCast::Float => value.as_f64().map(AttributeValue::Float),
        ForcedCast::Boolean => value.as_bool().map(AttributeValue::Boolean),
    };

    match coerced {
        Some(cast_value) => cast_value,
        None => {
            warn!(
                raw,
                cast = cast.name(),
                "Forced cast could not be applied; keeping the inferred value"
            );
            value
        }
    }
}

fn parse_array_literal(trimmed: &str) -> Option<Vec<AttributeValue>> {
    let inner = &trimmed[1..trimmed.len() - 1];
    let mut items = Vec::new();
    let mut rest = inner.trim_start();
    if rest.is_empty() {
        return Some(items);
    }

    loop {
        let (item, tail) = parse_array_item(rest)?;
        items.push(item);
        rest = tail.trim_start();
        if rest.is_empty() {
            return Some(items);
        }
        rest = rest.strip_prefix(',')?.trim_start();
        if rest.is_empty() {
            // trailing comma
            return None;
        }
    }
}

fn parse_array_item(s: &str) -> Option<(AttributeValue, &str)> {
    let first = s.chars().next()?;
    if first == '\'' || first == '"' {
        let end = s[1..].find(first)? + 1;
        return Some((AttributeValue::String(s[1..end].to_string()), &s[end + 1..]));
    }

    let end = s.find(',').unwrap_or(s.len());
    let token = s[..end].trim();
    scalar_from_token(token).map(|value| (value, &s[end..]))
}

fn scalar_from_token(token: &str) -> Option<AttributeValue> {
    if token.is_empty() {
        return None;
    }
    let lowered = token.to_lowercase();
    if lowered == "null" {
        return Some(AttributeValue::Null);
    }
    if lowered == "true" {
        return Some(AttributeValue::Boolean(true));
    }
    if lowered == "false" {
        return Some(AttributeValue::Boolean(false));
    }
    if let Ok(n) = token.parse::<i64>() {
        return Some(AttributeValue::Int(n));
    }
    if let Ok(f) = token.parse::<f64>() {
        return Some(AttributeValue::Float(f));
    }
    None
}

/// Per-column forced casts parsed from the trigger's `typeCastSpec` string
/// (`column=type` pairs, comma-separated). Invalid entries are ignored with
/// a warning, never fatal.
#[derive(Debug, Clone, Default)]
pub struct CastSpec {
    casts: HashMap<String, ForcedCast>,
}

impl CastSpec {
    pub fn parse(spec: &str) -> Self {
        let mut casts = HashMap::new();
        for pair in spec.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((column, type_name)) = pair.split_once('=') else {
                warn!(pair, "Malformed cast entry, expected 'column=type'; entry ignored");
                continue;
            };
            match ForcedCast::from_name(type_name.trim()) {
                Some(cast) => {
                    casts.insert(column.trim().to_string(), cast);
                }
                None => warn!(
                    column,
                    type_name, "Cast type not in supported types; type will not be applied"
                ),
            }
        }
        CastSpec { casts }
    }

    pub fn get(&self, column: &str) -> Option<ForcedCast> {
        self.casts.get(column).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }

    /// Warns about cast columns missing from the header row; the cast is
    /// simply never applied.
    pub fn warn_missing_columns(&self, headers: &[String]) {
        for column in self.casts.keys() {
            if !headers.contains(column) {
                warn!(column, "Cast column not found; cast will not be applied");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttributeValue::*;

    fn plain(raw: &str) -> AttributeValue {
        normalize(raw, None).expect("non-empty cell")
    }

    #[test]
    fn whitespace_only_cells_are_omitted() {
        assert_eq!(normalize("", None), None);
        assert_eq!(normalize("   ", None), None);
        assert_eq!(normalize("\t", Some(ForcedCast::String)), None);
    }

    #[test]
    fn null_is_case_insensitive() {
        assert_eq!(plain("null"), Null);
        assert_eq!(plain("NULL"), Null);
        assert_eq!(plain(" Null "), Null);
    }

    #[test]
    fn numbers_parse_as_int_then_float() {
        assert_eq!(plain("42"), Int(42));
        assert_eq!(plain("-17"), Int(-17));
        assert_eq!(plain("+5"), Int(5));
        assert_eq!(plain("4.23"), Float(4.23));
        assert_eq!(plain("0.5"), Float(0.5));
        assert_eq!(plain("1e3"), Float(1000.0));
    }

    #[test]
    fn leading_zeros_are_preserved_as_strings() {
        assert_eq!(plain("0123"), String("0123".into()));
        assert_eq!(plain("0700"), String("0700".into()));
    }

    #[test]
    fn zero_runs_are_genuine_integers() {
        assert_eq!(plain("0"), Int(0));
        assert_eq!(plain("00"), Int(0));
    }

    #[test]
    fn booleans_are_case_insensitive() {
        assert_eq!(plain("true"), Boolean(true));
        assert_eq!(plain("False"), Boolean(false));
    }

    #[test]
    fn free_text_round_trips_unchanged() {
        for raw in ["hello", "555-867-5309", "2021-01-01", "#tag", "a b c"] {
            assert_eq!(plain(raw), String(raw.into()));
            assert_eq!(plain(raw).to_string(), raw);
        }
    }

    #[test]
    fn bracketed_literals_become_arrays() {
        assert_eq!(plain("[1, 2, 3]"), Array(vec![Int(1), Int(2), Int(3)]));
        assert_eq!(
            plain("['a', \"B\", true, null, 2.5]"),
            Array(vec![
                String("a".into()),
                String("B".into()),
                Boolean(true),
                Null,
                Float(2.5),
            ])
        );
        assert_eq!(plain("[]"), Array(vec![]));
    }

    #[test]
    fn unbalanced_or_malformed_brackets_fall_back_to_strings() {
        assert_eq!(plain("[1, 2"), String("[1, 2".into()));
        assert_eq!(plain("1, 2]"), String("1, 2]".into()));
        assert_eq!(plain("[1,,2]"), String("[1,,2]".into()));
        assert_eq!(plain("[1, 2,]"), String("[1, 2,]".into()));
    }

    #[test]
    fn forced_string_returns_the_raw_cell_untouched() {
        assert_eq!(
            normalize("0123", Some(ForcedCast::String)),
            Some(String("0123".into()))
        );
        assert_eq!(
            normalize(" 42 ", Some(ForcedCast::String)),
            Some(String(" 42 ".into()))
        );
    }

    #[test]
    fn forced_casts_resolve_then_coerce() {
        assert_eq!(normalize("4.23", Some(ForcedCast::Integer)), Some(Int(4)));
        assert_eq!(
            normalize("1", Some(ForcedCast::Boolean)),
            Some(Boolean(true))
        );
        assert_eq!(normalize("42", Some(ForcedCast::Float)), Some(Float(42.0)));
        assert_eq!(
            normalize("false", Some(ForcedCast::Integer)),
            Some(Int(0))
        );
    }

    #[test]
    fn impossible_coercions_keep_the_inferred_value() {
        assert_eq!(
            normalize("free text", Some(ForcedCast::Integer)),
            Some(String("free text".into()))
        );
        assert_eq!(normalize("null", Some(ForcedCast::Boolean)), Some(Null));
    }

    #[test]
    fn cast_spec_ignores_invalid_entries() {
        let spec = CastSpec::parse("age=integer, score=float, when=datetime, broken");
        assert_eq!(spec.get("age"), Some(ForcedCast::Integer));
        assert_eq!(spec.get("score"), Some(ForcedCast::Float));
        assert_eq!(spec.get("when"), None);
        assert_eq!(spec.get("broken"), None);
    }

    #[test]
    fn empty_cast_spec_is_empty() {
        assert!(CastSpec::parse("").is_empty());
        assert!(CastSpec::default().is_empty());
    }
}
