/// Deterministic YAML writer for configuration documents
///
/// libscope and the session snapshots compare config files byte for byte,
/// so the layout here is fixed: two-space indentation, block sequences
/// under a mapping key are not indented, empty strings are written `""`
/// and strings that cannot stand as plain scalars are single-quoted.
/// Mapping keys keep the order of the source value.
use crate::config::types::{Result, ScopeError};
use serde_json::{Map, Value};
use std::fmt::Write;

const INDENT: usize = 2;

/// Render a top-level mapping as YAML
pub fn to_string(value: &Value) -> Result<String> {
    let map = value.as_object().ok_or_else(|| {
        ScopeError::Config("configuration document must be a mapping".to_string())
    })?;
    let mut out = String::new();
    write_mapping(&mut out, map, 0);
    Ok(out)
}

fn write_mapping(out: &mut String, map: &Map<String, Value>, indent: usize) {
    for (key, value) in map {
        let pad = " ".repeat(indent);
        let key = scalar_string(key);
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                let _ = writeln!(out, "{pad}{key}:");
                write_mapping(out, inner, indent + INDENT);
            }
            Value::Array(items) if !items.is_empty() => {
                let _ = writeln!(out, "{pad}{key}:");
                write_sequence(out, items, indent);
            }
            scalar => {
                let _ = writeln!(out, "{pad}{key}: {}", scalar_value(scalar));
            }
        }
    }
}

fn write_sequence(out: &mut String, items: &[Value], indent: usize) {
    let pad = " ".repeat(indent);
    for item in items {
        match item {
            Value::Object(inner) if !inner.is_empty() => {
                // Render the mapping one level in, then swap the leading
                // indentation of its first line for the "- " marker.
                let mut nested = String::new();
                write_mapping(&mut nested, inner, indent + INDENT);
                out.push_str(&pad);
                out.push_str("- ");
                out.push_str(&nested[indent + INDENT..]);
            }
            Value::Array(inner) if !inner.is_empty() => {
                let mut nested = String::new();
                write_sequence(&mut nested, inner, indent + INDENT);
                out.push_str(&pad);
                out.push_str("- ");
                out.push_str(&nested[indent + INDENT..]);
            }
            scalar => {
                let _ = writeln!(out, "{pad}- {}", scalar_value(scalar));
            }
        }
    }
}

fn scalar_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => scalar_string(s),
        Value::Array(_) => "[]".to_string(),
        Value::Object(_) => "{}".to_string(),
    }
}

fn scalar_string(s: &str) -> String {
    if s.is_empty() {
        return "\"\"".to_string();
    }
    if s.chars().any(|c| c.is_control()) {
        // Double quotes are the only YAML style that can escape these.
        return serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s));
    }
    if needs_quotes(s) {
        return format!("'{}'", s.replace('\'', "''"));
    }
    s.to_string()
}

/// True when `s` written plain would not read back as the same string
fn needs_quotes(s: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
        '@', '`',
    ];
    const RESERVED: &[&str] = &[
        "~", "null", "true", "false", "yes", "no", "on", "off", "y", "n",
    ];

    let first = s.chars().next().unwrap_or(' ');
    INDICATORS.contains(&first)
        || s.starts_with(' ')
        || s.ends_with(' ')
        || s.ends_with(':')
        || s.contains(": ")
        || s.contains(" #")
        || RESERVED.iter().any(|r| s.eq_ignore_ascii_case(r))
        || looks_numeric(s)
}

fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    s.parse::<f64>().is_ok()
        || body.starts_with("0x")
        || body.starts_with("0o")
        || matches!(body.to_ascii_lowercase().as_str(), ".inf" | ".nan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_mapping_layout() {
        let doc = json!({"a": {"b": 1, "c": {"d": true}}, "e": "x"});
        assert_eq!(to_string(&doc).unwrap(), "a:\n  b: 1\n  c:\n    d: true\ne: x\n");
    }

    #[test]
    fn test_sequence_of_mappings_is_not_indented() {
        let doc = json!({"root": {"watch": [{"type": "file", "value": ".*"}, {"type": "dns"}]}});
        assert_eq!(
            to_string(&doc).unwrap(),
            "root:\n  watch:\n  - type: file\n    value: .*\n  - type: dns\n"
        );
    }

    #[test]
    fn test_scalar_sequence() {
        let doc = json!({"list": [1, "two", false]});
        assert_eq!(to_string(&doc).unwrap(), "list:\n- 1\n- two\n- false\n");
    }

    #[test]
    fn test_key_order_is_preserved() {
        let doc = json!({"zeta": 1, "alpha": 2, "mid": 3});
        assert_eq!(to_string(&doc).unwrap(), "zeta: 1\nalpha: 2\nmid: 3\n");
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(scalar_string(""), "\"\"");
        assert_eq!(scalar_string(".*"), ".*");
        assert_eq!(scalar_string("(stdout|stderr)"), "(stdout|stderr)");
        assert_eq!(scalar_string("/tmp/x/metrics.json"), "/tmp/x/metrics.json");
        assert_eq!(
            scalar_string(r"[\s\/\\\.]log[s]?[\/\\\.]?"),
            r"'[\s\/\\\.]log[s]?[\/\\\.]?'"
        );
        assert_eq!(scalar_string("true"), "'true'");
        assert_eq!(scalar_string("10"), "'10'");
        assert_eq!(scalar_string("it's: here"), "'it''s: here'");
        assert_eq!(scalar_string("a\nb"), "\"a\\nb\"");
    }

    #[test]
    fn test_empty_collections() {
        let doc = json!({"m": {}, "s": []});
        assert_eq!(to_string(&doc).unwrap(), "m: {}\ns: []\n");
    }

    #[test]
    fn test_non_mapping_root_is_rejected() {
        assert!(to_string(&json!([1, 2])).is_err());
    }
}
