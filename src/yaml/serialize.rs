//! Document parsing and serialization.
//!
//! The configuration tree only depends on the generic nested [`Value`]
//! model; a [`DocumentBackend`] turns text into that model and back.

use super::error::Error;
use fyaml::{Number, Value};
use regex::Regex;

/// Parses documents into the generic value model and emits them back.
pub trait DocumentBackend {
    fn parse(&self, text: &str) -> Result<Value, Error>;
    fn emit(&self, value: &Value) -> Result<String, Error>;
}

/// YAML backend on libfyaml, for both parsing and emitting.
///
/// libfyaml always emits with a two-column indent. Other widths are
/// obtained by re-indenting its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FyamlBackend {
    indent: usize,
}

/// Indent width of libfyaml's block output.
const EMITTER_INDENT: usize = 2;

impl Default for FyamlBackend {
    fn default() -> Self {
        Self {
            indent: EMITTER_INDENT,
        }
    }
}

impl FyamlBackend {
    /// Widths below two are raised to two: a sequence entry needs the
    /// dash and one space.
    pub fn new(indent: usize) -> Self {
        Self {
            indent: indent.max(EMITTER_INDENT),
        }
    }

    pub fn indent(&self) -> usize {
        self.indent
    }
}

impl DocumentBackend for FyamlBackend {
    fn parse(&self, text: &str) -> Result<Value, Error> {
        parse_document(text)
    }

    fn emit(&self, value: &Value) -> Result<String, Error> {
        let mut text = value
            .to_yaml_string()
            .map_err(|e| Error::Parse(format!("Failed to serialize YAML: {}", e)))?;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        if self.indent == EMITTER_INDENT {
            return Ok(text);
        }
        reindent(&text, self.indent)
    }
}

/// Parse a YAML document. Blank input is an empty (null) document.
pub fn parse_document(text: &str) -> Result<Value, Error> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    text.parse()
        .map_err(|e| Error::Parse(format!("Failed to parse YAML: {}", e)))
}

// =============================================================================
// Re-indentation
// =============================================================================

/// Rewrite two-column block output to `indent` columns per level.
///
/// Every two columns of leading space, and every `- ` entry marker, become
/// `indent` columns. Block scalar content is moved along with its header
/// line so its own indentation is kept.
fn reindent(text: &str, indent: usize) -> Result<String, Error> {
    let header = Regex::new(r"(^|\s)[|>][-+0-9]*$").map_err(|e| Error::Base(e.to_string()))?;
    let marker = format!("-{}", " ".repeat(indent - 1));

    let mut out = String::with_capacity(text.len() * 2);
    // Leading columns of the current block scalar header, and the shift
    // applied to that header.
    let mut block: Option<(usize, usize)> = None;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(&['\n', '\r'][..]);
        let body = content.trim_start_matches(' ');
        let lead = content.len() - body.len();

        if let Some((header_lead, shift)) = block {
            if body.is_empty() {
                out.push_str(line);
                continue;
            }
            if lead > header_lead {
                out.push_str(&" ".repeat(shift));
                out.push_str(line);
                continue;
            }
            block = None;
        }

        let scaled = lead / EMITTER_INDENT * indent + lead % EMITTER_INDENT;
        out.push_str(&" ".repeat(scaled));
        let mut rest = body;
        while let Some(after) = rest.strip_prefix("- ") {
            out.push_str(&marker);
            rest = after;
        }
        out.push_str(rest);
        out.push_str(&line[content.len()..]);

        if header.is_match(rest) {
            block = Some((lead, scaled - lead));
        }
    }
    Ok(out)
}

// =============================================================================
// Raw Rendering
// =============================================================================

/// Serialize a value to a raw string (unquoted scalars, YAML for
/// collections).
pub fn serialize_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n {
            Number::Int(i) => i.to_string(),
            Number::UInt(u) => u.to_string(),
            Number::Float(f) => {
                if f.is_nan() {
                    ".nan".to_string()
                } else if f.is_infinite() {
                    if f.is_sign_positive() {
                        ".inf".to_string()
                    } else {
                        "-.inf".to_string()
                    }
                } else {
                    f.to_string()
                }
            }
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Tagged(t) if !matches!(t.value, Value::Mapping(_) | Value::Sequence(_)) => {
            serialize_raw(&t.value)
        }
        _ => FyamlBackend::default().emit(value).unwrap_or_default(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn emit(value: &Value) -> String {
        FyamlBackend::default().emit(value).unwrap()
    }

    fn round_trip(backend: &FyamlBackend, text: &str) {
        let value = parse_document(text).unwrap();
        let emitted = backend.emit(&value).unwrap();
        assert_eq!(
            parse_document(&emitted).unwrap(),
            value,
            "emitted document:\n{}",
            emitted
        );
    }

    #[test]
    fn test_blank_document_is_null() {
        assert_eq!(parse_document("").unwrap(), Value::Null);
        assert_eq!(parse_document("  \n\n").unwrap(), Value::Null);
    }

    #[test]
    fn test_emit_block_mapping() {
        let value = parse_document("a: {b: 1, c: [x, y]}\nd: text\n").unwrap();
        let expected = indoc! {"
            a:
              b: 1
              c:
              - x
              - y
            d: text
        "};
        assert_eq!(emit(&value), expected);
    }

    #[test]
    fn test_indent_width_is_at_least_two() {
        assert_eq!(FyamlBackend::new(0).indent(), 2);
        assert_eq!(FyamlBackend::new(1).indent(), 2);
        assert_eq!(FyamlBackend::new(4).indent(), 4);
    }

    #[test]
    fn test_reindent_mappings_and_entries() {
        let text = indoc! {"
            a:
              b:
                c: 1
              l:
              - x: 1
                y: 2
              - - deep
        "};
        let expected = indoc! {"
            a:
                b:
                    c: 1
                l:
                -   x: 1
                    y: 2
                -   -   deep
        "};
        assert_eq!(reindent(text, 4).unwrap(), expected);
    }

    #[test]
    fn test_reindent_keeps_block_scalar_content() {
        let text = indoc! {"
            a:
              b: |
                line

                  indented
              c: 1
        "};
        let expected = indoc! {"
            a:
                b: |
                  line

                    indented
                c: 1
        "};
        let out = reindent(text, 4).unwrap();
        assert_eq!(out, expected);
        assert_eq!(parse_document(&out).unwrap(), parse_document(text).unwrap());
    }

    #[test]
    fn test_round_trip_documents() {
        let backend = FyamlBackend::default();
        round_trip(&backend, "a: 1\n");
        round_trip(&backend, "a:\n  b: [1, 2, {c: d}]\n  e: ~\n");
        round_trip(&backend, "- 1\n- - 2\n  - 3\n- {k: v, l: [true, false]}\n");
        round_trip(&backend, "text: \"needs: quoting\"\nempty: \"\"\n");
        round_trip(&backend, "nested:\n  - - - deep\n");
        round_trip(&backend, "f: 1.5\nneg: -3\n");
    }

    #[test]
    fn test_round_trip_complex_keys() {
        let backend = FyamlBackend::default();
        round_trip(&backend, "? [a, b]\n: v\n");
        round_trip(&backend, "1: a\ntrue: b\n2.5: c\n");
    }

    #[test]
    fn test_round_trip_with_wide_indent() {
        let backend = FyamlBackend::new(4);
        round_trip(&backend, "a:\n  - {k: 1, l: [x, {m: n}]}\n  - - deep\nb: {c: {d: e}}\n");
        round_trip(&backend, "text: \"multi\\nline\\n\"\nlist: [\"a\\nb\", c]\n");
    }

    #[test]
    fn test_serialize_raw() {
        assert_eq!(serialize_raw(&Value::String("s".into())), "s");
        assert_eq!(serialize_raw(&Value::Null), "");
        assert_eq!(serialize_raw(&Value::Bool(true)), "true");
        assert_eq!(serialize_raw(&Value::Number(Number::Int(-2))), "-2");
        assert_eq!(serialize_raw(&Value::Number(Number::Float(f64::INFINITY))), ".inf");
        let seq = Value::Sequence(vec![Value::String("a".into())]);
        assert_eq!(serialize_raw(&seq), "- a\n");
    }
}
