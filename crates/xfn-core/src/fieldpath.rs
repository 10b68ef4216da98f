//! Field paths over schema-free resource bodies
//!
//! Resource bodies are arbitrary structured documents at this layer, so path
//! resolution is a small recursive-descent accessor over a generic JSON tree
//! rather than reflection over concrete types.
//!
//! Grammar: dot-separated object fields with optional bracket segments —
//! `metadata.name`, `spec.items[0].host`, `metadata.annotations["a.b/c"]`.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object field access
    Field(String),

    /// Array index access
    Index(usize),
}

/// Parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The original path text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve the path against a document root
    ///
    /// Returns `None` when any step is missing or the document shape does
    /// not match the segment kind (field access on a non-object, index on a
    /// non-array, index out of bounds).
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Field(name) => current.as_object()?.get(name)?,
                Segment::Index(idx) => current.as_array()?.get(*idx)?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = parse_segments(s)?;
        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }
}

/// Field path parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field path {path:?}: {detail}")]
pub struct PathError {
    /// The offending path text
    pub path: String,

    /// What went wrong
    pub detail: String,
}

impl PathError {
    fn new(path: &str, detail: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}

fn parse_segments(path: &str) -> Result<Vec<Segment>, PathError> {
    if path.is_empty() {
        return Err(PathError::new(path, "path is empty"));
    }

    let mut segments = Vec::new();
    let mut chars = path.char_indices().peekable();
    let mut expect_segment = true;

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            '.' => {
                if expect_segment {
                    return Err(PathError::new(path, format!("empty segment at {pos}")));
                }
                chars.next();
                expect_segment = true;
            }
            '[' => {
                if expect_segment && !segments.is_empty() {
                    return Err(PathError::new(path, format!("empty segment at {pos}")));
                }
                chars.next();
                segments.push(parse_bracket(path, &mut chars)?);
                expect_segment = false;
            }
            _ => {
                if !expect_segment {
                    return Err(PathError::new(
                        path,
                        format!("expected '.' or '[' at {pos}"),
                    ));
                }
                let mut field = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c == '.' || c == '[' {
                        break;
                    }
                    field.push(c);
                    chars.next();
                }
                segments.push(Segment::Field(field));
                expect_segment = false;
            }
        }
    }

    if expect_segment {
        return Err(PathError::new(path, "trailing '.'"));
    }
    Ok(segments)
}

fn parse_bracket(
    path: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<Segment, PathError> {
    match chars.peek() {
        Some(&(_, '"')) => {
            chars.next();
            let mut field = String::new();
            loop {
                match chars.next() {
                    Some((_, '"')) => break,
                    Some((_, c)) => field.push(c),
                    None => return Err(PathError::new(path, "unterminated quoted segment")),
                }
            }
            match chars.next() {
                Some((_, ']')) => Ok(Segment::Field(field)),
                _ => Err(PathError::new(path, "expected ']' after quoted segment")),
            }
        }
        Some(_) => {
            let mut digits = String::new();
            loop {
                match chars.next() {
                    Some((_, ']')) => break,
                    Some((_, c)) => digits.push(c),
                    None => return Err(PathError::new(path, "unterminated index segment")),
                }
            }
            let index = digits
                .parse::<usize>()
                .map_err(|_| PathError::new(path, format!("invalid index {digits:?}")))?;
            Ok(Segment::Index(index))
        }
        None => Err(PathError::new(path, "unterminated index segment")),
    }
}

/// Render a scalar value to its textual representation
///
/// Strings render without quotes, numbers and booleans via their canonical
/// display form. Returns `None` for nulls, arrays, and objects — those have
/// no textual secret form.
#[must_use]
pub fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn parses_dotted_fields() {
        assert_eq!(
            path("metadata.name").segments(),
            &[
                Segment::Field("metadata".to_string()),
                Segment::Field("name".to_string())
            ]
        );
    }

    #[test]
    fn parses_indexes_and_quoted_fields() {
        assert_eq!(
            path("spec.items[0][\"a.b/c\"]").segments(),
            &[
                Segment::Field("spec".to_string()),
                Segment::Field("items".to_string()),
                Segment::Index(0),
                Segment::Field("a.b/c".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", ".", "a..b", "a.", "a[", "a[x]", "a[\"x"] {
            assert!(bad.parse::<FieldPath>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn resolves_nested_values() {
        let doc = json!({
            "metadata": {"name": "test", "generation": 4},
            "spec": {"items": [{"host": "a"}, {"host": "b"}]}
        });
        assert_eq!(path("metadata.generation").resolve(&doc), Some(&json!(4)));
        assert_eq!(
            path("spec.items[1].host").resolve(&doc),
            Some(&json!("b"))
        );
        assert_eq!(path("metadata.missing").resolve(&doc), None);
        assert_eq!(path("spec.items[9]").resolve(&doc), None);
        assert_eq!(path("metadata.name.deeper").resolve(&doc), None);
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(render_scalar(&json!("test")), Some("test".to_string()));
        assert_eq!(render_scalar(&json!(4)), Some("4".to_string()));
        assert_eq!(render_scalar(&json!(true)), Some("true".to_string()));
        assert_eq!(render_scalar(&json!(null)), None);
        assert_eq!(render_scalar(&json!({"a": 1})), None);
    }
}
