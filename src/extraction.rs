//! Path-query extraction over nested records.
//!
//! Queries use a JSONPath-like syntax and are parsed once into a [`FieldPath`].
//! Evaluating a path never fails: a path that does not exist in the record
//! simply selects nothing.

use std::fmt;

use serde_json::Value;

use crate::error::ConfigError;

/// A parsed path query
///
/// # Examples
///
/// - `$.name` or `name` - top level field
/// - `$.people[0].name` - array index (negative indices count from the end)
/// - `$['first name']` - bracketed field with any characters
/// - `$.people[*].name`, `$.tags[1:3]` - wildcard and slice
/// - `$..name` - every `name` field at any depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// The raw path string
    pub raw: String,
    /// Parsed path segments
    pub segments: Vec<PathSegment>,
}

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named field (e.g., "user", "name")
    Field(String),
    /// An array index (e.g., [0], [-1])
    Index(i64),
    /// An array slice (e.g., [1:3], [:2], [-2:])
    Slice { start: Option<i64>, end: Option<i64> },
    /// All children of an object or array
    Wildcard,
    /// The current node and all of its descendants (`..`)
    Descendants,
}

impl FieldPath {
    /// Parse a query string
    ///
    /// # Example
    ///
    /// ```ignore
    /// use fieldchain::FieldPath;
    ///
    /// let path = FieldPath::parse("$.user.address[0].city")?;
    /// assert_eq!(path.segments.len(), 4);
    /// ```
    pub fn parse(path: &str) -> Result<Self, ConfigError> {
        let raw = path.trim();
        let chars: Vec<char> = raw.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        let invalid = |reason: String| ConfigError::InvalidQuery {
            query: raw.to_string(),
            reason,
        };

        if chars.is_empty() {
            return Err(invalid("empty query".to_string()));
        }

        if chars[0] == '$' {
            i = 1;
        } else if chars[0] != '.' && chars[0] != '[' {
            // Bare leading member, e.g. `name.first`
            let (segment, next) = parse_member(&chars, 0).map_err(invalid)?;
            segments.push(segment);
            i = next;
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    if chars.get(i + 1) == Some(&'.') {
                        segments.push(PathSegment::Descendants);
                        i += 2;
                        if chars.get(i) == Some(&'[') {
                            continue;
                        }
                    } else {
                        i += 1;
                    }
                    let (segment, next) = parse_member(&chars, i).map_err(invalid)?;
                    segments.push(segment);
                    i = next;
                }
                '[' => {
                    let (segment, next) = parse_bracket(&chars, i).map_err(invalid)?;
                    segments.push(segment);
                    i = next;
                }
                c => return Err(invalid(format!("unexpected character '{}' at {}", c, i))),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Select all nodes matched by this path, in document order
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];

        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                segment.apply(node, &mut next);
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }

        current
    }
}

impl PathSegment {
    fn apply<'a>(&self, node: &'a Value, out: &mut Vec<&'a Value>) {
        match self {
            PathSegment::Field(name) => {
                if let Some(child) = node.as_object().and_then(|map| map.get(name)) {
                    out.push(child);
                }
            }
            PathSegment::Index(index) => {
                if let Some(items) = node.as_array() {
                    if let Some(pos) = normalize_index(*index, items.len()) {
                        out.push(&items[pos]);
                    }
                }
            }
            PathSegment::Slice { start, end } => {
                if let Some(items) = node.as_array() {
                    let len = items.len();
                    let from = start.map_or(0, |s| clamp_index(s, len));
                    let to = end.map_or(len, |e| clamp_index(e, len));
                    if from < to {
                        out.extend(items[from..to].iter());
                    }
                }
            }
            PathSegment::Wildcard => match node {
                Value::Object(map) => out.extend(map.values()),
                Value::Array(items) => out.extend(items.iter()),
                _ => {}
            },
            PathSegment::Descendants => collect_descendants(node, out),
        }
    }
}

fn collect_descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    match node {
        Value::Object(map) => map.values().for_each(|child| collect_descendants(child, out)),
        Value::Array(items) => items.iter().for_each(|child| collect_descendants(child, out)),
        _ => {}
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let pos = if index < 0 { len + index } else { index };
    (0..len).contains(&pos).then_some(pos as usize)
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len = len as i64;
    let pos = if index < 0 { len + index } else { index };
    pos.clamp(0, len) as usize
}

fn parse_member(chars: &[char], start: usize) -> Result<(PathSegment, usize), String> {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }

    let name: String = chars[start..end].iter().collect();
    match name.as_str() {
        "" => Err(format!("empty field name at {}", start)),
        "*" => Ok((PathSegment::Wildcard, end)),
        _ => Ok((PathSegment::Field(name), end)),
    }
}

fn parse_bracket(chars: &[char], open: usize) -> Result<(PathSegment, usize), String> {
    let mut i = open + 1;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }

    // Quoted field name
    if let Some(&quote) = chars.get(i).filter(|c| **c == '\'' || **c == '"') {
        let mut name = String::new();
        i += 1;
        loop {
            match chars.get(i) {
                None => return Err("unterminated quoted name".to_string()),
                Some('\\') => {
                    if let Some(escaped) = chars.get(i + 1) {
                        name.push(*escaped);
                    }
                    i += 2;
                }
                Some(c) if *c == quote => {
                    i += 1;
                    break;
                }
                Some(c) => {
                    name.push(*c);
                    i += 1;
                }
            }
        }
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        return match chars.get(i) {
            Some(']') => Ok((PathSegment::Field(name), i + 1)),
            _ => Err(format!("expected ']' at {}", i)),
        };
    }

    let close = chars[i..]
        .iter()
        .position(|c| *c == ']')
        .map(|pos| i + pos)
        .ok_or_else(|| format!("unclosed '[' at {}", open))?;
    let body: String = chars[i..close].iter().collect();
    let body = body.trim();

    let segment = if body == "*" {
        PathSegment::Wildcard
    } else if let Some((start, end)) = body.split_once(':') {
        PathSegment::Slice {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        }
    } else {
        let index = body
            .parse::<i64>()
            .map_err(|_| format!("invalid index '{}'", body))?;
        PathSegment::Index(index)
    };

    Ok((segment, close + 1))
}

fn parse_bound(bound: &str) -> Result<Option<i64>, String> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Ok(None);
    }
    bound
        .parse::<i64>()
        .map(Some)
        .map_err(|_| format!("invalid slice bound '{}'", bound))
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Trait for record types that can be queried by field path
///
/// Results are coerced to a flat ordered list of strings: array results are
/// flattened one level, nulls are dropped, and a scalar becomes a single value.
pub trait Extractor {
    /// Extract all values matched by the given path
    fn extract(&self, path: &FieldPath) -> Vec<String>;

    /// Extract the first matched value, if any
    fn extract_first(&self, path: &FieldPath) -> Option<String> {
        self.extract(path).into_iter().next()
    }
}

impl Extractor for Value {
    fn extract(&self, path: &FieldPath) -> Vec<String> {
        let mut values = Vec::new();
        for node in path.select(self) {
            match node {
                Value::Array(items) => values.extend(items.iter().filter_map(value_to_string)),
                other => values.extend(value_to_string(other)),
            }
        }
        values
    }
}

/// Render a JSON value the way it appears in a value list
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
