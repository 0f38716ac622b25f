//! Column-to-field mapping grammar
//!
//! Mappings are written as `key=path` entries separated by commas or
//! whitespace:
//!
//! ```text
//! column1=name, column2=category.title column3=tags.0.name
//! Name=name Category=category.title
//! ```
//!
//! The key is the column reference as typed: a 1-based column number
//! (with an optional `column` prefix) or a header name. Which of the two it
//! is depends on the run mode, not on the parser. Paths are split on `.`
//! and validated later against the schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ENTRY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\s,=]+)=([^\s,=]+)").expect("mapping entry pattern is valid"));

/// Prefix allowed in front of positional column numbers
const COLUMN_PREFIX: &str = "column";

/// A dotted path from the root model to a target field
///
/// Examples:
/// - "name" -> field on the root model
/// - "category.title" -> foreign key hop, then a field on the related model
/// - "tags.0.name" -> many-to-many hop into group 0, then a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Split a path on `.` without further validation
    pub fn parse(path: &str) -> Self {
        FieldPath {
            segments: path.split('.').map(|s| s.to_string()).collect(),
        }
    }

    /// Create a single-field path
    pub fn simple(field: impl Into<String>) -> Self {
        FieldPath {
            segments: vec![field.into()],
        }
    }

    /// Get all segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// One parsed `key=path` mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub path: FieldPath,
    /// Column number or header name, resolved at run time
    pub column: String,
}

impl MappingEntry {
    /// Create a mapping entry
    pub fn new(column: impl Into<String>, path: FieldPath) -> Self {
        MappingEntry {
            path,
            column: column.into(),
        }
    }
}

impl std::fmt::Display for MappingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.column.is_empty() && self.column.chars().all(|c| c.is_ascii_digit()) {
            write!(f, "{}{}={}", COLUMN_PREFIX, self.column, self.path)
        } else {
            write!(f, "{}={}", self.column, self.path)
        }
    }
}

/// A constant applied to a path before the row's own cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultEntry {
    pub path: FieldPath,
    /// Raw value, cleaned like a cell
    pub value: String,
}

/// Error parsing mapping text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Text is non-empty but contains no `key=path` entries
    Malformed { text: String },
}

impl std::fmt::Display for MappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingError::Malformed { text } => {
                write!(f, "no usable mapping in '{}' (expected key=path entries)", text)
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// Strip a `column` prefix in front of a column number
fn strip_column_prefix(key: &str) -> &str {
    match key.strip_prefix(COLUMN_PREFIX) {
        Some(number) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => number,
        _ => key,
    }
}

/// Find all `lhs=rhs` pairs, erroring if non-empty text has none
fn entry_pairs(text: &str) -> Result<Vec<(&str, &str)>, MappingError> {
    if text
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .is_empty()
    {
        return Ok(Vec::new());
    }

    let pairs: Vec<(&str, &str)> = ENTRY_PATTERN
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect();

    if pairs.is_empty() {
        return Err(MappingError::Malformed {
            text: text.to_string(),
        });
    }

    Ok(pairs)
}

/// Parse mapping text into ordered entries
///
/// Empty text yields no entries; the caller decides whether to derive a
/// mapping from the header row instead.
pub fn parse_mappings(text: &str) -> Result<Vec<MappingEntry>, MappingError> {
    Ok(entry_pairs(text)?
        .into_iter()
        .map(|(key, path)| MappingEntry::new(strip_column_prefix(key), FieldPath::parse(path)))
        .collect())
}

/// Parse `path=value` defaults using the same entry grammar
pub fn parse_defaults(text: &str) -> Result<Vec<DefaultEntry>, MappingError> {
    Ok(entry_pairs(text)?
        .into_iter()
        .map(|(path, value)| DefaultEntry {
            path: FieldPath::parse(path),
            value: value.to_string(),
        })
        .collect())
}

/// Derive one positional mapping per non-empty header cell
///
/// Header cells are lower-cased to form the field name, so a header of
/// `["Name", "", "Price"]` yields `column1=name, column3=price`.
pub fn mappings_from_header(header: &[String]) -> Vec<MappingEntry> {
    header
        .iter()
        .enumerate()
        .filter_map(|(i, heading)| {
            let key = heading.trim().to_lowercase();
            if key.is_empty() {
                return None;
            }
            Some(MappingEntry::new((i + 1).to_string(), FieldPath::simple(key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positional_mappings() {
        let mappings = parse_mappings("column1=name,column2=category.title").unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].column, "1");
        assert_eq!(mappings[0].path.segments(), &["name".to_string()]);
        assert_eq!(mappings[1].column, "2");
        assert_eq!(
            mappings[1].path.segments(),
            &["category".to_string(), "title".to_string()]
        );
    }

    #[test]
    fn test_parse_whitespace_separated() {
        let mappings = parse_mappings("column1=name  column3=tags.0.name\n2=sku").unwrap();
        let columns: Vec<_> = mappings.iter().map(|m| m.column.as_str()).collect();
        assert_eq!(columns, vec!["1", "3", "2"]);
        assert_eq!(mappings[1].path.to_string(), "tags.0.name");
    }

    #[test]
    fn test_parse_header_keys_kept_verbatim() {
        let mappings = parse_mappings("Name=name,columnist=author").unwrap();
        assert_eq!(mappings[0].column, "Name");
        // Only a numeric suffix makes "column" a prefix
        assert_eq!(mappings[1].column, "columnist");
    }

    #[test]
    fn test_parse_does_not_validate_segments() {
        let mappings = parse_mappings("column1=a..b").unwrap();
        assert_eq!(mappings[0].path.segments().len(), 3);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert_eq!(parse_mappings("").unwrap(), vec![]);
        assert_eq!(parse_mappings("  , ").unwrap(), vec![]);
    }

    #[test]
    fn test_malformed_text_errors() {
        assert!(matches!(
            parse_mappings("name category"),
            Err(MappingError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_defaults() {
        let defaults = parse_defaults("status=active,category.title=Misc").unwrap();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[1].path.to_string(), "category.title");
        assert_eq!(defaults[1].value, "Misc");
    }

    #[test]
    fn test_mappings_from_header() {
        let header = vec!["Name".to_string(), "".to_string(), " Price ".to_string()];
        let mappings = mappings_from_header(&header);
        let rendered: Vec<String> = mappings.iter().map(|m| m.to_string()).collect();
        assert_eq!(rendered, vec!["column1=name", "column3=price"]);
    }
}
