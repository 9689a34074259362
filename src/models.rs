//! Data models for the paper catalog.
//!
//! Paper records and subject entries come straight from the JSON resources;
//! filter state and filter options are derived values that never outlive a
//! single request.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Catalog Records
// ============================================================================

/// One catalog entry describing a downloadable PDF.
///
/// Every field is optional on the wire: a record with missing fields still
/// loads and simply renders blank where the value would go.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<i64>,
    #[serde(default)]
    pub file: String,
}

impl PaperRecord {
    /// The year as displayed and searched; empty when absent.
    pub fn year_label(&self) -> String {
        self.year.map(|y| y.to_string()).unwrap_or_default()
    }
}

/// Entry of the optional `subjects.json` resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectEntry {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawYear {
    Number(i64),
    Text(String),
}

/// Years are integers in well-formed catalogs, but numeric strings show up in
/// hand-edited files. Anything else is treated as absent.
fn deserialize_year<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawYear> = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(value) => serde_json::from_value(value).ok(),
        None => None,
    };
    Ok(match raw {
        Some(RawYear::Number(n)) => Some(n),
        Some(RawYear::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

// ============================================================================
// Filtering
// ============================================================================

/// Sentinel value of the subject and year controls meaning "no restriction".
pub const ALL: &str = "all";

/// The tuple of selected subject, year and search text.
///
/// Built fresh from the control values on every change; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default = "all_value")]
    pub subject: String,
    #[serde(default = "all_value")]
    pub year: String,
    #[serde(default, rename = "q")]
    pub query: String,
}

fn all_value() -> String {
    ALL.to_string()
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            subject: all_value(),
            year: all_value(),
            query: String::new(),
        }
    }
}

impl FilterState {
    pub fn new(subject: &str, year: &str, query: &str) -> Self {
        Self {
            subject: subject.to_string(),
            year: year.to_string(),
            query: query.to_string(),
        }
    }

    /// Treats empty control values the same as "all", which is what a
    /// submitted form with a blank select produces.
    pub fn normalized(self) -> Self {
        let or_all = |v: String| if v.trim().is_empty() { all_value() } else { v };
        Self {
            subject: or_all(self.subject),
            year: or_all(self.year),
            query: self.query,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.subject == ALL && self.year == ALL && self.query.is_empty()
    }
}

/// A subject choice in the filter control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectOption {
    pub id: String,
    pub name: String,
}

/// Distinct subject and year values offered by the filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub subjects: Vec<SubjectOption>,
    pub years: Vec<i64>,
}

// ============================================================================
// API Responses
// ============================================================================

/// Body of `/api/papers`: the re-rendered list container.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaperListResponse {
    pub count: usize,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_with_integer_year() {
        let p: PaperRecord = serde_json::from_str(
            r#"{"title":"Algebra Midterm","subject":"math","year":2020,"file":"a.pdf"}"#,
        )
        .unwrap();
        assert_eq!(p.year, Some(2020));
        assert_eq!(p.year_label(), "2020");
    }

    #[test]
    fn test_record_with_string_year() {
        let p: PaperRecord =
            serde_json::from_str(r#"{"title":"T","subject":"s","year":"2019","file":"f"}"#)
                .unwrap();
        assert_eq!(p.year, Some(2019));
    }

    #[test]
    fn test_record_with_missing_fields() {
        let p: PaperRecord = serde_json::from_str(r#"{"title":"Only a title"}"#).unwrap();
        assert_eq!(p.title, "Only a title");
        assert_eq!(p.subject, "");
        assert_eq!(p.year, None);
        assert_eq!(p.year_label(), "");
        assert_eq!(p.file, "");
    }

    #[test]
    fn test_record_with_garbage_year() {
        let p: PaperRecord = serde_json::from_str(r#"{"year":{"nested":true}}"#).unwrap();
        assert_eq!(p.year, None);
        let p: PaperRecord = serde_json::from_str(r#"{"year":null}"#).unwrap();
        assert_eq!(p.year, None);
    }

    #[test]
    fn test_filter_state_defaults() {
        let f: FilterState = serde_json::from_str("{}").unwrap();
        assert_eq!(f, FilterState::default());
        assert!(f.is_unrestricted());
    }

    #[test]
    fn test_filter_state_normalizes_blank_selects() {
        let f = FilterState::new("", " ", "x").normalized();
        assert_eq!(f.subject, ALL);
        assert_eq!(f.year, ALL);
        assert_eq!(f.query, "x");
    }
}
