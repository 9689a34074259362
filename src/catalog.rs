//! Catalog loading, option derivation and filtering.
//!
//! Filtering is a pure function of the loaded paper list and a
//! [`FilterState`]; the same functions back the server-rendered catalog page
//! and the `/api/papers` endpoint the page's controls call on every change.

use std::collections::BTreeSet;

use tracing::{error, warn};

use crate::error::CatalogError;
use crate::fetch::AssetFetcher;
use crate::models::{FilterOptions, FilterState, PaperRecord, SubjectEntry, SubjectOption, ALL};

// ============================================================================
// Loading
// ============================================================================

async fn load_json<T>(fetcher: &dyn AssetFetcher, source: &str) -> Result<T, CatalogError>
where
    T: serde::de::DeserializeOwned,
{
    let asset = fetcher
        .fetch(source)
        .await
        .map_err(|error| CatalogError::Fetch {
            source_name: source.to_string(),
            error,
        })?;
    serde_json::from_slice(&asset.bytes).map_err(|error| CatalogError::Parse {
        source_name: source.to_string(),
        error,
    })
}

/// Fetch and parse the paper list.
pub async fn load_papers(
    fetcher: &dyn AssetFetcher,
    source: &str,
) -> Result<Vec<PaperRecord>, CatalogError> {
    load_json(fetcher, source).await
}

/// Fetch and parse the optional subject list.
pub async fn load_subjects(
    fetcher: &dyn AssetFetcher,
    source: &str,
) -> Result<Vec<SubjectEntry>, CatalogError> {
    load_json(fetcher, source).await
}

/// Everything a catalog page needs, with load failures already converted
/// into a displayable message.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoad {
    pub papers: Vec<PaperRecord>,
    pub options: FilterOptions,
    pub error: Option<String>,
}

/// Load the catalog for one page render. Never fails: a broken paper list
/// yields an empty catalog with an error message.
pub async fn load_catalog(
    fetcher: &dyn AssetFetcher,
    papers_source: &str,
    subjects_source: Option<&str>,
) -> CatalogLoad {
    let papers = match load_papers(fetcher, papers_source).await {
        Ok(papers) => papers,
        Err(e) => {
            error!(error = %e, "failed to load papers");
            return CatalogLoad {
                papers: Vec::new(),
                options: FilterOptions::default(),
                error: Some(format!("Could not load papers: {}", e)),
            };
        }
    };

    let mut options = derive_options(&papers);

    if let Some(source) = subjects_source {
        match load_subjects(fetcher, source).await {
            Ok(subjects) => options.subjects = subject_options_from_entries(subjects),
            Err(e) => warn!(error = %e, "failed to load subjects, deriving from papers"),
        }
    }

    CatalogLoad {
        papers,
        options,
        error: None,
    }
}

// ============================================================================
// Options
// ============================================================================

/// Distinct subjects (alphabetical) and years (newest first).
pub fn derive_options(papers: &[PaperRecord]) -> FilterOptions {
    let subjects: BTreeSet<&str> = papers
        .iter()
        .map(|p| p.subject.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    let years: BTreeSet<i64> = papers.iter().filter_map(|p| p.year).collect();

    FilterOptions {
        subjects: subjects
            .into_iter()
            .map(|id| SubjectOption {
                id: id.to_string(),
                name: capitalize(id),
            })
            .collect(),
        years: years.into_iter().rev().collect(),
    }
}

/// Subject options in the order `subjects.json` lists them.
fn subject_options_from_entries(entries: Vec<SubjectEntry>) -> Vec<SubjectOption> {
    entries
        .into_iter()
        .map(|e| SubjectOption {
            id: e.id,
            name: e.name,
        })
        .collect()
}

// ============================================================================
// Filtering
// ============================================================================

/// Whether a paper passes the filter.
///
/// Subject and year compare exactly; the year control value must parse to
/// the paper's year. The query is a case-insensitive substring of
/// `"<title> <subject> <year>"`.
pub fn matches(paper: &PaperRecord, filter: &FilterState) -> bool {
    let subject_ok = filter.subject == ALL || paper.subject == filter.subject;

    let year_ok = filter.year == ALL
        || match (paper.year, filter.year.trim().parse::<i64>()) {
            (Some(year), Ok(wanted)) => year == wanted,
            _ => false,
        };

    let query_ok = filter.query.is_empty() || {
        let haystack = format!("{} {} {}", paper.title, paper.subject, paper.year_label());
        haystack.to_lowercase().contains(&filter.query.to_lowercase())
    };

    subject_ok && year_ok && query_ok
}

/// The papers passing `filter`, in their original order.
pub fn apply_filters<'a>(papers: &'a [PaperRecord], filter: &FilterState) -> Vec<&'a PaperRecord> {
    papers.iter().filter(|p| matches(p, filter)).collect()
}

/// Upper-case the first character (`math` becomes `Math`).
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::FetchedAsset;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn paper(title: &str, subject: &str, year: i64, file: &str) -> PaperRecord {
        PaperRecord {
            title: title.to_string(),
            subject: subject.to_string(),
            year: Some(year),
            file: file.to_string(),
        }
    }

    fn sample() -> Vec<PaperRecord> {
        vec![
            paper("Algebra Midterm", "math", 2020, "a.pdf"),
            paper("Physics Final", "physics", 2021, "b.pdf"),
        ]
    }

    fn larger_sample() -> Vec<PaperRecord> {
        vec![
            paper("Calculus Final", "math", 2018, "c1.pdf"),
            paper("Organic Chemistry Quiz", "chemistry", 2019, "o.pdf"),
            paper("Algebra Midterm", "math", 2020, "a.pdf"),
            paper("Mechanics Final", "physics", 2018, "m.pdf"),
            paper("Geometry Final", "math", 2021, "g.pdf"),
        ]
    }

    struct MapFetcher(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl AssetFetcher for MapFetcher {
        async fn fetch(&self, file: &str) -> Result<FetchedAsset, FetchError> {
            self.0
                .get(file)
                .map(|body| FetchedAsset {
                    bytes: body.as_bytes().to_vec(),
                    content_type: Some("application/json".to_string()),
                })
                .ok_or(FetchError::Status(404))
        }
    }

    #[test]
    fn test_subject_filter_scenario() {
        let papers = sample();
        let filtered = apply_filters(&papers, &FilterState::new("math", "all", ""));
        assert_eq!(filtered, vec![&papers[0]]);
    }

    #[test]
    fn test_query_filter_scenario() {
        let papers = sample();
        let filtered = apply_filters(&papers, &FilterState::new("all", "all", "final"));
        assert_eq!(filtered, vec![&papers[1]]);
    }

    #[test]
    fn test_unrestricted_filter_returns_everything() {
        let papers = larger_sample();
        let filtered = apply_filters(&papers, &FilterState::default());
        assert_eq!(filtered.len(), papers.len());
        assert!(filtered.iter().zip(papers.iter()).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_filter_preserves_order() {
        let papers = larger_sample();
        let filtered = apply_filters(&papers, &FilterState::new("all", "all", "final"));
        let titles: Vec<&str> = filtered.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Calculus Final", "Mechanics Final", "Geometry Final"]);
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let papers = sample();
        for q in ["ALGEBRA", "algebra", "AlGeBrA", "midTERM"] {
            let filtered = apply_filters(&papers, &FilterState::new("all", "all", q));
            assert_eq!(filtered, vec![&papers[0]], "query {:?}", q);
        }
    }

    #[test]
    fn test_query_searches_subject_and_year() {
        let papers = sample();
        let by_subject = apply_filters(&papers, &FilterState::new("all", "all", "PHYS"));
        assert_eq!(by_subject, vec![&papers[1]]);
        let by_year = apply_filters(&papers, &FilterState::new("all", "all", "2020"));
        assert_eq!(by_year, vec![&papers[0]]);
    }

    #[test]
    fn test_year_filter_is_exact() {
        let papers = larger_sample();
        assert!(apply_filters(&papers, &FilterState::new("all", "201", "")).is_empty());
        let filtered = apply_filters(&papers, &FilterState::new("all", "2018", ""));
        let files: Vec<&str> = filtered.iter().map(|p| p.file.as_str()).collect();
        assert_eq!(files, vec!["c1.pdf", "m.pdf"]);
    }

    #[test]
    fn test_query_substring_can_hit_partial_year() {
        // Free-text search is substring-based even over the year text.
        let papers = larger_sample();
        let filtered = apply_filters(&papers, &FilterState::new("all", "all", "201"));
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_unparsable_year_matches_nothing() {
        let papers = sample();
        assert!(apply_filters(&papers, &FilterState::new("all", "twenty", "")).is_empty());
    }

    #[test]
    fn test_combined_filters() {
        let papers = larger_sample();
        let filtered = apply_filters(&papers, &FilterState::new("math", "2021", "final"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Geometry Final");
        assert!(apply_filters(&papers, &FilterState::new("math", "2019", "")).is_empty());
    }

    #[test]
    fn test_paper_without_year_never_matches_year_filter() {
        let papers = vec![PaperRecord {
            title: "Undated".to_string(),
            subject: "math".to_string(),
            year: None,
            file: "u.pdf".to_string(),
        }];
        assert!(apply_filters(&papers, &FilterState::new("all", "2020", "")).is_empty());
        assert_eq!(apply_filters(&papers, &FilterState::default()).len(), 1);
    }

    #[test]
    fn test_derive_options() {
        let options = derive_options(&larger_sample());
        let ids: Vec<&str> = options.subjects.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["chemistry", "math", "physics"]);
        assert_eq!(options.subjects[1].name, "Math");
        assert_eq!(options.years, vec![2021, 2020, 2019, 2018]);
    }

    #[test]
    fn test_derive_options_is_deterministic() {
        let mut reversed = larger_sample();
        reversed.reverse();
        assert_eq!(derive_options(&larger_sample()), derive_options(&reversed));
    }

    #[test]
    fn test_derive_options_empty() {
        assert_eq!(derive_options(&[]), FilterOptions::default());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("math"), "Math");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("économie"), "Économie");
    }

    #[tokio::test]
    async fn test_load_catalog_success() {
        let fetcher = MapFetcher(HashMap::from([(
            "papers.json",
            r#"[{"title":"Algebra Midterm","subject":"math","year":2020,"file":"a.pdf"}]"#,
        )]));
        let load = load_catalog(&fetcher, "papers.json", None).await;
        assert!(load.error.is_none());
        assert_eq!(load.papers.len(), 1);
        assert_eq!(load.options.years, vec![2020]);
    }

    #[tokio::test]
    async fn test_load_catalog_missing_file() {
        let fetcher = MapFetcher(HashMap::new());
        let load = load_catalog(&fetcher, "papers.json", None).await;
        assert!(load.papers.is_empty());
        let message = load.error.unwrap();
        assert!(message.contains("papers.json"), "{}", message);
    }

    #[tokio::test]
    async fn test_load_catalog_bad_json() {
        let fetcher = MapFetcher(HashMap::from([("papers.json", "{not json")]));
        let load = load_catalog(&fetcher, "papers.json", None).await;
        assert!(load.papers.is_empty());
        assert!(load.error.unwrap().starts_with("Could not load papers"));
    }

    #[tokio::test]
    async fn test_load_catalog_uses_subject_list() {
        let fetcher = MapFetcher(HashMap::from([
            (
                "papers.json",
                r#"[{"title":"A","subject":"math","year":2020,"file":"a.pdf"}]"#,
            ),
            (
                "subjects.json",
                r#"[{"id":"physics","name":"Physics"},{"id":"math","name":"Mathematics"}]"#,
            ),
        ]));
        let load = load_catalog(&fetcher, "papers.json", Some("subjects.json")).await;
        let names: Vec<&str> = load.options.subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Physics", "Mathematics"]);
    }

    #[tokio::test]
    async fn test_load_catalog_subject_fallback() {
        let fetcher = MapFetcher(HashMap::from([(
            "papers.json",
            r#"[{"title":"A","subject":"math","year":2020,"file":"a.pdf"}]"#,
        )]));
        let load = load_catalog(&fetcher, "papers.json", Some("subjects.json")).await;
        assert!(load.error.is_none());
        assert_eq!(load.options.subjects[0].id, "math");
    }
}
