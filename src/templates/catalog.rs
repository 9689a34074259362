//! Catalog page: filter controls and the paper card list.

use crate::catalog::capitalize;
use crate::models::{FilterOptions, FilterState, PaperRecord, ALL};

use super::components::{base_html, html_escape};

/// Shown in place of the list when no paper passes the filter.
pub const NO_RESULTS_HTML: &str = r#"<p class="no-results">No matching papers found.</p>"#;

// ============================================================================
// Links
// ============================================================================

/// `viewer.html?file=...&title=...`, the link contract between the two pages.
pub fn viewer_link(paper: &PaperRecord) -> String {
    let mut link = format!("/viewer.html?file={}", urlencoding::encode(&paper.file));
    if !paper.title.is_empty() {
        link.push_str("&title=");
        link.push_str(&urlencoding::encode(&paper.title));
    }
    link
}

pub fn download_link(paper: &PaperRecord) -> String {
    format!("/download?file={}", urlencoding::encode(&paper.file))
}

// ============================================================================
// Paper List
// ============================================================================

fn render_card(paper: &PaperRecord) -> String {
    let viewer = html_escape(&viewer_link(paper));
    format!(
        r#"<div class="paper-card">
            <div class="paper-info">
                <a class="paper-title" href="{viewer}">{title}</a>
                <div class="paper-meta">{subject} • {year}</div>
            </div>
            <div class="paper-actions">
                <a class="btn open-btn" href="{viewer}">Open</a>
                <a class="btn download-btn" href="{download}">Download</a>
            </div>
        </div>"#,
        viewer = viewer,
        title = html_escape(&paper.title),
        subject = html_escape(&capitalize(&paper.subject)),
        year = paper.year_label(),
        download = html_escape(&download_link(paper)),
    )
}

/// Contents of the list container for an already filtered sequence.
pub fn render_papers(papers: &[&PaperRecord]) -> String {
    if papers.is_empty() {
        return NO_RESULTS_HTML.to_string();
    }
    papers.iter().map(|p| render_card(p)).collect::<Vec<_>>().join("\n")
}

/// Contents of the list container when the catalog itself failed to load.
pub fn render_load_error(message: &str) -> String {
    format!(r#"<p class="load-error">{}</p>"#, html_escape(message))
}

// ============================================================================
// Filter Controls
// ============================================================================

fn option_tag(value: &str, label: &str, selected: &str) -> String {
    let sel = if value == selected { " selected" } else { "" };
    format!(
        r#"<option value="{}"{}>{}</option>"#,
        html_escape(value),
        sel,
        html_escape(label)
    )
}

pub fn render_filters(options: &FilterOptions, filter: &FilterState) -> String {
    let mut subjects = option_tag(ALL, "All Subjects", &filter.subject);
    for s in &options.subjects {
        subjects.push_str(&option_tag(&s.id, &s.name, &filter.subject));
    }

    let mut years = option_tag(ALL, "All Years", &filter.year);
    for y in &options.years {
        let y = y.to_string();
        years.push_str(&option_tag(&y, &y, &filter.year));
    }

    format!(
        r#"<form class="filters" id="filterForm" action="/" method="get">
            <select id="subjectFilter" name="subject">{subjects}</select>
            <select id="yearFilter" name="year">{years}</select>
            <input type="search" id="searchBox" name="q" placeholder="Search papers..." value="{query}">
            <noscript><button class="btn" type="submit">Filter</button></noscript>
        </form>"#,
        subjects = subjects,
        years = years,
        query = html_escape(&filter.query),
    )
}

// ============================================================================
// Page
// ============================================================================

/// Re-runs the filter on every control change. Responses can arrive out of
/// order, so only the latest request is allowed to replace the list.
const CATALOG_SCRIPT: &str = r#"<script>
(function() {
    const subject = document.getElementById('subjectFilter');
    const year = document.getElementById('yearFilter');
    const search = document.getElementById('searchBox');
    const list = document.getElementById('paperList');
    let latest = 0;

    async function applyFilters() {
        const params = new URLSearchParams({
            subject: subject.value,
            year: year.value,
            q: search.value
        });
        const mine = ++latest;
        try {
            const response = await fetch('/api/papers?' + params.toString());
            if (!response.ok) throw new Error('Server error: ' + response.status);
            const data = await response.json();
            if (mine !== latest) return;
            list.innerHTML = data.html;
            history.replaceState(null, '', '?' + params.toString());
        } catch (err) {
            console.error('Filter failed:', err);
        }
    }

    subject.addEventListener('change', applyFilters);
    year.addEventListener('change', applyFilters);
    search.addEventListener('input', applyFilters);
    document.getElementById('filterForm').addEventListener('submit', function(e) {
        e.preventDefault();
        applyFilters();
    });
})();
</script>"#;

pub fn render_catalog_page(options: &FilterOptions, filter: &FilterState, list_html: &str) -> String {
    let content = format!(
        r#"<h1>Question Papers</h1>
        {filters}
        <div id="paperList" class="paper-list">
            {list}
        </div>"#,
        filters = render_filters(options, filter),
        list = list_html,
    );
    base_html("Question Papers", &content, CATALOG_SCRIPT)
}
