//! CSS styles for the catalog and viewer pages.

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
/* Solarized Light Theme */
:root {
    --base01: #586e75;
    --base00: #657b83;
    --base1: #93a1a1;
    --base2: #eee8d5;
    --base3: #fdf6e3;

    --yellow: #b58900;
    --orange: #cb4b16;
    --red: #dc322f;
    --blue: #268bd2;
    --cyan: #2aa198;

    --bg: var(--base3);
    --fg: var(--base00);
    --muted: var(--base1);
    --border: var(--base2);
    --link: var(--blue);
    --link-hover: var(--cyan);
    --card-bg: #f5ecd5;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: var(--fg);
    background: var(--bg);
}

.container {
    max-width: 900px;
    margin: 0 auto;
    padding: 1rem;
}

a { color: var(--link); text-decoration: none; }
a:hover { color: var(--link-hover); text-decoration: underline; }

h1 { font-weight: 600; margin: 1em 0 0.5em; color: var(--base01); }

.nav-bar {
    display: flex;
    align-items: center;
    gap: 1rem;
    padding: 0.75rem 1rem;
    border-bottom: 1px solid var(--border);
}
.nav-bar .spacer { flex: 1; }

/* Filters */
.filters {
    display: flex;
    flex-wrap: wrap;
    gap: 0.5rem;
    margin-bottom: 1rem;
}
.filters select, .filters input {
    padding: 0.4rem 0.6rem;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: white;
    color: var(--fg);
    font-size: 0.95rem;
}
.filters input { flex: 1; min-width: 12rem; }

/* Paper cards */
.paper-card {
    display: flex;
    justify-content: space-between;
    align-items: center;
    gap: 1rem;
    padding: 0.75rem 1rem;
    margin-bottom: 0.5rem;
    background: var(--card-bg);
    border-radius: 6px;
}
.paper-title { font-weight: 600; }
.paper-meta { font-size: 0.85rem; color: var(--muted); }
.paper-actions { display: flex; gap: 0.5rem; flex-shrink: 0; }

.btn {
    display: inline-block;
    padding: 0.3rem 0.8rem;
    border: 1px solid var(--link);
    border-radius: 4px;
    color: var(--link);
    background: transparent;
    font-size: 0.9rem;
    cursor: pointer;
}
.btn:hover { background: var(--link); color: white; text-decoration: none; }

.no-results, .load-error {
    padding: 2rem 0;
    text-align: center;
    color: var(--muted);
}
.load-error { color: var(--red); }

/* Viewer */
.viewer-header {
    display: flex;
    align-items: center;
    gap: 0.75rem;
    flex-wrap: wrap;
    margin-bottom: 0.75rem;
}
.viewer-header h1 { margin: 0; flex: 1; font-size: 1.3rem; }
.error-box {
    padding: 0.75rem 1rem;
    margin-bottom: 0.75rem;
    border-left: 3px solid var(--orange);
    background: #fbeee0;
    color: var(--base01);
}
.error-box small { color: var(--muted); }
.pdf-frame {
    width: 100%;
    height: 80vh;
    border: 1px solid var(--border);
    border-radius: 4px;
    background: white;
}

@media (max-width: 600px) {
    .paper-card { flex-direction: column; align-items: flex-start; }
    .pdf-frame { height: 70vh; }
}
"#;
