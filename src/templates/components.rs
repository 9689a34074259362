//! Shared HTML components: escaping, navigation bar and the base page template.

use super::styles::STYLE;

// ============================================================================
// Escaping
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ============================================================================
// Navigation Bar
// ============================================================================

pub fn nav_bar() -> &'static str {
    r#"<nav class="nav-bar">
            <a href="/">Papers</a>
            <span class="spacer"></span>
        </nav>"#
}

// ============================================================================
// Base HTML Template
// ============================================================================

/// Full page around `content`; `script` is appended at the end of the body.
pub fn base_html(title: &str, content: &str, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    {nav}
    <div class="container">
        {content}
    </div>
    {script}
</body>
</html>"#,
        title = html_escape(title),
        nav = nav_bar(),
        content = content,
        script = script,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom's & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom&#39;s &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_base_html_escapes_title() {
        let page = base_html("<Papers>", "<p>body</p>", "");
        assert!(page.contains("<title>&lt;Papers&gt;</title>"));
        assert!(page.contains("<p>body</p>"));
    }
}
