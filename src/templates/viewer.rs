//! Viewer template: embedded PDF frame with download and open controls.

use crate::viewer::{ViewerState, ViewerTargets};

use super::components::{base_html, html_escape};

/// Release the page scope when the page goes away, so the server drops the
/// blob it holds for this page.
fn release_script(page_id: &str) -> String {
    let release_url = serde_json::to_string(&format!("/api/page/{}/release", page_id))
        .unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"<script>
    window.addEventListener('pagehide', function() {{
        try {{ navigator.sendBeacon({release_url}); }} catch (e) {{}}
    }});
    </script>"#,
        release_url = release_url
    )
}

fn render_controls(title: &str, targets: &ViewerTargets) -> String {
    format!(
        r#"<div class="viewer-header">
            <h1 id="viewerTitle">{title}</h1>
            <a class="btn" id="downloadBtn" href="{download}" download="{download_name}">Download</a>
            <a class="btn" id="openNewTabBtn" href="{open}" target="_blank" rel="noopener">Open in new tab</a>
        </div>"#,
        title = html_escape(title),
        download = html_escape(&targets.download_href),
        download_name = html_escape(&targets.download_name),
        open = html_escape(&targets.open_href),
    )
}

fn render_frame(targets: &ViewerTargets) -> String {
    format!(
        r#"<iframe class="pdf-frame" id="pdfFrame" src="{}" title="PDF document"></iframe>"#,
        html_escape(&targets.frame_src)
    )
}

pub fn render_viewer_page(state: &ViewerState) -> String {
    match state {
        ViewerState::ErrorShown { message } => {
            let content = format!(
                r#"<div class="viewer-header"><h1 id="viewerTitle">Viewing PDF</h1></div>
        <div class="error-box" id="errorBox">{}</div>"#,
                html_escape(message)
            );
            base_html("Viewing PDF", &content, "")
        }
        ViewerState::Displayed {
            page_id,
            title,
            targets,
        } => {
            let content = format!(
                r#"{controls}
        <div class="error-box" id="errorBox" hidden></div>
        {frame}"#,
                controls = render_controls(title, targets),
                frame = render_frame(targets),
            );
            base_html(title, &content, &release_script(page_id))
        }
        ViewerState::DisplayedDegraded {
            title,
            targets,
            warning,
        } => {
            let content = format!(
                r#"{controls}
        <div class="error-box" id="errorBox">Could not fetch PDF as blob. Attempting to open direct file. If PDF does not display, try "Open in new tab".<br><small>{warning}</small></div>
        {frame}"#,
                controls = render_controls(title, targets),
                warning = html_escape(warning),
                frame = render_frame(targets),
            );
            base_html(title, &content, "")
        }
    }
}
