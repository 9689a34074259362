//! HTML templates and styling for the catalog and viewer pages.
//!
//! ## Module Structure
//!
//! - `styles` - CSS constants and theme definitions
//! - `components` - Escaping, nav bar and base template
//! - `catalog` - Filter controls and paper cards
//! - `viewer` - PDF viewer page

mod styles;
mod components;
mod catalog;
mod viewer;

pub use styles::STYLE;
pub use components::{base_html, html_escape, nav_bar};
pub use catalog::{
    download_link, render_catalog_page, render_filters, render_load_error, render_papers,
    viewer_link, NO_RESULTS_HTML,
};
pub use viewer::render_viewer_page;
