//! Small shared helpers.

pub mod template;

pub use template::{escape_html, render_template, ARTICLE_TEMPLATE};
