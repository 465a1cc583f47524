//! HTML templates using Askama.

use askama::Template;

/// Swagger UI page pointed at the generated OpenAPI document.
#[derive(Template)]
#[template(path = "docs.html")]
pub struct DocsTemplate<'a> {
    pub title: &'a str,
    pub schema_url: &'a str,
}
