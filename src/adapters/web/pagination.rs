//! `?page=&page_size=` parsing and the paginated response envelope.

use axum::http::Uri;
use serde::Deserialize;

use crate::domain::page::{Page, PageRequest, PaginationSettings};

use super::WebError;
use super::dto::Paginated;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageParams {
    /// A malformed page number is a 404; a malformed size falls back to the
    /// default.
    pub fn request(&self, settings: &PaginationSettings) -> Result<PageRequest, WebError> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<u32>()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(WebError::invalid_page)?,
            ),
        };
        let page_size = self
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok());
        Ok(settings.request(page, page_size))
    }
}

/// Wraps a store page in the response envelope, rejecting pages past the end.
pub fn envelope<T, U>(page: Page<T>, uri: &Uri) -> Result<Paginated<U>, WebError>
where
    U: From<T>,
{
    if page.is_out_of_range() {
        return Err(WebError::invalid_page());
    }
    let current = page.request.page;
    let next = page.has_next().then(|| page_link(uri, Some(current + 1)));
    let previous = page
        .has_previous()
        .then(|| page_link(uri, (current > 2).then(|| current - 1)));
    let page = page.map(U::from);
    Ok(Paginated {
        count: page.count,
        next,
        previous,
        results: page.items,
    })
}

/// The request's path and query with `page` replaced. `None` drops it.
fn page_link(uri: &Uri, page: Option<u32>) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        pairs.push(format!("page={page}"));
    }
    if pairs.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), pairs.join("&"))
    }
}
