use axum::http::header::{CONTENT_RANGE, HeaderMap, HeaderValue};

use crate::models::FilterOptions;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Upper bound on rows returned by one list request.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Remove characters that cannot appear in a header value.
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the `Content-Range` header for a page of results.
///
/// # Arguments
///
/// * `offset` - The starting point of the range.
/// * `limit` - The maximum number of items in the range.
/// * `total_count` - The total number of matching items.
/// * `resource_name` - The plural resource name, e.g. `properties`.
///
/// The end is the last row actually returned: a page of ten over four rows
/// reads `properties 0-3/4`. A page past the end, or an empty collection,
/// reads `properties */4`.
#[must_use]
pub fn calculate_content_range(
    offset: u64,
    limit: u64,
    total_count: u64,
    resource_name: &str,
) -> HeaderMap {
    let range = if offset >= total_count {
        "*".to_string()
    } else {
        let last = offset
            .saturating_add(limit.max(1))
            .saturating_sub(1)
            .min(total_count - 1);
        format!("{offset}-{last}")
    };
    let safe_name = sanitize_resource_name(resource_name);

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("{safe_name} {range}/{total_count}"))
        .unwrap_or_else(|_| {
            HeaderValue::from_str(&format!("items {range}/{total_count}"))
                .unwrap_or(HeaderValue::from_static("items */0"))
        });
    headers.insert(CONTENT_RANGE, value);
    headers
}

/// Parse a React Admin `[start, end]` range (inclusive) into `(offset, limit)`.
///
/// Anything unparseable, or an end before the start, gives the first page.
#[must_use]
pub fn parse_range(range: Option<&str>) -> (u64, u64) {
    let Some((start, end)) = range
        .and_then(|r| serde_json::from_str::<[u64; 2]>(r).ok())
        .map(|[start, end]| (start, end))
        .filter(|(start, end)| end >= start)
    else {
        return (0, DEFAULT_PAGE_SIZE);
    };
    let limit = end.saturating_sub(start).saturating_add(1).min(MAX_PAGE_SIZE);
    (start, limit)
}

/// Resolve `(offset, limit)` from either `page`/`per_page` (1-based) or `range`.
#[must_use]
pub fn parse_pagination(params: &FilterOptions) -> (u64, u64) {
    if let Some(page) = params.page {
        // Standard REST pagination
        let per_page = params
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        (offset, per_page)
    } else if let Some(per_page) = params.per_page {
        (0, per_page.clamp(1, MAX_PAGE_SIZE))
    } else {
        parse_range(params.range.as_deref())
    }
}
