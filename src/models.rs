use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for filtering, pagination, sorting and expansion of lists.
///
/// # Filtering
/// The `filter` parameter accepts a JSON-encoded object:
/// - **Free text search:** `{"q": "harbour"}`
/// - **Equality:** `{"city": "Basel"}` (case-insensitive for text)
/// - **Several ids:** `{"id": ["550e8400-e29b-41d4-a716-446655440000", "…"]}`
/// - **Operators:** `{"floor__gte": 2, "status__in": ["vacant", "reserved"]}`
/// - **Relations:** `{"units.tenant_contact.name__like": "ada"}`
///
/// # Pagination
/// - **React Admin format:** `range=[0,9]`
/// - **Standard REST format:** `page=1&per_page=10`
///
/// # Sorting
/// `sort=["name","DESC"]`, or `sort=name&order=DESC`, or `sort_by=name`.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct FilterOptions {
    /// JSON-encoded filter object.
    #[param(example = json!({"q": "harbour", "floor__gte": 2}))]
    pub filter: Option<String>,
    /// Range for pagination in the format "[start, end]" (inclusive).
    #[param(example = "[0,9]")]
    pub range: Option<String>,
    /// Page number for standard REST pagination (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Number of items per page for standard REST pagination.
    #[param(example = 10)]
    pub per_page: Option<u64>,
    /// Sort in the format `["column", "order"]`, or a bare column name.
    #[param(example = r#"["name", "ASC"]"#)]
    pub sort: Option<String>,
    /// Sort column for standard REST format.
    #[param(example = "name")]
    pub sort_by: Option<String>,
    /// Sort order for standard REST format (ASC or DESC).
    #[param(example = "ASC")]
    pub order: Option<String>,
    /// Comma-separated relation paths to embed, e.g. `units,units.tenant_contact`.
    #[param(example = "units")]
    pub expand: Option<String>,
    /// Include soft-deleted records.
    pub include_deleted: Option<bool>,
}

/// Query parameters for single-record reads.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct ExpandOptions {
    /// Comma-separated relation paths to embed in addition to auto-expanded ones.
    pub expand: Option<String>,
    /// Allow reading a soft-deleted record.
    pub include_deleted: Option<bool>,
}
