use sea_orm::sea_query::Order;

use crate::core::CRUDResource;
use crate::models::FilterOptions;

const DEFAULT_SORT_ORDER: &str = "ASC";

/// Parse sort column and order from JSON array format
fn parse_json_sort(json: &str) -> Option<(String, Option<String>)> {
    let sort_vec: Vec<String> = serde_json::from_str(json).ok()?;
    let column = sort_vec.first()?.clone();
    Some((column, sort_vec.get(1).cloned()))
}

/// Convert sort order string to Order enum
fn parse_order(sort_order: &str) -> Order {
    if sort_order.trim().eq_ignore_ascii_case(DEFAULT_SORT_ORDER) {
        Order::Asc
    } else {
        Order::Desc
    }
}

/// Requested (column, order) strings, React Admin or standard REST format.
fn requested_sort(params: &FilterOptions) -> Option<(String, Option<String>)> {
    if let Some(sort_by) = &params.sort_by {
        // Standard REST format: sort_by=column&order=ASC/DESC
        Some((sort_by.clone(), params.order.clone()))
    } else if let Some(sort) = &params.sort {
        if sort.trim_start().starts_with('[') {
            // React Admin format: sort=["column", "ASC"]
            parse_json_sort(sort)
        } else {
            Some((sort.clone(), params.order.clone()))
        }
    } else {
        None
    }
}

/// Resolve the sort for a list request on `T`.
///
/// No sort parameter gives [`CRUDResource::default_sort`]. A column that is
/// not sortable falls back to the id column with the requested direction.
#[must_use]
pub fn parse_sorting<T: CRUDResource>(params: &FilterOptions) -> (T::ColumnType, Order) {
    let Some((column_name, order)) = requested_sort(params) else {
        return T::default_sort();
    };

    let direction = parse_order(order.as_deref().unwrap_or(DEFAULT_SORT_ORDER));
    let column = T::sortable_columns()
        .into_iter()
        .find(|(name, _)| *name == column_name.trim())
        .map_or_else(
            || {
                tracing::debug!(column = %column_name, "Unknown sort column, using id");
                T::ID_COLUMN
            },
            |(_, column)| column,
        );

    (column, direction)
}
