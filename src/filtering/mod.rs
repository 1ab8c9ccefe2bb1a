//! # Filtering, Sorting & Pagination
//!
//! Translates list query parameters into SQL conditions.
//!
//! ## Filter syntax
//!
//! `filter` is a JSON object. Entries are combined with AND.
//!
//! ```rust,ignore
//! // Equality, case-insensitive for text
//! GET /properties?filter={"city":"Basel"}
//!
//! // Operators after a double underscore
//! GET /units?filter={"floor__gte":2,"status__in":["vacant","reserved"]}
//!
//! // Free text over the searchable columns
//! GET /contacts?filter={"q":"ada"}
//!
//! // Dotted paths through relations
//! GET /properties?filter={"units.tenant_contact.name__like":"ada"}
//! ```
//!
//! Unknown fields and operators are ignored.

pub mod conditions;
pub mod operators;
pub mod pagination;
pub mod paths;
pub mod sort;

pub use conditions::apply_filters;
pub use operators::{ColumnKind, FilterKey, FilterOperator, parse_filter_key};
pub use pagination::{MAX_PAGE_SIZE, calculate_content_range, parse_pagination, parse_range};
pub use sort::parse_sorting;
