use sea_orm::{
    Condition, IdenStatic,
    sea_query::{Expr, Func, SimpleExpr},
};
use serde_json::{Map, Value};

use super::operators::{ColumnKind, FilterKey, FilterOperator, build_expr, parse_filter_key};
use super::paths::{column_ref, relation_path_condition, text_column_ref, typed_column_ref};
use crate::core::{CRUDResource, TenantScope};

// Basic safety limits
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;
const MAX_FIELD_NAME_LENGTH: usize = 200;

fn is_valid_field_name(field_name: &str) -> bool {
    !field_name.is_empty()
        && field_name.len() <= MAX_FIELD_NAME_LENGTH
        && !field_name.starts_with('_')
        && field_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn is_valid_field_value(value: &Value) -> bool {
    match value {
        Value::String(text) => text.len() <= MAX_FIELD_VALUE_LENGTH,
        Value::Array(items) => items.iter().all(is_valid_field_value),
        _ => true,
    }
}

fn parse_filter_json(filter_str: Option<&str>) -> Map<String, Value> {
    let Some(filter) = filter_str else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(filter) {
        Ok(Value::Object(filters)) => filters,
        Ok(_) => {
            tracing::debug!("Filter is not a JSON object, ignoring");
            Map::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Invalid JSON in filter string, ignoring");
            Map::new()
        }
    }
}

fn fulltext_condition<T: CRUDResource>(query: &str) -> Option<Condition> {
    let query = query.trim();
    let columns = T::searchable_columns();
    if query.is_empty() || columns.is_empty() {
        return None;
    }

    let pattern = format!("%{}%", query.to_uppercase());
    let enums = T::enum_columns();
    let mut any = Condition::any();
    for (name, column) in columns {
        let column = if enums.contains(&name) {
            text_column_ref(T::TABLE_NAME, column.as_str())
        } else {
            column_ref(T::TABLE_NAME, column.as_str())
        };
        any = any.add(Expr::expr(Func::upper(column)).like(pattern.clone()));
    }
    Some(any)
}

fn column_condition<T: CRUDResource>(key: &FilterKey<'_>, value: &Value) -> Option<SimpleExpr> {
    let is_id = key.column == T::ID_COLUMN.as_str();
    let (name, column) = T::filterable_columns()
        .into_iter()
        .find(|(name, _)| *name == key.column)
        .or_else(|| is_id.then_some(("id", T::ID_COLUMN)))?;

    let kind = ColumnKind::of(column, &T::enum_columns());
    let operator = key.operator.unwrap_or_else(|| {
        if value.is_string()
            && kind == ColumnKind::Text
            && T::like_filterable_columns().contains(&name)
        {
            FilterOperator::Like
        } else {
            FilterOperator::implied_by(value)
        }
    });
    let column = typed_column_ref(T::TABLE_NAME, column.as_str(), kind);
    build_expr(&column, kind, operator, value)
}

/// Compile a JSON filter object into a condition on `T`'s table.
///
/// Unknown columns, relations and operators, and values that do not fit their
/// operator, are skipped; an unparseable filter means "no filter".
#[must_use]
pub fn apply_filters<T: CRUDResource>(filter_str: Option<&str>, scope: &TenantScope) -> Condition {
    let filters = parse_filter_json(filter_str);
    let mut condition = Condition::all();

    if let Some(query) = filters.get("q").and_then(Value::as_str)
        && let Some(fulltext) = fulltext_condition::<T>(query)
    {
        condition = condition.add(fulltext);
    }

    let relations = T::relations();
    for (raw_key, value) in &filters {
        if raw_key == "q" {
            continue;
        }
        if !is_valid_field_name(raw_key) || !is_valid_field_value(value) {
            tracing::debug!(key = %raw_key, "Skipping invalid filter");
            continue;
        }
        let Some(key) = parse_filter_key(raw_key) else {
            tracing::debug!(key = %raw_key, "Skipping filter with unknown operator");
            continue;
        };

        let expr = if key.is_relation_path() {
            let operator = key
                .operator
                .unwrap_or_else(|| FilterOperator::implied_by(value));
            relation_path_condition(
                T::TABLE_NAME,
                &relations,
                &key.path,
                key.column,
                operator,
                value,
                scope,
            )
        } else {
            column_condition::<T>(&key, value)
        };

        match expr {
            Some(expr) => condition = condition.add(expr),
            None => tracing::debug!(
                key = %raw_key,
                resource = T::RESOURCE_NAME_PLURAL,
                "Skipping filter on unknown field or ill-typed value"
            ),
        }
    }

    condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Property, Unit, property};
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use serde_json::json;
    use uuid::Uuid;

    fn sql_for<T: CRUDResource>(filter: &Value, scope: &TenantScope) -> String {
        let condition = apply_filters::<T>(Some(&filter.to_string()), scope);
        property::Entity::find()
            .filter(condition)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    fn where_clause(sql: &str) -> &str {
        sql.split_once(" WHERE ").map_or("", |(_, clause)| clause)
    }

    #[test]
    fn test_no_filter_is_no_condition() {
        let scope = TenantScope::unscoped();
        for raw in [None, Some(""), Some("not json"), Some("[1, 2]"), Some("{}")] {
            let condition = apply_filters::<Property>(raw, &scope);
            assert!(condition.is_empty(), "{raw:?}");
        }
    }

    #[test]
    fn test_text_equality_and_substring_columns() {
        let sql = sql_for::<Property>(
            &json!({"city": "Basel", "address": "quai"}),
            &TenantScope::unscoped(),
        );
        let clause = where_clause(&sql);
        assert!(clause.contains(r#"UPPER("properties"."city") = 'BASEL'"#), "{sql}");
        assert!(clause.contains(r#"UPPER("properties"."address") LIKE '%QUAI%'"#), "{sql}");
    }

    #[test]
    fn test_free_text_searches_every_searchable_column() {
        let sql = sql_for::<Property>(&json!({"q": " harb "}), &TenantScope::unscoped());
        let clause = where_clause(&sql);
        for column in ["name", "address", "city"] {
            assert!(
                clause.contains(&format!(r#"UPPER("properties"."{column}") LIKE '%HARB%'"#)),
                "{sql}"
            );
        }
        assert!(clause.contains(" OR "), "{sql}");
    }

    #[test]
    fn test_unknown_and_unsafe_keys_are_skipped() {
        let filter = json!({
            "colour": "blue",
            "tenant_id": "00000000-0000-0000-0000-000000000000",
            "name__between": [1, 2],
            "_hidden": 1,
            "name; DROP TABLE properties": "x",
            "units.owner.name": "Ada"
        });
        let condition = apply_filters::<Property>(Some(&filter.to_string()), &TenantScope::unscoped());
        assert!(condition.is_empty());
    }

    #[test]
    fn test_enum_columns_compare_as_text() {
        let sql = sql_for::<Unit>(&json!({"status": "Let"}), &TenantScope::unscoped());
        assert!(
            where_clause(&sql).contains(r#"UPPER(CAST("units"."status" AS TEXT)) = 'LET'"#),
            "{sql}"
        );
    }

    #[test]
    fn test_id_is_always_filterable() {
        let id = Uuid::new_v4();
        let sql = sql_for::<Unit>(&json!({"id": [id.to_string()]}), &TenantScope::unscoped());
        assert!(where_clause(&sql).contains(r#""units"."id" IN ("#), "{sql}");
    }

    #[test]
    fn test_values_must_fit_the_column_kind() {
        let scope = TenantScope::unscoped();
        for filter in [
            json!({"floor": "3"}),
            json!({"floor__gte": "two"}),
            json!({"id__like": "ab"}),
            json!({"id": "not-an-id"}),
            json!({"property_id": 42}),
            json!({"property.id__like": "ab"}),
        ] {
            let condition = apply_filters::<Unit>(Some(&filter.to_string()), &scope);
            assert!(condition.is_empty(), "{filter}");
        }
    }

    #[test]
    fn test_uuid_columns_bind_uuids() {
        let id = Uuid::new_v4();
        let sql = sql_for::<Unit>(&json!({"property_id": id.to_string()}), &TenantScope::unscoped());
        let clause = where_clause(&sql);
        assert!(clause.contains(r#""units"."property_id" = "#), "{sql}");
        assert!(!clause.contains("UPPER"), "{sql}");
    }

    #[test]
    fn test_relation_path_carries_tenant_and_soft_delete() {
        let tenant = Uuid::new_v4();
        let sql = sql_for::<Property>(
            &json!({"units.tenant_contact.name__like": "ada"}),
            &TenantScope::tenant(tenant),
        );
        let clause = where_clause(&sql);
        assert!(clause.contains(r#""properties"."id" IN (SELECT "units"."property_id""#), "{sql}");
        assert!(clause.contains(r#""units"."tenant_contact_id" IN (SELECT "contacts"."id""#), "{sql}");
        assert!(clause.contains(r#"UPPER("contacts"."name") LIKE '%ADA%'"#), "{sql}");
        assert!(clause.contains(r#""contacts"."deleted_at" IS NULL"#), "{sql}");
        assert!(clause.contains(r#""units"."deleted_at" IS NULL"#), "{sql}");
        assert!(clause.contains(r#""units"."tenant_id" = "#), "{sql}");
        assert!(clause.contains(r#""contacts"."tenant_id" = "#), "{sql}");
    }

    #[test]
    fn test_relation_path_to_unfilterable_column_is_skipped() {
        let condition = apply_filters::<Property>(
            Some(r#"{"units.tenant_contact.notes": "x"}"#),
            &TenantScope::unscoped(),
        );
        assert!(condition.is_empty());
    }
}
