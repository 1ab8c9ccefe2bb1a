//! Dotted-path relation filters.
//!
//! `{"units.tenant_contact.name": "Ada"}` on properties compiles to
//!
//! ```sql
//! "properties"."id" IN (
//!     SELECT "units"."property_id" FROM "units"
//!     WHERE "units"."tenant_contact_id" IN (
//!         SELECT "contacts"."id" FROM "contacts"
//!         WHERE UPPER("contacts"."name") = 'ADA' AND "contacts"."deleted_at" IS NULL AND "contacts"."tenant_id" = ...
//!     ) AND "units"."deleted_at" IS NULL AND "units"."tenant_id" = ...
//! )
//! ```
//!
//! Each hop keeps the related table's tenant and soft-delete rules.

use sea_orm::sea_query::{Alias, Expr, Query, SelectStatement, SimpleExpr};
use serde_json::Value;
use std::sync::Arc;

use super::operators::{ColumnKind, FilterOperator, build_expr};
use crate::core::TenantScope;
use crate::relations::Relation;

#[must_use]
pub fn column_ref(table: &str, column: &str) -> Expr {
    Expr::col((Alias::new(table), Alias::new(column)))
}

/// Column reference cast to text, for enum columns.
#[must_use]
pub fn text_column_ref(table: &str, column: &str) -> Expr {
    Expr::expr(column_ref(table, column).cast_as(Alias::new("TEXT")))
}

/// Column reference for comparing values of `kind`.
#[must_use]
pub fn typed_column_ref(table: &str, column: &str, kind: ColumnKind) -> Expr {
    match kind {
        ColumnKind::Enum => text_column_ref(table, column),
        _ => column_ref(table, column),
    }
}

/// Restrict a select on the relation's target table to rows `scope` may see.
pub fn restrict_to_visible(
    select: &mut SelectStatement,
    relation: &dyn Relation,
    scope: &TenantScope,
) {
    let target = relation.target_table();
    if let Some(deleted_at) = relation.target_soft_delete_key() {
        select.and_where(column_ref(target, &deleted_at).is_null());
    }
    if let (Some(tenant_key), Some(tenant_id)) = (relation.target_tenant_key(), scope.tenant_id()) {
        select.and_where(column_ref(target, &tenant_key).eq(tenant_id));
    }
}

/// Build the condition for `path` (relation names) ending at `column` on the
/// last related table. Returns `None` if any relation or the column is
/// unknown, or the value does not fit the operator.
#[must_use]
pub fn relation_path_condition(
    table: &str,
    relations: &[Arc<dyn Relation>],
    path: &[&str],
    column: &str,
    operator: FilterOperator,
    value: &Value,
    scope: &TenantScope,
) -> Option<SimpleExpr> {
    let (head, rest) = path.split_first()?;
    let relation = relations.iter().find(|relation| relation.name() == *head)?;
    let target = relation.target_table();

    let inner = if rest.is_empty() {
        let (_, kind) = relation
            .target_filterable()
            .into_iter()
            .find(|(name, _)| name.as_str() == column)?;
        build_expr(&typed_column_ref(target, column, kind), kind, operator, value)?
    } else {
        relation_path_condition(
            target,
            &relation.target_relations(),
            rest,
            column,
            operator,
            value,
            scope,
        )?
    };

    let mut subquery = Query::select();
    subquery
        .column((Alias::new(target), Alias::new(relation.remote_key())))
        .from(Alias::new(target))
        .and_where(inner);
    restrict_to_visible(&mut subquery, &**relation, scope);

    Some(column_ref(table, relation.local_key()).in_subquery(subquery))
}
