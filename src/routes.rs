//! Generic axum handlers for any [`CRUDResource`] and the router that mounts them.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use hyper::HeaderMap;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{CRUDResource, ListQuery, TenantScope, operations};
use crate::errors::ApiError;
use crate::filtering::{apply_filters, calculate_content_range, parse_pagination, parse_sorting};
use crate::models::{ExpandOptions, FilterOptions};
use crate::relations::{Relation, expand_paths, parse_expand, with_auto_expand};
use crate::validation::Validatable;

/// A decoded write payload: the resource's own fields, the optimistic-lock
/// version and the child collections of writable relations.
struct WritePayload {
    fields: Map<String, Value>,
    version: Option<i32>,
    nested: Vec<(Arc<dyn Relation>, Vec<Value>)>,
}

impl WritePayload {
    fn split<T: CRUDResource>(payload: Value) -> Result<Self, ApiError> {
        let Value::Object(mut fields) = payload else {
            return Err(ApiError::validation_failed(vec![
                "Expected a JSON object".to_string(),
            ]));
        };

        let version = match fields.remove("version") {
            None | Some(Value::Null) => None,
            Some(Value::Number(number)) => Some(
                number
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| {
                        ApiError::validation_failed(vec![
                            "version: must be an integer".to_string(),
                        ])
                    })?,
            ),
            Some(_) => {
                return Err(ApiError::validation_failed(vec![
                    "version: must be an integer".to_string(),
                ]));
            }
        };

        let mut nested = Vec::new();
        for relation in T::relations() {
            let Some(value) = fields.remove(relation.name()) else {
                continue;
            };
            // Embedded read-only relations (e.g. an expanded `supplier`) are dropped
            if !relation.is_writable() {
                continue;
            }
            match value {
                Value::Array(items) => nested.push((relation, items)),
                _ => {
                    return Err(ApiError::validation_failed(vec![format!(
                        "{}: must be an array",
                        relation.name()
                    )]));
                }
            }
        }

        Ok(Self {
            fields,
            version,
            nested,
        })
    }

    fn decode<M: DeserializeOwned + Validatable>(&self) -> Result<M, ApiError> {
        let model: M = serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| ApiError::validation_failed(vec![e.to_string()]))?;
        model.validate()?;
        Ok(model)
    }

    fn nested_names(&self) -> Vec<String> {
        self.nested
            .iter()
            .map(|(relation, _)| relation.name().to_string())
            .collect()
    }
}

fn to_json<T: CRUDResource>(items: &[T]) -> Result<Vec<Value>, ApiError> {
    items
        .iter()
        .map(|item| {
            serde_json::to_value(item)
                .map_err(|e| ApiError::internal("Failed to serialize record", Some(e.to_string())))
        })
        .collect()
}

/// Load one record and embed the given relation paths.
async fn render_one<T: CRUDResource>(
    db: &DatabaseConnection,
    scope: &TenantScope,
    id: Uuid,
    paths: &[String],
    include_deleted: bool,
) -> Result<Value, ApiError> {
    let item: T = operations::get_one::<T, _>(db, scope, id, include_deleted).await?;
    let mut rows = to_json(std::slice::from_ref(&item))?;
    expand_paths(&T::relations(), db, scope, &mut rows, paths).await?;
    rows.pop()
        .ok_or_else(|| ApiError::internal("Record vanished while rendering", None))
}

/// List records with filtering, sorting, pagination and optional expansion.
///
/// Responds with a `Content-Range` header: `<plural> <start>-<end>/<total>`,
/// or `<plural> */<total>` when the page is empty.
///
/// # Errors
/// 400 for a missing tenant or an unknown relation in `expand`.
pub async fn get_all<T: CRUDResource>(
    Query(params): Query<FilterOptions>,
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
) -> Result<(HeaderMap, Json<Vec<Value>>), ApiError> {
    let (offset, limit) = parse_pagination(&params);
    let condition = apply_filters::<T>(params.filter.as_deref(), &scope);
    let (order_column, order_direction) = parse_sorting::<T>(&params);
    let include_deleted = params.include_deleted.unwrap_or(false);

    let items: Vec<T> = operations::list::<T, _>(
        &db,
        &scope,
        ListQuery {
            condition: condition.clone(),
            order_column,
            order_direction,
            offset,
            limit,
            include_deleted,
        },
    )
    .await?;
    let total_count = operations::count::<T, _>(&db, &scope, condition, include_deleted).await?;

    let mut rows = to_json(&items)?;
    let paths = parse_expand(params.expand.as_deref());
    expand_paths(&T::relations(), &db, &scope, &mut rows, &paths).await?;

    let headers = calculate_content_range(offset, limit, total_count, T::RESOURCE_NAME_PLURAL);
    Ok((headers, Json(rows)))
}

/// Get one record. Auto-expanded relations are always embedded.
///
/// # Errors
/// 404 when the record is not visible to the tenant.
pub async fn get_one<T: CRUDResource>(
    Path(id): Path<Uuid>,
    Query(params): Query<ExpandOptions>,
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
) -> Result<Json<Value>, ApiError> {
    let paths = with_auto_expand(&T::relations(), parse_expand(params.expand.as_deref()));
    let item = render_one::<T>(
        &db,
        &scope,
        id,
        &paths,
        params.include_deleted.unwrap_or(false),
    )
    .await?;
    Ok(Json(item))
}

/// Create a record together with the children of its writable relations.
///
/// # Errors
/// 422 for invalid payloads, 409 for unique violations.
pub async fn create_one<T: CRUDResource>(
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let payload = WritePayload::split::<T>(payload)?;
    let create_model: T::CreateModel = payload.decode()?;
    let paths = with_auto_expand(&T::relations(), payload.nested_names());

    let txn = db.begin().await?;
    let model = operations::create::<T, _>(&txn, &scope, create_model).await?;
    let id = operations::model_id::<T>(&model)?;
    for (relation, items) in payload.nested {
        relation.sync(&txn, &scope, id, items).await?;
    }
    txn.commit().await?;

    let item = render_one::<T>(&db, &scope, id, &paths, false).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Partially update a record, guarded by its `version`, and sync any nested
/// collections in the same transaction.
///
/// # Errors
/// 400 without a version, 409 on a stale version, 422 for invalid payloads.
pub async fn update_one<T: CRUDResource>(
    Path(id): Path<Uuid>,
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let payload = WritePayload::split::<T>(payload)?;
    let update_model: T::UpdateModel = payload.decode()?;
    let paths = with_auto_expand(&T::relations(), payload.nested_names());

    let txn = db.begin().await?;
    operations::update::<T, _>(&txn, &scope, id, payload.version, update_model).await?;
    for (relation, items) in payload.nested {
        relation.sync(&txn, &scope, id, items).await?;
    }
    txn.commit().await?;

    Ok(Json(render_one::<T>(&db, &scope, id, &paths, false).await?))
}

/// Delete a record (soft or hard, depending on the resource).
///
/// # Errors
/// 404 when the record is absent or already deleted.
pub async fn delete_one<T: CRUDResource>(
    Path(id): Path<Uuid>,
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
) -> Result<StatusCode, ApiError> {
    operations::delete::<T, _>(&db, &scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete many records; responds with the ids that were actually deleted.
///
/// # Errors
/// Database failures.
pub async fn delete_many<T: CRUDResource>(
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
    Json(ids): Json<Vec<Uuid>>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
    let deleted = operations::delete_many::<T, _>(&db, &scope, ids).await?;
    Ok(Json(deleted))
}

/// # Errors
/// 404 when the record is not soft-deleted, 400 when `T` has no soft delete.
pub async fn restore_one<T: CRUDResource>(
    Path(id): Path<Uuid>,
    State(db): State<DatabaseConnection>,
    scope: TenantScope,
) -> Result<Json<Value>, ApiError> {
    operations::restore::<T, _>(&db, &scope, id).await?;
    let paths = with_auto_expand(&T::relations(), Vec::new());
    Ok(Json(render_one::<T>(&db, &scope, id, &paths, false).await?))
}

/// All CRUD endpoints for `T`, to be nested under its collection path.
#[must_use]
pub fn crud_router<T: CRUDResource>() -> Router<DatabaseConnection> {
    Router::new()
        .route(
            "/",
            get(get_all::<T>)
                .post(create_one::<T>)
                .delete(delete_many::<T>),
        )
        .route(
            "/{id}",
            get(get_one::<T>)
                .put(update_one::<T>)
                .delete(delete_one::<T>),
        )
        .route("/{id}/restore", post(restore_one::<T>))
}
