//! # Generic CRUD operations
//!
//! Free functions over any [`CRUDResource`]. They take any `ConnectionTrait`
//! so the route handlers can run them on a pooled connection or inside a
//! transaction shared with nested child writes.
//!
//! All of them apply the caller's [`TenantScope`]. Soft-deleted rows are
//! invisible except where `include_deleted` is passed explicitly.
//!
//! ## Optimistic locking
//!
//! For resources with a `VERSION_COLUMN`, [`update`] compares the version sent
//! by the client with the stored one and then writes with
//! `UPDATE … WHERE id = ? AND version = ?`, incrementing the counter. If another
//! writer got in between, no row matches and the update fails with 409.
//!
//! ## References
//!
//! Belongs-to keys written by [`create`] and [`update`] must point at a row the
//! caller can see: same tenant, not soft-deleted. Anything else is a 400, the
//! same answer an unknown id gets.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    IntoActiveModel, ModelTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Value,
    sea_query::{Alias, Expr, Query},
};
use uuid::Uuid;

use crate::core::{CRUDResource, MergeIntoActiveModel, TenantScope};
use crate::errors::ApiError;
use crate::filtering::paths::{column_ref, restrict_to_visible};
use crate::relations::RelationKind;

pub const INITIAL_VERSION: i32 = 1;

/// Everything `list` needs besides the connection and scope.
#[derive(Debug, Clone)]
pub struct ListQuery<C> {
    pub condition: Condition,
    pub order_column: C,
    pub order_direction: Order,
    pub offset: u64,
    pub limit: u64,
    pub include_deleted: bool,
}

/// Fetch one page of visible rows.
///
/// # Errors
/// Database failures, or a missing tenant for a tenant-scoped resource.
pub async fn list<T, C>(
    conn: &C,
    scope: &TenantScope,
    query: ListQuery<T::ColumnType>,
) -> Result<Vec<T>, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let models = T::EntityType::find()
        .filter(scope.visible::<T>(query.include_deleted)?)
        .filter(query.condition)
        .order_by(query.order_column, query.order_direction)
        .order_by(T::ID_COLUMN, Order::Asc)
        .offset(query.offset)
        .limit(query.limit)
        .all(conn)
        .await?;
    Ok(models.into_iter().map(Into::into).collect())
}

/// Count visible rows matching `condition`.
///
/// # Errors
/// Database failures, or a missing tenant for a tenant-scoped resource.
pub async fn count<T, C>(
    conn: &C,
    scope: &TenantScope,
    condition: Condition,
    include_deleted: bool,
) -> Result<u64, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let total = T::EntityType::find()
        .filter(scope.visible::<T>(include_deleted)?)
        .filter(condition)
        .count(conn)
        .await?;
    Ok(total)
}

/// Load the raw model of one visible row.
///
/// # Errors
/// 404 when the row is absent, in another tenant, or soft-deleted.
pub async fn fetch_model<T, C>(
    conn: &C,
    scope: &TenantScope,
    id: Uuid,
    include_deleted: bool,
) -> Result<T::ModelType, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    T::EntityType::find()
        .filter(scope.visible::<T>(include_deleted)?)
        .filter(T::ID_COLUMN.eq(id))
        .one(conn)
        .await?
        .ok_or_else(|| ApiError::not_found(T::RESOURCE_NAME_SINGULAR, Some(id.to_string())))
}

/// # Errors
/// See [`fetch_model`].
pub async fn get_one<T, C>(
    conn: &C,
    scope: &TenantScope,
    id: Uuid,
    include_deleted: bool,
) -> Result<T, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    Ok(fetch_model::<T, C>(conn, scope, id, include_deleted)
        .await?
        .into())
}

/// Insert a row. The tenant column is stamped from the scope and the version
/// starts at [`INITIAL_VERSION`], whatever the payload said.
///
/// # Errors
/// Missing tenant, constraint violations (409/400) and database failures.
pub async fn create<T, C>(
    conn: &C,
    scope: &TenantScope,
    create_model: T::CreateModel,
) -> Result<T::ModelType, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let tenant_id = scope.require::<T>()?;
    let mut active: T::ActiveModelType = create_model.into();

    if let (Some(column), Some(tenant_id)) = (T::TENANT_COLUMN, tenant_id) {
        active.set(column, tenant_id.into());
    }
    if let Some(column) = T::VERSION_COLUMN {
        active.set(column, INITIAL_VERSION.into());
    }
    check_references::<T, C>(conn, scope, &active, None).await?;

    let model = active.insert(conn).await?;
    tracing::info!(
        resource = T::RESOURCE_NAME_SINGULAR,
        id = %model_id::<T>(&model)?,
        "Created record"
    );
    Ok(model)
}

/// Apply a partial update guarded by the client's `expected_version`.
///
/// Versioned resources require `expected_version`; unversioned ones ignore it.
///
/// # Errors
/// - 404 when the row is not visible
/// - 400 when a versioned resource gets no version
/// - 409 when the version is stale or a concurrent writer won
pub async fn update<T, C>(
    conn: &C,
    scope: &TenantScope,
    id: Uuid,
    expected_version: Option<i32>,
    update_model: T::UpdateModel,
) -> Result<T::ModelType, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    if T::VERSION_COLUMN.is_some() && expected_version.is_none() {
        return Err(ApiError::bad_request(format!(
            "`version` is required to update a {}",
            T::RESOURCE_NAME_SINGULAR
        )));
    }
    apply_update::<T, C>(conn, scope, id, expected_version, update_model).await
}

/// Update without comparing against a client version. Used for nested
/// children, whose aggregate is guarded by the parent's version. The write is
/// still conditional on the version read here.
///
/// # Errors
/// 404 when the row is not visible, 409 on a concurrent write.
pub(crate) async fn update_unchecked<T, C>(
    conn: &C,
    scope: &TenantScope,
    id: Uuid,
    update_model: T::UpdateModel,
) -> Result<T::ModelType, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    apply_update::<T, C>(conn, scope, id, None, update_model).await
}

async fn apply_update<T, C>(
    conn: &C,
    scope: &TenantScope,
    id: Uuid,
    expected_version: Option<i32>,
    update_model: T::UpdateModel,
) -> Result<T::ModelType, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let existing = fetch_model::<T, C>(conn, scope, id, false).await?;

    let guard = match T::VERSION_COLUMN {
        Some(column) => {
            let current = read_version::<T>(&existing, column)?;
            if let Some(expected) = expected_version
                && expected != current
            {
                tracing::warn!(
                    resource = T::RESOURCE_NAME_SINGULAR,
                    %id,
                    expected,
                    current,
                    "Rejected stale update"
                );
                return Err(ApiError::conflict(format!(
                    "{} {id} has been modified: expected version {expected}, current version {current}",
                    T::RESOURCE_NAME_SINGULAR
                )));
            }
            Some((column, current))
        }
        None => None,
    };

    let mut active = update_model.merge_into_activemodel(existing.clone().into_active_model())?;
    let mut statement = T::EntityType::update_many()
        .filter(scope.visible::<T>(false)?)
        .filter(T::ID_COLUMN.eq(id));

    if let Some((column, current)) = guard {
        active.set(column, (current + 1).into());
        statement = statement.filter(column.eq(current));
    }

    if !active.is_changed() {
        return Ok(existing);
    }
    check_references::<T, C>(conn, scope, &active, Some(&existing)).await?;

    let result = statement.set(active).exec(conn).await?;
    if result.rows_affected == 0 {
        tracing::warn!(
            resource = T::RESOURCE_NAME_SINGULAR,
            %id,
            "Concurrent modification detected"
        );
        return Err(ApiError::conflict(format!(
            "{} {id} was modified concurrently, reload and retry",
            T::RESOURCE_NAME_SINGULAR
        )));
    }

    tracing::info!(resource = T::RESOURCE_NAME_SINGULAR, %id, "Updated record");
    fetch_model::<T, C>(conn, scope, id, false).await
}

/// Every belongs-to key set on `active` must reference a row visible to
/// `scope`. Keys still equal to `existing`'s are not looked up again.
async fn check_references<T, C>(
    conn: &C,
    scope: &TenantScope,
    active: &T::ActiveModelType,
    existing: Option<&T::ModelType>,
) -> Result<(), ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    for relation in T::relations() {
        if relation.kind() != RelationKind::BelongsTo {
            continue;
        }
        let Ok(column) = relation.local_key().parse::<T::ColumnType>() else {
            continue;
        };
        let ActiveValue::Set(Value::Uuid(Some(id))) = active.get(column) else {
            continue;
        };
        let id: Uuid = *id;
        if existing.is_some_and(|model| model.get(column) == Value::from(id)) {
            continue;
        }

        let target = relation.target_table();
        let mut select = Query::select();
        select
            .expr(Expr::val(1))
            .from(Alias::new(target))
            .and_where(column_ref(target, &relation.remote_key()).eq(id))
            .limit(1);
        restrict_to_visible(&mut select, &*relation, scope);

        let statement = conn.get_database_backend().build(&select);
        if conn.query_one(statement).await?.is_none() {
            tracing::debug!(
                resource = T::RESOURCE_NAME_SINGULAR,
                relation = relation.name(),
                %id,
                "Rejected reference to an invisible row"
            );
            return Err(ApiError::bad_request(format!(
                "{}: referenced {} {id} does not exist",
                relation.local_key(),
                relation.name()
            )));
        }
    }
    Ok(())
}

/// Delete a visible row: soft-deletable resources get their timestamp set
/// (and version bumped), others are removed.
///
/// # Errors
/// 404 when the row is absent or already deleted.
pub async fn delete<T, C>(conn: &C, scope: &TenantScope, id: Uuid) -> Result<Uuid, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let condition = scope.visible::<T>(false)?.add(T::ID_COLUMN.eq(id));
    match remove_matching::<T, C>(conn, condition).await? {
        0 => Err(ApiError::not_found(
            T::RESOURCE_NAME_SINGULAR,
            Some(id.to_string()),
        )),
        _ => {
            tracing::info!(
                resource = T::RESOURCE_NAME_SINGULAR,
                %id,
                soft = T::SOFT_DELETE_COLUMN.is_some(),
                "Deleted record"
            );
            Ok(id)
        }
    }
}

/// Delete every visible row among `ids`; returns the ids that were deleted.
///
/// # Errors
/// Database failures.
pub async fn delete_many<T, C>(
    conn: &C,
    scope: &TenantScope,
    ids: Vec<Uuid>,
) -> Result<Vec<Uuid>, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let condition = scope.visible::<T>(false)?.add(T::ID_COLUMN.is_in(ids));
    let matching = T::EntityType::find()
        .filter(condition.clone())
        .all(conn)
        .await?
        .iter()
        .map(model_id::<T>)
        .collect::<Result<Vec<_>, _>>()?;

    if !matching.is_empty() {
        let condition = scope
            .visible::<T>(false)?
            .add(T::ID_COLUMN.is_in(matching.clone()));
        remove_matching::<T, C>(conn, condition).await?;
    }
    Ok(matching)
}

/// Bring a soft-deleted row back.
///
/// # Errors
/// 404 when the row does not exist or is not deleted; 400 when the resource
/// does not support soft delete.
pub async fn restore<T, C>(
    conn: &C,
    scope: &TenantScope,
    id: Uuid,
) -> Result<T::ModelType, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let Some(deleted_at) = T::SOFT_DELETE_COLUMN else {
        return Err(ApiError::bad_request(format!(
            "{} records cannot be restored",
            T::RESOURCE_NAME_SINGULAR
        )));
    };

    let mut statement = T::EntityType::update_many()
        .col_expr(
            deleted_at,
            Expr::value(Option::<chrono::DateTime<Utc>>::None),
        )
        .filter(scope.visible::<T>(true)?)
        .filter(T::ID_COLUMN.eq(id))
        .filter(deleted_at.is_not_null());
    if let Some(version) = T::VERSION_COLUMN {
        statement = statement.col_expr(version, Expr::col(version).add(1));
    }

    if statement.exec(conn).await?.rows_affected == 0 {
        return Err(ApiError::not_found(
            format!("Deleted {}", T::RESOURCE_NAME_SINGULAR),
            Some(id.to_string()),
        ));
    }

    tracing::info!(resource = T::RESOURCE_NAME_SINGULAR, %id, "Restored record");
    fetch_model::<T, C>(conn, scope, id, false).await
}

async fn remove_matching<T, C>(conn: &C, condition: Condition) -> Result<u64, ApiError>
where
    T: CRUDResource,
    C: ConnectionTrait,
{
    let rows = match T::SOFT_DELETE_COLUMN {
        Some(deleted_at) => {
            let mut statement = T::EntityType::update_many()
                .col_expr(deleted_at, Expr::value(Utc::now()))
                .filter(condition);
            if let Some(version) = T::VERSION_COLUMN {
                statement = statement.col_expr(version, Expr::col(version).add(1));
            }
            statement.exec(conn).await?.rows_affected
        }
        None => {
            T::EntityType::delete_many()
                .filter(condition)
                .exec(conn)
                .await?
                .rows_affected
        }
    };
    Ok(rows)
}

/// Primary key of a model.
///
/// # Errors
/// The id column does not hold a UUID.
pub fn model_id<T: CRUDResource>(model: &T::ModelType) -> Result<Uuid, ApiError> {
    match model.get(T::ID_COLUMN) {
        Value::Uuid(Some(id)) => Ok(*id),
        other => Err(ApiError::internal(
            "Unexpected primary key value",
            Some(format!("{}: {other:?}", T::RESOURCE_NAME_SINGULAR)),
        )),
    }
}

fn read_version<T: CRUDResource>(
    model: &T::ModelType,
    column: T::ColumnType,
) -> Result<i32, ApiError> {
    match model.get(column) {
        Value::Int(Some(version)) => Ok(version),
        Value::BigInt(Some(version)) => i32::try_from(version)
            .map_err(|e| ApiError::internal("Version out of range", Some(e.to_string()))),
        other => Err(ApiError::internal(
            "Unexpected version value",
            Some(format!("{}: {other:?}", T::RESOURCE_NAME_SINGULAR)),
        )),
    }
}
