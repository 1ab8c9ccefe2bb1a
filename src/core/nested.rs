//! # Nested collection sync
//!
//! A parent payload may carry the full desired state of a child collection:
//!
//! ```json
//! {"name": "Harbour View", "version": 3, "units": [
//!     {"id": "…existing…", "label": "1A", "monthly_rent": 1450.0},
//!     {"label": "1C"}
//! ]}
//! ```
//!
//! Items with a known `id` are updated, items without one are created, and
//! existing children missing from the array are deleted. The diff itself is
//! pure ([`diff_children`]); [`sync_children`] applies it on the parent's
//! transaction.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, IdenStatic, QueryFilter};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::core::{CRUDResource, TenantScope, operations};
use crate::errors::ApiError;
use crate::validation::Validatable;

/// Changes needed to turn the stored children into the incoming ones.
#[derive(Debug, Default, PartialEq)]
pub struct ChildDiff {
    pub creates: Vec<Map<String, Value>>,
    pub updates: Vec<(Uuid, Map<String, Value>)>,
    pub deletes: Vec<Uuid>,
}

/// Outcome of a sync, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Compare stored child ids with an incoming collection.
///
/// # Errors
/// 422 when an item is not an object, its `id` is not a UUID, the id does not
/// belong to this parent, or the same id appears twice.
pub fn diff_children(existing: &[Uuid], incoming: Vec<Value>) -> Result<ChildDiff, ApiError> {
    let known: HashSet<Uuid> = existing.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut diff = ChildDiff::default();

    for (index, item) in incoming.into_iter().enumerate() {
        let Value::Object(mut fields) = item else {
            return Err(ApiError::validation_failed(vec![format!(
                "item {index}: expected an object"
            )]));
        };

        match fields.remove("id") {
            None | Some(Value::Null) => diff.creates.push(fields),
            Some(Value::String(raw)) => {
                let id = Uuid::parse_str(&raw).map_err(|_| {
                    ApiError::validation_failed(vec![format!("item {index}: invalid id '{raw}'")])
                })?;
                if !known.contains(&id) {
                    return Err(ApiError::validation_failed(vec![format!(
                        "item {index}: id {id} does not belong to this record"
                    )]));
                }
                if !seen.insert(id) {
                    return Err(ApiError::validation_failed(vec![format!(
                        "item {index}: id {id} appears more than once"
                    )]));
                }
                diff.updates.push((id, fields));
            }
            Some(_) => {
                return Err(ApiError::validation_failed(vec![format!(
                    "item {index}: id must be a string"
                )]));
            }
        }
    }

    diff.deletes = existing
        .iter()
        .filter(|id| !seen.contains(id))
        .copied()
        .collect();
    Ok(diff)
}

/// Reconcile the children of `parent_id` (linked through `foreign_key`) with
/// `incoming`. Run it on the same transaction as the parent write.
///
/// # Errors
/// Validation failures of any item (422), and whatever the underlying
/// create/update/delete operations return.
pub async fn sync_children<C, Conn>(
    conn: &Conn,
    scope: &TenantScope,
    parent_id: Uuid,
    foreign_key: C::ColumnType,
    incoming: Vec<Value>,
) -> Result<SyncReport, ApiError>
where
    C: CRUDResource,
    Conn: ConnectionTrait,
{
    let existing = C::EntityType::find()
        .filter(scope.visible::<C>(false)?)
        .filter(foreign_key.eq(parent_id))
        .all(conn)
        .await?
        .iter()
        .map(operations::model_id::<C>)
        .collect::<Result<Vec<_>, _>>()?;

    let diff = diff_children(&existing, incoming)?;
    let foreign_key_name = foreign_key.as_str();
    let mut report = SyncReport::default();

    for id in diff.deletes {
        operations::delete::<C, Conn>(conn, scope, id).await?;
        report.deleted += 1;
    }

    for (id, mut fields) in diff.updates {
        fields.remove("version");
        fields.remove(foreign_key_name);
        let update_model: C::UpdateModel = decode_child(fields)?;
        update_model.validate()?;
        operations::update_unchecked::<C, Conn>(conn, scope, id, update_model).await?;
        report.updated += 1;
    }

    for mut fields in diff.creates {
        fields.remove("version");
        fields.insert(
            foreign_key_name.to_string(),
            Value::String(parent_id.to_string()),
        );
        let create_model: C::CreateModel = decode_child(fields)?;
        create_model.validate()?;
        operations::create::<C, Conn>(conn, scope, create_model).await?;
        report.created += 1;
    }

    tracing::debug!(
        resource = C::RESOURCE_NAME_PLURAL,
        %parent_id,
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        "Synced nested collection"
    );
    Ok(report)
}

fn decode_child<M: serde::de::DeserializeOwned>(fields: Map<String, Value>) -> Result<M, ApiError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::validation_failed(vec![e.to_string()]))
}
