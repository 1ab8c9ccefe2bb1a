//! # Relations
//!
//! A resource lists its relations in [`CRUDResource::relations`]. Each one is a
//! [`RelationDef`] pointing at another resource and is used three ways:
//!
//! - **filtering**: `{"units.tenant_contact.name": "Ada"}` walks the relation
//!   graph (see [`crate::filtering::paths`])
//! - **expansion**: `?expand=units.tenant_contact` embeds related records in
//!   the JSON output; `auto_expand` relations are always embedded on `get_one`
//! - **nested writes**: `writable` has-many relations accept the child
//!   collection in create/update payloads (see [`crate::core::nested`])
//!
//! ```rust,ignore
//! fn relations() -> Vec<Arc<dyn Relation>> {
//!     vec![
//!         RelationDef::<Unit>::has_many("units", unit::Column::PropertyId).writable().into_arc(),
//!         RelationDef::<Contact>::belongs_to("owner", "owner_id").auto_expand().into_arc(),
//!     ]
//! }
//! ```

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, IdenStatic, QueryFilter,
    QueryOrder,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{CRUDResource, SyncReport, TenantScope, nested};
use crate::errors::ApiError;
use crate::filtering::operators::ColumnKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// This record holds the foreign key; expands to one object or `null`
    BelongsTo,
    /// The related records hold the foreign key; expands to an array
    HasMany,
}

/// Object-safe view of a relation, so resources with different target types
/// can be listed together.
#[async_trait]
pub trait Relation: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> RelationKind;
    /// Column on the owning table joined against [`Relation::remote_key`]
    fn local_key(&self) -> &'static str;
    /// Column on the target table
    fn remote_key(&self) -> String;
    fn target_table(&self) -> &'static str;
    fn target_tenant_key(&self) -> Option<String>;
    fn target_soft_delete_key(&self) -> Option<String>;
    /// Target columns that may appear at the end of a dotted filter path
    fn target_filterable(&self) -> Vec<(String, ColumnKind)>;
    fn target_relations(&self) -> Vec<Arc<dyn Relation>>;
    fn is_writable(&self) -> bool;
    fn is_auto_expand(&self) -> bool;

    /// Embed the related records into each of `rows`, then expand `nested`
    /// paths on the embedded records.
    async fn expand(
        &self,
        db: &DatabaseConnection,
        scope: &TenantScope,
        rows: &mut [Value],
        nested: &[String],
    ) -> Result<(), ApiError>;

    /// Reconcile the children of `parent_id` with `items`.
    async fn sync(
        &self,
        txn: &DatabaseTransaction,
        scope: &TenantScope,
        parent_id: Uuid,
        items: Vec<Value>,
    ) -> Result<SyncReport, ApiError>;
}

/// Relation to resource `C`.
pub struct RelationDef<C: CRUDResource> {
    name: &'static str,
    kind: RelationKind,
    local_key: &'static str,
    remote_key: C::ColumnType,
    writable: bool,
    auto_expand: bool,
    target: PhantomData<fn() -> C>,
}

impl<C: CRUDResource> RelationDef<C> {
    /// `local_key` on this table references `C`'s id.
    #[must_use]
    pub fn belongs_to(name: &'static str, local_key: &'static str) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo,
            local_key,
            remote_key: C::ID_COLUMN,
            writable: false,
            auto_expand: false,
            target: PhantomData,
        }
    }

    /// `foreign_key` on `C` references this table's `id`.
    #[must_use]
    pub fn has_many(name: &'static str, foreign_key: C::ColumnType) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany,
            local_key: "id",
            remote_key: foreign_key,
            writable: false,
            auto_expand: false,
            target: PhantomData,
        }
    }

    /// Accept the child collection in create/update payloads. Has-many only.
    #[must_use]
    pub fn writable(mut self) -> Self {
        self.writable = self.kind == RelationKind::HasMany;
        self
    }

    #[must_use]
    pub fn auto_expand(mut self) -> Self {
        self.auto_expand = true;
        self
    }

    #[must_use]
    pub fn into_arc(self) -> Arc<dyn Relation> {
        Arc::new(self)
    }
}

#[async_trait]
impl<C: CRUDResource> Relation for RelationDef<C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> RelationKind {
        self.kind
    }

    fn local_key(&self) -> &'static str {
        self.local_key
    }

    fn remote_key(&self) -> String {
        self.remote_key.as_str().to_string()
    }

    fn target_table(&self) -> &'static str {
        C::TABLE_NAME
    }

    fn target_tenant_key(&self) -> Option<String> {
        C::TENANT_COLUMN.map(|column| column.as_str().to_string())
    }

    fn target_soft_delete_key(&self) -> Option<String> {
        C::SOFT_DELETE_COLUMN.map(|column| column.as_str().to_string())
    }

    fn target_filterable(&self) -> Vec<(String, ColumnKind)> {
        let enums = C::enum_columns();
        let mut columns: Vec<(String, ColumnKind)> = C::filterable_columns()
            .into_iter()
            .map(|(name, column)| (name.to_string(), ColumnKind::of(column, &enums)))
            .collect();
        columns.push((C::ID_COLUMN.as_str().to_string(), ColumnKind::Uuid));
        columns
    }

    fn target_relations(&self) -> Vec<Arc<dyn Relation>> {
        C::relations()
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn is_auto_expand(&self) -> bool {
        self.auto_expand
    }

    async fn expand(
        &self,
        db: &DatabaseConnection,
        scope: &TenantScope,
        rows: &mut [Value],
        nested: &[String],
    ) -> Result<(), ApiError> {
        let mut keys: Vec<Uuid> = rows
            .iter()
            .filter_map(|row| row.get(self.local_key))
            .filter_map(Value::as_str)
            .filter_map(|raw| Uuid::parse_str(raw).ok())
            .collect();
        keys.sort_unstable();
        keys.dedup();

        let mut related = Vec::new();
        if !keys.is_empty() {
            let (order_column, order_direction) = C::default_sort();
            let models = C::EntityType::find()
                .filter(scope.visible::<C>(false)?)
                .filter(self.remote_key.is_in(keys))
                .order_by(order_column, order_direction)
                .order_by_asc(C::ID_COLUMN)
                .all(db)
                .await?;
            for model in models {
                let resource: C = model.into();
                related.push(serde_json::to_value(&resource).map_err(|e| {
                    ApiError::internal("Failed to serialize record", Some(e.to_string()))
                })?);
            }
        }

        let target_relations = C::relations();
        expand_paths(&target_relations, db, scope, &mut related, nested).await?;

        let remote_key = self.remote_key();
        for row in rows.iter_mut() {
            let key = row.get(self.local_key).filter(|key| !key.is_null()).cloned();
            let mut matching = related
                .iter()
                .filter(|candidate| key.is_some() && candidate.get(remote_key.as_str()) == key.as_ref());
            let embedded = match self.kind {
                RelationKind::BelongsTo => matching.next().cloned().unwrap_or(Value::Null),
                RelationKind::HasMany => Value::Array(matching.cloned().collect()),
            };
            if let Some(fields) = row.as_object_mut() {
                fields.insert(self.name.to_string(), embedded);
            }
        }
        Ok(())
    }

    async fn sync(
        &self,
        txn: &DatabaseTransaction,
        scope: &TenantScope,
        parent_id: Uuid,
        items: Vec<Value>,
    ) -> Result<SyncReport, ApiError> {
        if !self.writable {
            return Err(ApiError::bad_request(format!(
                "`{}` cannot be written through its parent",
                self.name
            )));
        }
        nested::sync_children::<C, DatabaseTransaction>(txn, scope, parent_id, self.remote_key, items)
            .await
    }
}

/// Expand dotted `paths` (`units`, `units.tenant_contact`) on `rows`.
///
/// # Errors
/// 400 when a path names a relation that does not exist.
pub fn expand_paths<'a>(
    relations: &'a [Arc<dyn Relation>],
    db: &'a DatabaseConnection,
    scope: &'a TenantScope,
    rows: &'a mut [Value],
    paths: &'a [String],
) -> Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send + 'a>> {
    Box::pin(async move {
        if rows.is_empty() || paths.is_empty() {
            return Ok(());
        }

        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for path in paths {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path.as_str(), None),
            };
            let nested = grouped.entry(head).or_default();
            if let Some(rest) = rest
                && !rest.is_empty()
            {
                nested.push(rest.to_string());
            }
        }

        for (name, nested) in grouped {
            let relation = relations
                .iter()
                .find(|relation| relation.name() == name)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown relation '{name}'")))?;
            relation.expand(db, scope, rows, &nested).await?;
        }
        Ok(())
    })
}

/// Parse `expand=units,units.tenant_contact , supplier` into trimmed paths.
#[must_use]
pub fn parse_expand(expand: Option<&str>) -> Vec<String> {
    expand
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Requested paths plus the names of auto-expanded relations, deduplicated.
#[must_use]
pub fn with_auto_expand(relations: &[Arc<dyn Relation>], mut paths: Vec<String>) -> Vec<String> {
    for relation in relations.iter().filter(|relation| relation.is_auto_expand()) {
        if !paths.iter().any(|path| path == relation.name()) {
            paths.push(relation.name().to_string());
        }
    }
    paths
}
