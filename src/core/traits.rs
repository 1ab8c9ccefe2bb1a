use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, FromQueryResult,
    IntoActiveModel, ModelTrait, Order,
};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::relations::Relation;
use crate::validation::Validatable;

pub trait MergeIntoActiveModel<ActiveModelType> {
    /// Merge this partial update into an existing active model. Fields absent
    /// from the payload stay `Unchanged`.
    ///
    /// # Errors
    ///
    /// Returns a `DbErr` if a value cannot be converted.
    fn merge_into_activemodel(self, existing: ActiveModelType) -> Result<ActiveModelType, DbErr>;
}

/// Declarative description of an API resource backed by a `SeaORM` entity.
///
/// Implementing this trait is all the generic operations in
/// [`crate::core::operations`], the filter engine and [`crate::routes::crud_router`]
/// need. The optional columns switch engine features on:
///
/// - `TENANT_COLUMN`: rows are scoped to the `X-Tenant-ID` of the request
/// - `VERSION_COLUMN`: updates require the current version (optimistic locking)
/// - `SOFT_DELETE_COLUMN`: deletes stamp a timestamp instead of removing the row
///
/// The tenant column must hold a `Uuid`, the version column an `i32` and the
/// soft-delete column an optional UTC timestamp.
pub trait CRUDResource: Serialize + Sized + Send + Sync + 'static {
    type EntityType: EntityTrait<Model = Self::ModelType, Column = Self::ColumnType> + Sync;
    type ModelType: ModelTrait<Entity = Self::EntityType>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModelType>
        + Into<Self>
        + Send
        + Sync;
    type ColumnType: ColumnTrait + Copy + std::fmt::Debug + Send + Sync;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType>
        + ActiveModelBehavior
        + Send
        + Sync;
    type CreateModel: Into<Self::ActiveModelType> + DeserializeOwned + Validatable + Send;
    type UpdateModel: MergeIntoActiveModel<Self::ActiveModelType>
        + DeserializeOwned
        + Validatable
        + Send
        + Sync;

    const ID_COLUMN: Self::ColumnType;
    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;
    const TABLE_NAME: &'static str;
    const RESOURCE_DESCRIPTION: &'static str = "";

    const TENANT_COLUMN: Option<Self::ColumnType> = None;
    const VERSION_COLUMN: Option<Self::ColumnType> = None;
    const SOFT_DELETE_COLUMN: Option<Self::ColumnType> = None;

    /// Ordering used when the request does not name a sort column
    #[must_use]
    fn default_sort() -> (Self::ColumnType, Order) {
        (Self::ID_COLUMN, Order::Asc)
    }

    #[must_use]
    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    #[must_use]
    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    /// String columns whose plain `{"column": "value"}` filter means substring
    /// match rather than case-insensitive equality.
    #[must_use]
    fn like_filterable_columns() -> Vec<&'static str> {
        vec![]
    }

    /// Columns holding enum values. They are compared as text and never
    /// substring-matched by a plain filter.
    #[must_use]
    fn enum_columns() -> Vec<&'static str> {
        vec![]
    }

    /// Columns searched by the free-text `q` filter.
    #[must_use]
    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![]
    }

    /// Relations available for dotted-path filters, `expand` and nested writes.
    #[must_use]
    fn relations() -> Vec<Arc<dyn Relation>> {
        Vec::new()
    }
}
