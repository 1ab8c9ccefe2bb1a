use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, Order, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::unit::{self, Unit};
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::relations;
use crate::validation::{Validatable, ValidationErrors, validators};

pub const KINDS: &[&str] = &["residential", "commercial", "mixed"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "properties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub tenant_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    #[sea_orm(column_type = "Text")]
    pub city: String,
    #[sea_orm(column_type = "Text")]
    pub kind: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A managed building or site. Its units can be written through it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub kind: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Model> for Property {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            address: model.address,
            city: model.city,
            kind: model.kind,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

fn default_kind() -> String {
    "residential".to_string()
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct PropertyCreate {
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(default = "default_kind")]
    pub kind: String,
}

impl From<PropertyCreate> for ActiveModel {
    fn from(create: PropertyCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            name: Set(create.name.trim().to_string()),
            address: Set(create.address),
            city: Set(create.city.trim().to_string()),
            kind: Set(create.kind),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

impl Validatable for PropertyCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("name", &self.name));
        errors.check(validators::validate_required("address", &self.address));
        errors.check(validators::validate_required("city", &self.city));
        errors.check(validators::validate_one_of("kind", &self.kind, KINDS));
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct PropertyUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub kind: Option<String>,
}

impl MergeIntoActiveModel<ActiveModel> for PropertyUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = Set(name.trim().to_string());
        }
        if let Some(address) = self.address {
            existing.address = Set(address);
        }
        if let Some(city) = self.city {
            existing.city = Set(city.trim().to_string());
        }
        if let Some(kind) = self.kind {
            existing.kind = Set(kind);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for PropertyUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
        ] {
            if let Some(value) = value {
                errors.check(validators::validate_required(field, value));
            }
        }
        if let Some(kind) = &self.kind {
            errors.check(validators::validate_one_of("kind", kind, KINDS));
        }
        errors.result()
    }
}

impl CRUDResource for Property {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = PropertyCreate;
    type UpdateModel = PropertyUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "property";
    const RESOURCE_NAME_PLURAL: &'static str = "properties";
    const TABLE_NAME: &'static str = "properties";
    const RESOURCE_DESCRIPTION: &'static str = "Managed buildings and their rentable units";

    const TENANT_COLUMN: Option<Self::ColumnType> = Some(Column::TenantId);
    const VERSION_COLUMN: Option<Self::ColumnType> = Some(Column::Version);
    const SOFT_DELETE_COLUMN: Option<Self::ColumnType> = Some(Column::DeletedAt);

    fn default_sort() -> (Self::ColumnType, Order) {
        (Column::Name, Order::Asc)
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("city", Column::City),
            ("kind", Column::Kind),
            ("created_at", Column::CreatedAt),
            ("updated_at", Column::UpdatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("address", Column::Address),
            ("city", Column::City),
            ("kind", Column::Kind),
            ("deleted_at", Column::DeletedAt),
        ]
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["address"]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("name", Column::Name),
            ("address", Column::Address),
            ("city", Column::City),
        ]
    }

    fn relations() -> Vec<Arc<dyn relations::Relation>> {
        vec![
            relations::RelationDef::<Unit>::has_many("units", unit::Column::PropertyId)
                .writable()
                .into_arc(),
        ]
    }
}
