use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, Order, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::validation::{Validatable, ValidationErrors, validators};

pub const KINDS: &[&str] = &["person", "company", "supplier", "tenant"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub tenant_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub company: Option<String>,
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

/// A CRM contact: a person or organisation the back office deals with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub kind: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Model> for Contact {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            company: model.company,
            kind: model.kind,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

fn default_kind() -> String {
    "person".to_string()
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ContactCreate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: String,
}

impl From<ContactCreate> for ActiveModel {
    fn from(create: ContactCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            name: Set(create.name.trim().to_string()),
            email: Set(create.email),
            phone: Set(create.phone),
            company: Set(create.company),
            kind: Set(create.kind),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

impl Validatable for ContactCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("name", &self.name));
        errors.check(validators::validate_length("name", &self.name, Some(1), Some(200)));
        if let Some(email) = &self.email {
            errors.check(validators::validate_email("email", email));
        }
        errors.check(validators::validate_one_of("kind", &self.kind, KINDS));
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct ContactUpdate {
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub company: Option<Option<String>>,
    pub kind: Option<String>,
}

impl MergeIntoActiveModel<ActiveModel> for ContactUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = Set(name.trim().to_string());
        }
        if let Some(email) = self.email {
            existing.email = Set(email);
        }
        if let Some(phone) = self.phone {
            existing.phone = Set(phone);
        }
        if let Some(company) = self.company {
            existing.company = Set(company);
        }
        if let Some(kind) = self.kind {
            existing.kind = Set(kind);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for ContactUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            errors.check(validators::validate_required("name", name));
        }
        if let Some(Some(email)) = &self.email {
            errors.check(validators::validate_email("email", email));
        }
        if let Some(kind) = &self.kind {
            errors.check(validators::validate_one_of("kind", kind, KINDS));
        }
        errors.result()
    }
}

impl CRUDResource for Contact {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = ContactCreate;
    type UpdateModel = ContactUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "contact";
    const RESOURCE_NAME_PLURAL: &'static str = "contacts";
    const TABLE_NAME: &'static str = "contacts";
    const RESOURCE_DESCRIPTION: &'static str = "People and organisations: tenants, suppliers, owners";

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
            ("email", Column::Email),
            ("company", Column::Company),
            ("kind", Column::Kind),
            ("created_at", Column::CreatedAt),
            ("updated_at", Column::UpdatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("name", Column::Name),
            ("email", Column::Email),
            ("phone", Column::Phone),
            ("company", Column::Company),
            ("kind", Column::Kind),
            ("created_at", Column::CreatedAt),
            ("deleted_at", Column::DeletedAt),
        ]
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["company"]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("name", Column::Name),
            ("email", Column::Email),
            ("company", Column::Company),
        ]
    }
}
