use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, DeriveActiveEnum, Order, entity::prelude::*};
use sea_orm_migration::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::contact::Contact;
use super::order_line::{self, OrderLine};
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::relations;
use crate::validation::{Validatable, ValidationErrors, validators};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub tenant_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub reference: String,
    pub status: PurchaseOrderStatus,
    #[sea_orm(indexed)]
    pub supplier_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contact::Entity",
        from = "Column::SupplierId",
        to = "super::contact::Column::Id"
    )]
    Supplier,
}

impl ActiveModelBehavior for ActiveModel {}

/// A procurement order placed with a supplier contact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub reference: String,
    pub status: PurchaseOrderStatus,
    pub supplier_id: Uuid,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Model> for PurchaseOrder {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            reference: model.reference,
            status: model.status,
            supplier_id: model.supplier_id,
            notes: model.notes,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct PurchaseOrderCreate {
    pub reference: String,
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Uuid,
    pub notes: Option<String>,
}

impl From<PurchaseOrderCreate> for ActiveModel {
    fn from(create: PurchaseOrderCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            reference: Set(create.reference.trim().to_string()),
            status: Set(create.status.unwrap_or(PurchaseOrderStatus::Draft)),
            supplier_id: Set(create.supplier_id),
            notes: Set(create.notes),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

impl Validatable for PurchaseOrderCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("reference", &self.reference));
        errors.check(validators::validate_length("reference", &self.reference, None, Some(64)));
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct PurchaseOrderUpdate {
    pub reference: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<Uuid>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for PurchaseOrderUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(reference) = self.reference {
            existing.reference = Set(reference.trim().to_string());
        }
        if let Some(status) = self.status {
            existing.status = Set(status);
        }
        if let Some(supplier_id) = self.supplier_id {
            existing.supplier_id = Set(supplier_id);
        }
        if let Some(notes) = self.notes {
            existing.notes = Set(notes);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for PurchaseOrderUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(reference) = &self.reference {
            errors.check(validators::validate_required("reference", reference));
            errors.check(validators::validate_length("reference", reference, None, Some(64)));
        }
        errors.result()
    }
}

impl CRUDResource for PurchaseOrder {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = PurchaseOrderCreate;
    type UpdateModel = PurchaseOrderUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "purchase order";
    const RESOURCE_NAME_PLURAL: &'static str = "purchase_orders";
    const TABLE_NAME: &'static str = "purchase_orders";
    const RESOURCE_DESCRIPTION: &'static str = "Supplier orders with their order lines";

    const TENANT_COLUMN: Option<Self::ColumnType> = Some(Column::TenantId);
    const VERSION_COLUMN: Option<Self::ColumnType> = Some(Column::Version);
    const SOFT_DELETE_COLUMN: Option<Self::ColumnType> = Some(Column::DeletedAt);

    fn default_sort() -> (Self::ColumnType, Order) {
        (Column::CreatedAt, Order::Desc)
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("reference", Column::Reference),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
            ("updated_at", Column::UpdatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("reference", Column::Reference),
            ("status", Column::Status),
            ("supplier_id", Column::SupplierId),
            ("notes", Column::Notes),
            ("deleted_at", Column::DeletedAt),
        ]
    }

    fn enum_columns() -> Vec<&'static str> {
        vec!["status"]
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["notes"]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("reference", Column::Reference), ("notes", Column::Notes)]
    }

    fn relations() -> Vec<Arc<dyn relations::Relation>> {
        vec![
            relations::RelationDef::<Contact>::belongs_to("supplier", "supplier_id")
                .auto_expand()
                .into_arc(),
            relations::RelationDef::<OrderLine>::has_many(
                "lines",
                order_line::Column::PurchaseOrderId,
            )
            .writable()
            .into_arc(),
        ]
    }
}
