use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::purchase_order::PurchaseOrder;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::relations;
use crate::validation::{Validatable, ValidationErrors, validators};

// Lines belong to their order: no version of their own and no soft delete.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub tenant_id: Uuid,
    #[sea_orm(indexed)]
    pub purchase_order_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct OrderLine {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Model> for OrderLine {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            purchase_order_id: model.purchase_order_id,
            description: model.description,
            quantity: model.quantity,
            unit_price: model.unit_price,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn default_quantity() -> i32 {
    1
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct OrderLineCreate {
    pub purchase_order_id: Uuid,
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: f64,
}

impl From<OrderLineCreate> for ActiveModel {
    fn from(create: OrderLineCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(create.purchase_order_id),
            description: Set(create.description.trim().to_string()),
            quantity: Set(create.quantity),
            unit_price: Set(create.unit_price),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
    }
}

impl Validatable for OrderLineCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(validators::validate_required("description", &self.description));
        errors.check(validators::validate_range("quantity", self.quantity, Some(1), None));
        errors.check(validators::validate_range("unit_price", self.unit_price, Some(0.0), None));
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct OrderLineUpdate {
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<f64>,
}

impl MergeIntoActiveModel<ActiveModel> for OrderLineUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(description) = self.description {
            existing.description = Set(description.trim().to_string());
        }
        if let Some(quantity) = self.quantity {
            existing.quantity = Set(quantity);
        }
        if let Some(unit_price) = self.unit_price {
            existing.unit_price = Set(unit_price);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for OrderLineUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(description) = &self.description {
            errors.check(validators::validate_required("description", description));
        }
        if let Some(quantity) = self.quantity {
            errors.check(validators::validate_range("quantity", quantity, Some(1), None));
        }
        if let Some(unit_price) = self.unit_price {
            errors.check(validators::validate_range("unit_price", unit_price, Some(0.0), None));
        }
        errors.result()
    }
}

impl CRUDResource for OrderLine {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = OrderLineCreate;
    type UpdateModel = OrderLineUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "order line";
    const RESOURCE_NAME_PLURAL: &'static str = "order_lines";
    const TABLE_NAME: &'static str = "order_lines";

    const TENANT_COLUMN: Option<Self::ColumnType> = Some(Column::TenantId);

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("description", Column::Description),
            ("quantity", Column::Quantity),
            ("unit_price", Column::UnitPrice),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("purchase_order_id", Column::PurchaseOrderId),
            ("description", Column::Description),
            ("quantity", Column::Quantity),
            ("unit_price", Column::UnitPrice),
        ]
    }

    fn like_filterable_columns() -> Vec<&'static str> {
        vec!["description"]
    }

    fn relations() -> Vec<Arc<dyn relations::Relation>> {
        vec![
            relations::RelationDef::<PurchaseOrder>::belongs_to("purchase_order", "purchase_order_id")
                .into_arc(),
        ]
    }
}
