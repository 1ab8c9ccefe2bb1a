use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, DeriveActiveEnum, Order, entity::prelude::*};
use sea_orm_migration::sea_query::StringLen;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::contact::Contact;
use super::property::Property;
use crate::core::{CRUDResource, MergeIntoActiveModel};
use crate::relations;
use crate::validation::{Validatable, ValidationErrors, validators};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[sea_orm(string_value = "vacant")]
    Vacant,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "let")]
    Let,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "units")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub tenant_id: Uuid,
    #[sea_orm(indexed)]
    pub property_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub label: String,
    pub floor: i32,
    pub monthly_rent: f64,
    pub status: UnitStatus,
    #[sea_orm(nullable)]
    pub tenant_contact_id: Option<Uuid>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::property::Entity",
        from = "Column::PropertyId",
        to = "super::property::Column::Id"
    )]
    Property,
    #[sea_orm(
        belongs_to = "super::contact::Entity",
        from = "Column::TenantContactId",
        to = "super::contact::Column::Id"
    )]
    TenantContact,
}

impl ActiveModelBehavior for ActiveModel {}

/// A rentable unit of a property, optionally let to a contact.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Unit {
    pub id: Uuid,
    pub property_id: Uuid,
    pub label: String,
    pub floor: i32,
    pub monthly_rent: f64,
    pub status: UnitStatus,
    pub tenant_contact_id: Option<Uuid>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Model> for Unit {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            property_id: model.property_id,
            label: model.label,
            floor: model.floor,
            monthly_rent: model.monthly_rent,
            status: model.status,
            tenant_contact_id: model.tenant_contact_id,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct UnitCreate {
    pub property_id: Uuid,
    pub label: String,
    #[serde(default)]
    pub floor: i32,
    #[serde(default)]
    pub monthly_rent: f64,
    pub status: Option<UnitStatus>,
    pub tenant_contact_id: Option<Uuid>,
}

impl From<UnitCreate> for ActiveModel {
    fn from(create: UnitCreate) -> Self {
        let now = Utc::now();
        Self {
            id: Set(Uuid::new_v4()),
            property_id: Set(create.property_id),
            label: Set(create.label.trim().to_string()),
            floor: Set(create.floor),
            monthly_rent: Set(create.monthly_rent),
            status: Set(create.status.unwrap_or(UnitStatus::Vacant)),
            tenant_contact_id: Set(create.tenant_contact_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
    }
}

fn check_unit_fields(
    errors: &mut ValidationErrors,
    label: Option<&str>,
    floor: Option<i32>,
    monthly_rent: Option<f64>,
) {
    if let Some(label) = label {
        errors.check(validators::validate_required("label", label));
        errors.check(validators::validate_length("label", label, None, Some(50)));
    }
    if let Some(floor) = floor {
        errors.check(validators::validate_range("floor", floor, Some(-10), Some(300)));
    }
    if let Some(rent) = monthly_rent {
        errors.check(validators::validate_range("monthly_rent", rent, Some(0.0), None));
    }
}

impl Validatable for UnitCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_unit_fields(
            &mut errors,
            Some(&self.label),
            Some(self.floor),
            Some(self.monthly_rent),
        );
        errors.result()
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct UnitUpdate {
    pub property_id: Option<Uuid>,
    pub label: Option<String>,
    pub floor: Option<i32>,
    pub monthly_rent: Option<f64>,
    pub status: Option<UnitStatus>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub tenant_contact_id: Option<Option<Uuid>>,
}

impl MergeIntoActiveModel<ActiveModel> for UnitUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(property_id) = self.property_id {
            existing.property_id = Set(property_id);
        }
        if let Some(label) = self.label {
            existing.label = Set(label.trim().to_string());
        }
        if let Some(floor) = self.floor {
            existing.floor = Set(floor);
        }
        if let Some(monthly_rent) = self.monthly_rent {
            existing.monthly_rent = Set(monthly_rent);
        }
        if let Some(status) = self.status {
            existing.status = Set(status);
        }
        if let Some(tenant_contact_id) = self.tenant_contact_id {
            existing.tenant_contact_id = Set(tenant_contact_id);
        }
        existing.updated_at = Set(Utc::now());
        Ok(existing)
    }
}

impl Validatable for UnitUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_unit_fields(
            &mut errors,
            self.label.as_deref(),
            self.floor,
            self.monthly_rent,
        );
        errors.result()
    }
}

impl CRUDResource for Unit {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = UnitCreate;
    type UpdateModel = UnitUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const RESOURCE_NAME_SINGULAR: &'static str = "unit";
    const RESOURCE_NAME_PLURAL: &'static str = "units";
    const TABLE_NAME: &'static str = "units";

    const TENANT_COLUMN: Option<Self::ColumnType> = Some(Column::TenantId);
    const VERSION_COLUMN: Option<Self::ColumnType> = Some(Column::Version);
    const SOFT_DELETE_COLUMN: Option<Self::ColumnType> = Some(Column::DeletedAt);

    fn default_sort() -> (Self::ColumnType, Order) {
        (Column::Label, Order::Asc)
    }

    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("label", Column::Label),
            ("floor", Column::Floor),
            ("monthly_rent", Column::MonthlyRent),
            ("status", Column::Status),
            ("created_at", Column::CreatedAt),
        ]
    }

    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![
            ("id", Column::Id),
            ("property_id", Column::PropertyId),
            ("label", Column::Label),
            ("floor", Column::Floor),
            ("monthly_rent", Column::MonthlyRent),
            ("status", Column::Status),
            ("tenant_contact_id", Column::TenantContactId),
            ("deleted_at", Column::DeletedAt),
        ]
    }

    fn enum_columns() -> Vec<&'static str> {
        vec!["status"]
    }

    fn searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("label", Column::Label)]
    }

    fn relations() -> Vec<Arc<dyn relations::Relation>> {
        vec![
            relations::RelationDef::<Property>::belongs_to("property", "property_id").into_arc(),
            relations::RelationDef::<Contact>::belongs_to("tenant_contact", "tenant_contact_id")
                .into_arc(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(UnitStatus::Maintenance).unwrap(),
            serde_json::json!("maintenance")
        );
    }

    #[test]
    fn test_create_defaults_and_validation() {
        let create: UnitCreate = serde_json::from_value(serde_json::json!({
            "property_id": Uuid::new_v4(),
            "label": "1A"
        }))
        .unwrap();
        assert_eq!(create.floor, 0);
        assert!(create.status.is_none());
        assert!(create.validate().is_ok());

        let negative: UnitCreate = serde_json::from_value(serde_json::json!({
            "property_id": Uuid::new_v4(),
            "label": "",
            "monthly_rent": -1.0
        }))
        .unwrap();
        let errors = negative.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
