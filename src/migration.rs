use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entities::{contact, order_line, property, purchase_order, unit};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateBackofficeTables)]
    }
}

pub struct CreateBackofficeTables;

impl MigrationName for CreateBackofficeTables {
    fn name(&self) -> &'static str {
        "m20260101_000001_create_backoffice_tables"
    }
}

async fn create_from_entity<E: EntityTrait>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr> {
    let schema = Schema::new(manager.get_database_backend());

    let mut table = schema.create_table_from_entity(entity);
    manager.create_table(table.if_not_exists().to_owned()).await?;

    for mut index in schema.create_index_from_entity(entity) {
        manager.create_index(index.if_not_exists().to_owned()).await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl MigrationTrait for CreateBackofficeTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Referenced tables first
        create_from_entity(manager, contact::Entity).await?;
        create_from_entity(manager, property::Entity).await?;
        create_from_entity(manager, unit::Entity).await?;
        create_from_entity(manager, purchase_order::Entity).await?;
        create_from_entity(manager, order_line::Entity).await?;

        // References are unique per tenant, soft-deleted orders included
        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_tenant_reference")
                    .table(purchase_order::Entity)
                    .col(purchase_order::Column::TenantId)
                    .col(purchase_order::Column::Reference)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(order_line::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(purchase_order::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(unit::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(property::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(contact::Entity).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
