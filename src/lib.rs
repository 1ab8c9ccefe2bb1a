//! # backoffice
//!
//! Data-access core of a multi-tenant back-office suite (property management,
//! CRM, procurement). Every resource is served by one generic CRUD engine:
//!
//! - tenant scoping through the `X-Tenant-ID` header
//! - optimistic locking on a version counter
//! - soft delete with restore
//! - nested child collections written through their parent
//! - JSON filters with operators and dotted relation paths
//! - relation expansion in responses
//!
//! A resource is a Sea-ORM entity plus a [`CRUDResource`] implementation; see
//! [`entities`] for the built-in ones and [`routes::crud_router`] for the
//! endpoints each gets.

pub mod app;
pub mod config;
pub mod core;
pub mod entities;
pub mod errors;
pub mod filtering;
pub mod migration;
pub mod models;
pub mod relations;
pub mod routes;
pub mod telemetry;
pub mod validation;

pub use crate::core::{CRUDResource, MergeIntoActiveModel, TenantScope};
pub use errors::ApiError;
pub use models::{ExpandOptions, FilterOptions};
pub use relations::{Relation, RelationDef, RelationKind};
pub use validation::{Validatable, ValidationError, ValidationErrors};
