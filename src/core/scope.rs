//! Tenant scoping.
//!
//! Every request names its tenant in the `X-Tenant-ID` header. Resources that
//! declare a `TENANT_COLUMN` are only ever read and written within that tenant;
//! rows of other tenants are indistinguishable from missing rows.

use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

use crate::core::CRUDResource;
use crate::errors::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: Option<Uuid>,
}

impl TenantScope {
    #[must_use]
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
        }
    }

    /// A scope without a tenant; only usable with resources that have no
    /// tenant column.
    #[must_use]
    pub fn unscoped() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    /// The tenant that rows of `T` must belong to, or `None` when `T` is not
    /// tenant-scoped.
    ///
    /// # Errors
    /// `T` is tenant-scoped and the request carried no tenant.
    pub fn require<T: CRUDResource>(&self) -> Result<Option<Uuid>, ApiError> {
        match (T::TENANT_COLUMN, self.tenant_id) {
            (None, _) => Ok(None),
            (Some(_), Some(tenant_id)) => Ok(Some(tenant_id)),
            (Some(_), None) => Err(ApiError::bad_request(format!(
                "The {TENANT_HEADER} header is required for {}",
                T::RESOURCE_NAME_PLURAL
            ))),
        }
    }

    /// Rows of `T` visible to this scope: same tenant, and not soft-deleted
    /// unless `include_deleted`.
    ///
    /// # Errors
    /// See [`TenantScope::require`].
    pub fn visible<T: CRUDResource>(&self, include_deleted: bool) -> Result<Condition, ApiError> {
        let mut condition = Condition::all();
        if let (Some(column), Some(tenant_id)) = (T::TENANT_COLUMN, self.require::<T>()?) {
            condition = condition.add(column.eq(tenant_id));
        }
        if !include_deleted && let Some(column) = T::SOFT_DELETE_COLUMN {
            condition = condition.add(column.is_null());
        }
        Ok(condition)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for TenantScope {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(TENANT_HEADER) else {
            return Ok(Self::unscoped());
        };

        let tenant_id = header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| {
                ApiError::bad_request(format!("The {TENANT_HEADER} header must be a UUID"))
            })?;

        Ok(Self::tenant(tenant_id))
    }
}
