// Generic CRUD engine: the resource contract, tenant scoping, the operations
// themselves and nested collection sync.

pub mod nested;
pub mod operations;
pub mod scope;
pub mod traits;

pub use nested::{ChildDiff, SyncReport, diff_children, sync_children};
pub use operations::ListQuery;
pub use scope::{TENANT_HEADER, TenantScope};
pub use traits::{CRUDResource, MergeIntoActiveModel};
