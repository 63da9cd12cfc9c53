//! Authorization gates: role sets and named permissions.

pub mod layer;
pub mod registry;

pub use layer::{AuthzLayer, AuthzMiddleware};
pub use registry::{Decision, Permission, PermissionTable, RegistryError};
