//! Audit recording for successful mutating operations.

pub mod context;
pub mod layer;
pub mod trail;

pub use context::AuditContext;
pub use layer::{AuditLayer, AuditMiddleware};
pub use trail::AuditTrail;
