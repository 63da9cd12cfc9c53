//! Bastion common core types.

pub mod id;
pub mod role;

pub use id::{IdParseError, ResourceId, UserId};
pub use role::Role;
