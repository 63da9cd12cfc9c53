//! Audit entry types for Bastion.

mod action;
mod entry;
mod id;

pub use action::AuditAction;
pub use entry::{AuditEntry, AuditEntryBuilder, UNKNOWN};
pub use id::AuditEntryId;
