//! Audit capture and persistence for Bastion.
//!
//! Gates and the post-response recorder hand finished entries to an
//! [`AuditCapture`]. The handle never blocks and never reports failure to
//! its caller. A single background writer drains the channel into an
//! [`AuditSink`], logging and dropping entries the sink rejects.

mod capture;
mod sink;
mod writer;

pub use capture::{ActorClock, AuditCapture, CaptureConfig};
pub use sink::{AuditSink, AuditSinkError, JsonLinesAuditSink, MemoryAuditSink};
pub use writer::{audit_writer_loop, spawn_writer};

// Re-export types for convenience
pub use bastion_audit_types::{AuditAction, AuditEntry, AuditEntryBuilder};
