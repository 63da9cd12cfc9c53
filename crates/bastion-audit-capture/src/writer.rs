//! Background persistence of captured entries.

use crate::AuditSink;
use bastion_audit_types::AuditEntry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Drain captured entries into the sink until every capture handle is gone.
///
/// Entries are written one at a time in submission order. A failed append is
/// logged and the entry is dropped; it is never retried.
pub async fn audit_writer_loop(mut receiver: mpsc::Receiver<AuditEntry>, sink: Arc<dyn AuditSink>) {
    while let Some(entry) = receiver.recv().await {
        let id = entry.id;
        let action = entry.action.clone();
        let actor = entry.actor_id;
        let correlation_id = entry.correlation_id.clone().unwrap_or_default();

        match sink.append(entry).await {
            Ok(()) => debug!(entry_id = %id, action = %action, "Audit entry persisted"),
            Err(err) => error!(
                entry_id = %id,
                action = %action,
                actor = %actor,
                correlation_id = %correlation_id,
                error = %err,
                "Audit logging failed"
            ),
        }
    }

    debug!("Audit channel closed, writer stopping");
}

/// Spawn the writer loop on the current runtime.
pub fn spawn_writer(
    receiver: mpsc::Receiver<AuditEntry>,
    sink: Arc<dyn AuditSink>,
) -> JoinHandle<()> {
    tokio::spawn(audit_writer_loop(receiver, sink))
}
