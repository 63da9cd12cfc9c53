use async_trait::async_trait;
use bastion_audit_capture::{
    spawn_writer, AuditAction, AuditCapture, AuditEntry, AuditSink, AuditSinkError, CaptureConfig,
    MemoryAuditSink,
};
use bastion_common_core::{Role, UserId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Sink that rejects every other append.
#[derive(Default)]
struct FlakySink {
    calls: AtomicUsize,
    stored: MemoryAuditSink,
}

#[async_trait]
impl AuditSink for FlakySink {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditSinkError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n % 2 == 0 {
            return Err(AuditSinkError::Unavailable("database offline".into()));
        }
        self.stored.append(entry).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditSinkError> {
        self.stored.recent(limit).await
    }
}

fn entry(actor: UserId, action: AuditAction) -> AuditEntry {
    AuditEntry::builder(action, "posts", actor, Role::Editor).build()
}

#[tokio::test]
async fn test_writer_persists_in_submission_order() {
    let sink = Arc::new(MemoryAuditSink::new());
    let (capture, rx) = AuditCapture::new(CaptureConfig::default());
    let writer = spawn_writer(rx, sink.clone());

    let actor = UserId::new();
    capture.record(entry(actor, AuditAction::CreatePost));
    capture.record(entry(actor, AuditAction::UpdatePost));
    capture.record(entry(actor, AuditAction::DeletePost));
    drop(capture);
    writer.await.unwrap();

    let stored = sink.entries().await;
    let actions: Vec<_> = stored.iter().map(|e| e.action.clone()).collect();
    assert_eq!(
        actions,
        vec![AuditAction::CreatePost, AuditAction::UpdatePost, AuditAction::DeletePost]
    );
    assert!(stored.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn test_writer_survives_sink_failures_without_retry() {
    let sink = Arc::new(FlakySink::default());
    let (capture, rx) = AuditCapture::new(CaptureConfig::default());
    let writer = spawn_writer(rx, sink.clone());

    let actor = UserId::new();
    for _ in 0..4 {
        capture.record(entry(actor, AuditAction::CreatePost));
    }
    drop(capture);
    writer.await.unwrap();

    assert_eq!(sink.calls.load(Ordering::SeqCst), 4);
    assert_eq!(sink.stored.len().await, 2);
}
