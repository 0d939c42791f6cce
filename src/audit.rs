//! Audit side-channel.
//!
//! Sinks are write-only. A failed write is logged and swallowed: it never fails
//! the operation that produced the event.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tracing::{info, warn};

use crate::models::OrganizationStatus;

pub const ENTITY_ORGANIZATION: &str = "organization";
/// `to_status` recorded for hard deletes.
pub const STATUS_DELETED: &str = "DELETED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SubmitForReview,
    Publish,
    Reject,
    Archive,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub from_status: String,
    pub to_status: String,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn organization(
        id: &str,
        action: AuditAction,
        from: OrganizationStatus,
        to: &str,
        performed_by: &str,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type: ENTITY_ORGANIZATION.to_string(),
            entity_id: id.to_string(),
            action,
            from_status: from.to_string(),
            to_status: to.to_string(),
            performed_by: performed_by.to_string(),
            performed_at,
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<()>;
}

/// Fire-and-forget write.
pub async fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(e) = sink.record(&event).await {
        warn!(
            error = %e,
            entity_id = %event.entity_id,
            action = %event.action,
            "failed to record audit event"
        );
    }
}

// ── TracingAuditSink ──

/// Writes events to the log only.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        info!(
            target: "audit",
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            action = %event.action,
            from = %event.from_status,
            to = %event.to_status,
            performed_by = %event.performed_by,
            "audit"
        );
        Ok(())
    }
}

// ── MemoryAuditSink ──

#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent write fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(anyhow!("audit sink unavailable"));
        }
        self.events
            .write()
            .map_err(|e| anyhow!("Lock: {}", e))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> AuditEvent {
        AuditEvent::organization(
            "acme",
            AuditAction::Delete,
            OrganizationStatus::Draft,
            STATUS_DELETED,
            "admin",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn memory_sink_records() {
        let sink = MemoryAuditSink::new();
        emit(&sink, event()).await;
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from_status, "DRAFT");
        assert_eq!(events[0].action.as_ref(), "DELETE");
        assert_eq!(events[0].entity_type, "organization");
    }

    #[tokio::test]
    async fn emit_swallows_failures() {
        let sink = MemoryAuditSink::new();
        sink.set_failing(true);
        emit(&sink, event()).await;
        assert!(sink.events().is_empty());
    }
}
