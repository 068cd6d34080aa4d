//! In-memory audit logbook
//!
//! Entries append per ticket in arrival order; reads return them reversed.
//! There is no update or delete surface.

use async_trait::async_trait;
use dashmap::DashMap;
use safelive_core::repo::{AuditLogRepository, StoreError};
use safelive_core::{AuditLogEntry, TicketId};

/// Append-only logbook backed by a concurrent map of per-ticket vectors
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    map: DashMap<TicketId, Vec<AuditLogEntry>>,
}

impl MemoryAuditLog {
    /// Empty logbook
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across all tickets
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.iter().map(|entry| entry.len()).sum()
    }

    /// Whether the logbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditLogRepository for MemoryAuditLog {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        self.map.entry(entry.ticket_id).or_default().push(entry);
        Ok(())
    }

    async fn for_ticket(&self, ticket_id: TicketId) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self
            .map
            .get(&ticket_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}
