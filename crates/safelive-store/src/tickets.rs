//! In-memory ticket repository

use async_trait::async_trait;
use dashmap::DashMap;
use safelive_core::repo::{StoreError, TicketRepository};
use safelive_core::{IncidentId, Ticket, TicketId, TicketStatus};

/// Ticket collection backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryTickets {
    map: DashMap<TicketId, Ticket>,
}

impl MemoryTickets {
    /// Empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn sorted_newest_first(mut records: Vec<Ticket>) -> Vec<Ticket> {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        records
    }
}

#[async_trait]
impl TicketRepository for MemoryTickets {
    async fn insert(&self, ticket: Ticket) -> Result<(), StoreError> {
        if self.map.contains_key(&ticket.id) {
            return Err(StoreError::Duplicate(format!("ticket {}", ticket.id)));
        }
        self.map.insert(ticket.id, ticket);
        Ok(())
    }

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.map.get(&id).map(|entry| entry.clone()))
    }

    async fn get_by_incident(&self, incident_id: IncidentId) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .map
            .iter()
            .find(|entry| entry.incident_id == incident_id)
            .map(|entry| entry.clone()))
    }

    async fn put(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.map.insert(ticket.id, ticket);
        Ok(())
    }

    async fn delete(&self, id: TicketId) -> Result<bool, StoreError> {
        Ok(self.map.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<Ticket>, StoreError> {
        let records = self.map.iter().map(|entry| entry.clone()).collect();
        Ok(Self::sorted_newest_first(records))
    }

    async fn list_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>, StoreError> {
        let records = self
            .map
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| entry.clone())
            .collect();
        Ok(Self::sorted_newest_first(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use safelive_core::Incident;

    #[tokio::test]
    async fn lookup_by_incident_id() {
        let store = MemoryTickets::new();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let incident = Incident::new("Leak", "d", "water", "loc", now);
        let ticket = Ticket::from_incident(&incident, now);
        let ticket_id = ticket.id;
        store.insert(ticket).await.unwrap();

        let found = store.get_by_incident(incident.id).await.unwrap().unwrap();
        assert_eq!(found.id, ticket_id);
        assert!(store
            .get_by_incident(safelive_core::IncidentId::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let store = MemoryTickets::new();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        for status in [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Open] {
            let incident = Incident::new("T", "d", "road", "loc", now);
            let mut ticket = Ticket::from_incident(&incident, now);
            ticket.status = status;
            store.insert(ticket).await.unwrap();
        }
        assert_eq!(
            store.list_by_status(TicketStatus::Open).await.unwrap().len(),
            2
        );
        assert_eq!(
            store
                .list_by_status(TicketStatus::Resolved)
                .await
                .unwrap()
                .len(),
            0
        );
    }
}
