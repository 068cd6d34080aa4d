//! In-memory incident repository

use async_trait::async_trait;
use dashmap::DashMap;
use safelive_core::repo::{IncidentRepository, StoreError};
use safelive_core::{Incident, IncidentId, UserId};

/// Incident collection backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryIncidents {
    map: DashMap<IncidentId, Incident>,
}

impl MemoryIncidents {
    /// Empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored incidents
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn sorted_newest_first(mut records: Vec<Incident>) -> Vec<Incident> {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        records
    }
}

#[async_trait]
impl IncidentRepository for MemoryIncidents {
    async fn insert(&self, incident: Incident) -> Result<(), StoreError> {
        if self.map.contains_key(&incident.id) {
            return Err(StoreError::Duplicate(format!("incident {}", incident.id)));
        }
        self.map.insert(incident.id, incident);
        Ok(())
    }

    async fn get(&self, id: IncidentId) -> Result<Option<Incident>, StoreError> {
        Ok(self.map.get(&id).map(|entry| entry.clone()))
    }

    async fn put(&self, incident: Incident) -> Result<(), StoreError> {
        self.map.insert(incident.id, incident);
        Ok(())
    }

    async fn delete(&self, id: IncidentId) -> Result<bool, StoreError> {
        Ok(self.map.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<Incident>, StoreError> {
        let records = self.map.iter().map(|entry| entry.clone()).collect();
        Ok(Self::sorted_newest_first(records))
    }

    async fn list_by_reporter(&self, reporter: UserId) -> Result<Vec<Incident>, StoreError> {
        let records = self
            .map
            .iter()
            .filter(|entry| entry.reporter_id == Some(reporter))
            .map(|entry| entry.clone())
            .collect();
        Ok(Self::sorted_newest_first(records))
    }

    async fn find_by_event(
        &self,
        device_id: &str,
        event_id: &str,
    ) -> Result<Option<Incident>, StoreError> {
        Ok(self
            .map
            .iter()
            .find(|entry| {
                entry.device_id.as_deref() == Some(device_id)
                    && entry.event_id.as_deref() == Some(event_id)
            })
            .map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn insert_then_get_and_duplicate_rejected() {
        let store = MemoryIncidents::new();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let incident = Incident::new("Leak", "Pipe burst", "water", "Main St", now);
        let id = incident.id;

        store.insert(incident.clone()).await.unwrap();
        assert!(store.get(id).await.unwrap().is_some());
        assert!(matches!(
            store.insert(incident).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let store = MemoryIncidents::new();
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        for offset in 0..3 {
            let at = base + Duration::minutes(offset);
            store
                .insert(Incident::new(
                    format!("Incident {offset}"),
                    "d",
                    "road",
                    "loc",
                    at,
                ))
                .await
                .unwrap();
        }
        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].title, "Incident 2");
        assert_eq!(listed[2].title, "Incident 0");
    }

    #[tokio::test]
    async fn find_by_event_matches_dedup_key() {
        let store = MemoryIncidents::new();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let mut incident = Incident::new("Sensor alert", "High water level", "water", "Dam", now);
        incident.device_id = Some("dev-1".into());
        incident.event_id = Some("evt-9".into());
        store.insert(incident).await.unwrap();

        assert!(store.find_by_event("dev-1", "evt-9").await.unwrap().is_some());
        assert!(store.find_by_event("dev-1", "evt-8").await.unwrap().is_none());
        assert!(store.find_by_event("dev-2", "evt-9").await.unwrap().is_none());
    }
}
