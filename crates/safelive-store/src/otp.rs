//! In-memory OTP challenge repository
//!
//! The attempt counter and the used flag mutate under the map's shard lock,
//! so concurrent verifiers observe a consistent count and exactly one of
//! them can consume a code. Whole-record `put` is deliberately absent from
//! the port for this collection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use safelive_core::repo::{OtpRepository, StoreError};
use safelive_core::{ChallengeId, DeliveryRecord, OtpChallenge, OtpPurpose, UserId};

/// OTP challenge collection backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryOtpChallenges {
    map: DashMap<ChallengeId, OtpChallenge>,
}

impl MemoryOtpChallenges {
    /// Empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored challenges, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl OtpRepository for MemoryOtpChallenges {
    async fn insert(&self, challenge: OtpChallenge) -> Result<(), StoreError> {
        if self.map.contains_key(&challenge.id) {
            return Err(StoreError::Duplicate(format!("challenge {}", challenge.id)));
        }
        self.map.insert(challenge.id, challenge);
        Ok(())
    }

    async fn get(&self, id: ChallengeId) -> Result<Option<OtpChallenge>, StoreError> {
        Ok(self.map.get(&id).map(|entry| entry.clone()))
    }

    async fn latest_for(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>, StoreError> {
        Ok(self
            .map
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.purpose == purpose)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)))
            .map(|entry| entry.clone()))
    }

    async fn invalidate_active(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut invalidated = 0;
        for mut entry in self.map.iter_mut() {
            if entry.user_id == user_id && entry.purpose == purpose && entry.is_active(now) {
                entry.used = true;
                entry.used_at = Some(now);
                invalidated += 1;
            }
        }
        Ok(invalidated)
    }

    async fn record_delivery(
        &self,
        id: ChallengeId,
        record: DeliveryRecord,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .map
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("challenge {id}")))?;
        entry.deliveries.push(record);
        Ok(())
    }

    async fn increment_attempts(&self, id: ChallengeId) -> Result<u32, StoreError> {
        let mut entry = self
            .map
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("challenge {id}")))?;
        entry.attempts += 1;
        Ok(entry.attempts)
    }

    async fn mark_used_if_unused(
        &self,
        id: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut entry = self
            .map
            .get_mut(&id)
            .ok_or_else(|| StoreError::Missing(format!("challenge {id}")))?;
        if entry.used {
            return Ok(false);
        }
        entry.used = true;
        entry.used_at = Some(now);
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.map.len();
        self.map.retain(|_, challenge| challenge.expires_at > now);
        Ok(before - self.map.len())
    }
}
