//! Storage ports
//!
//! The workflow services talk to record stores only through these traits.
//! The in-memory stores in `safelive-store` are the shipping implementation;
//! a document database can slot in behind the same seams.
//!
//! Incident and ticket writes are whole-record: services load a record,
//! mutate it, and `put` it back. Only the OTP port exposes finer-grained
//! atomic operations, because code verification must not lose concurrent
//! attempt counts.

use crate::audit::AuditLogEntry;
use crate::ids::{ChallengeId, IncidentId, TicketId, UserId};
use crate::incident::Incident;
use crate::otp::{DeliveryRecord, OtpChallenge, OtpPurpose};
use crate::roles::UserRole;
use crate::status::TicketStatus;
use crate::ticket::Ticket;
use crate::user::UserAccount;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage-layer failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert collided with an existing record
    #[error("duplicate record: {0}")]
    Duplicate(String),

    /// An atomic operation targeted a record that no longer exists
    #[error("missing record: {0}")]
    Missing(String),

    /// Backend unavailable or corrupt
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Citizen-facing incident records
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Insert a new incident
    async fn insert(&self, incident: Incident) -> Result<(), StoreError>;

    /// Fetch by id
    async fn get(&self, id: IncidentId) -> Result<Option<Incident>, StoreError>;

    /// Replace the whole record
    async fn put(&self, incident: Incident) -> Result<(), StoreError>;

    /// Delete by id; returns whether a record existed
    async fn delete(&self, id: IncidentId) -> Result<bool, StoreError>;

    /// All incidents, newest first
    async fn list(&self) -> Result<Vec<Incident>, StoreError>;

    /// Incidents reported by one account, newest first
    async fn list_by_reporter(&self, reporter: UserId) -> Result<Vec<Incident>, StoreError>;

    /// Look up a sensor-sourced incident by its dedup key
    async fn find_by_event(
        &self,
        device_id: &str,
        event_id: &str,
    ) -> Result<Option<Incident>, StoreError>;
}

/// Internal ticket records
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Insert a new ticket
    async fn insert(&self, ticket: Ticket) -> Result<(), StoreError>;

    /// Fetch by id
    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Fetch the ticket mirroring an incident
    async fn get_by_incident(&self, incident_id: IncidentId) -> Result<Option<Ticket>, StoreError>;

    /// Replace the whole record
    async fn put(&self, ticket: Ticket) -> Result<(), StoreError>;

    /// Delete by id; returns whether a record existed
    async fn delete(&self, id: TicketId) -> Result<bool, StoreError>;

    /// All tickets, newest first
    async fn list(&self) -> Result<Vec<Ticket>, StoreError>;

    /// Tickets in one status, newest first
    async fn list_by_status(&self, status: TicketStatus) -> Result<Vec<Ticket>, StoreError>;
}

/// OTP challenge records with the atomic primitives verification needs
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Insert a new challenge
    async fn insert(&self, challenge: OtpChallenge) -> Result<(), StoreError>;

    /// Fetch by id
    async fn get(&self, id: ChallengeId) -> Result<Option<OtpChallenge>, StoreError>;

    /// The most recently issued challenge for a (user, purpose) pair
    async fn latest_for(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>, StoreError>;

    /// Mark every still-active challenge for the pair as used.
    /// Returns how many were invalidated.
    async fn invalidate_active(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Record one channel's delivery outcome on a challenge
    async fn record_delivery(
        &self,
        id: ChallengeId,
        record: DeliveryRecord,
    ) -> Result<(), StoreError>;

    /// Atomically bump the attempt counter; returns the new count
    async fn increment_attempts(&self, id: ChallengeId) -> Result<u32, StoreError>;

    /// Compare-and-set used=true. Returns false if the challenge was
    /// already consumed, so exactly one concurrent verifier wins.
    async fn mark_used_if_unused(
        &self,
        id: ChallengeId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Drop expired challenges; returns how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Append-only audit logbook
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError>;

    /// Entries for one ticket, newest first
    async fn for_ticket(&self, ticket_id: TicketId) -> Result<Vec<AuditLogEntry>, StoreError>;
}

/// Account directory
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account
    async fn insert(&self, user: UserAccount) -> Result<(), StoreError>;

    /// Fetch by id
    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;

    /// All accounts holding one role
    async fn list_by_role(&self, role: UserRole) -> Result<Vec<UserAccount>, StoreError>;
}
