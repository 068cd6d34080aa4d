//! SafeLive Store - in-memory record collections
//!
//! Concurrent-map implementations of the repository ports in
//! `safelive-core`:
//! - Incident, ticket, account, and audit collections with whole-record
//!   upsert semantics
//! - An OTP collection whose attempt counter and used flag mutate under the
//!   shard lock, giving the verification path its atomic primitives
//! - Maintenance sweeps for orphaned tickets and expired challenges
//!
//! A document database can replace this crate behind the same ports.

#![warn(unreachable_pub)]

pub mod audit;
pub mod incidents;
pub mod maintenance;
pub mod otp;
pub mod tickets;
pub mod users;

pub use audit::MemoryAuditLog;
pub use incidents::MemoryIncidents;
pub use maintenance::{purge_orphan_tickets, sweep_expired_challenges};
pub use otp::MemoryOtpChallenges;
pub use tickets::MemoryTickets;
pub use users::MemoryUsers;

use std::sync::Arc;

/// All five collections wired together, for the demo binary and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Incident collection
    pub incidents: Arc<MemoryIncidents>,
    /// Ticket collection
    pub tickets: Arc<MemoryTickets>,
    /// OTP challenge collection
    pub otp: Arc<MemoryOtpChallenges>,
    /// Audit logbook
    pub audit: Arc<MemoryAuditLog>,
    /// Account directory
    pub users: Arc<MemoryUsers>,
}

impl MemoryStore {
    /// Fresh empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
