//! SafeLive Core - shared domain model
//!
//! The entity types, status machines, and ports every other SafeLive crate
//! builds on:
//! - Incident and Ticket records with the two-record synchronization fields
//! - Role and status enums with lenient label parsing
//! - The critical-approval and OTP challenge records
//! - Repository, notification gateway, clock, and prediction oracle ports
//! - The built-in keyword heuristic oracle
//!
//! # Example
//!
//! ```rust,ignore
//! use safelive_core::{Incident, Ticket, TicketStatus};
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let incident = Incident::new("Water leak", "Pipe burst", "water", "Main St", now);
//! let ticket = Ticket::from_incident(&incident, now);
//! assert_eq!(ticket.status, TicketStatus::Open);
//! ```

#![warn(unreachable_pub)]

pub mod approval;
pub mod audit;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod incident;
pub mod oracle;
pub mod otp;
pub mod repo;
pub mod roles;
pub mod status;
pub mod ticket;
pub mod user;

// Re-exports for convenience
pub use approval::{ApprovalRecipient, ApprovalState, CriticalApproval, ReviewDecision};
pub use audit::AuditLogEntry;
pub use error::{ErrorKind, WorkflowError};
pub use gateway::{
    Clock, EmailTemplate, LoggingGateway, NotificationGateway, SendError, SmsTemplate, SystemClock,
};
pub use ids::{ChallengeId, IncidentId, TicketId, UserId};
pub use incident::{AiPriority, Incident, IngestionMeta, ProgressStamp};
pub use oracle::{
    HeuristicOracle, OracleError, PredictionOracle, PriorityInput, PriorityPrediction,
    ProgressPrediction, MIN_ORACLE_CONFIDENCE,
};
pub use otp::{DeliveryRecord, OtpChallenge, OtpPurpose};
pub use repo::{
    AuditLogRepository, IncidentRepository, OtpRepository, StoreError, TicketRepository,
    UserRepository,
};
pub use roles::UserRole;
pub use status::{IncidentStatus, Priority, Severity, TicketStatus};
pub use ticket::{Assignee, ReopenStamp, ReopenWarning, Ticket, TicketNote};
pub use user::UserAccount;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the SafeLive domain model
    pub use crate::{
        AuditLogEntry, Clock, Incident, IncidentId, IncidentStatus, NotificationGateway,
        OtpChallenge, OtpPurpose, PredictionOracle, Priority, Ticket, TicketId, TicketStatus,
        UserAccount, UserId, UserRole, WorkflowError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
