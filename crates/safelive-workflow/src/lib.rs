//! SafeLive Workflow - incident intake and ticket lifecycle
//!
//! The engine behind the reporting surface:
//! - Citizen and sensor intake, with idempotent device retries
//! - The role-gated ticket status machine, including the department-only
//!   reopen path and its power shifts
//! - Worker assignment and field progress updates with oracle scoring
//! - The critical-incident review gate with single-use one-click tokens
//! - Ticket-to-incident field synchronization after every transition
//!
//! # Example
//!
//! ```rust,ignore
//! use safelive_workflow::{CitizenReport, IntakeService};
//!
//! let incident = intake.report_citizen(report, &reporter).await?;
//! assert!(incident.ticket_id.is_some());
//! ```

#![warn(unreachable_pub)]

pub mod actions;
pub mod approval;
pub mod config;
pub mod intake;
pub mod lifecycle;
pub mod sync;

mod notify;
mod predict;

pub use approval::{ApprovalService, RecipientTokens, ReviewOutcome};
pub use config::WorkflowConfig;
pub use intake::{CitizenReport, IntakeService, IotAck, IotReport};
pub use lifecycle::LifecycleService;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
