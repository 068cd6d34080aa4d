//! Outbound notification and time ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::status::{Priority, TicketStatus};

/// Notification delivery failure
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Channel not configured or unreachable
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    /// Provider rejected the message
    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Email bodies the workflow engine sends
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    /// One-time code delivery
    OtpCode {
        /// Purpose label, e.g. "login"
        purpose: String,
        /// The six-digit code
        code: String,
        /// Validity window in minutes
        expires_minutes: i64,
    },
    /// Approve/reject request for a critical incident
    CriticalApprovalRequest {
        /// Incident title
        incident_title: String,
        /// Incident category
        category: String,
        /// Incident location
        location: String,
        /// Raw severity label from the reporter or sensor
        severity: String,
        /// One-click approve link carrying the raw token
        approve_url: String,
        /// One-click reject link carrying the raw token
        reject_url: String,
        /// When the review window closes
        expires_at: DateTime<Utc>,
    },
    /// Outcome broadcast after the first reviewer decides
    CriticalApprovalOutcome {
        /// Incident title
        incident_title: String,
        /// Whether the incident was approved
        approved: bool,
        /// Display name of the deciding reviewer
        decided_by: String,
    },
    /// New-assignment notice to a worker
    WorkerAssignment {
        /// Ticket title
        ticket_title: String,
        /// Work location
        location: String,
        /// Work priority
        priority: Priority,
        /// Display name of the assigning account
        assigned_by: String,
    },
    /// Warning to assignees when department reopens a resolved ticket
    ReopenWarning {
        /// Ticket title
        ticket_title: String,
        /// Department officer name
        department_name: String,
        /// Warning text
        message: String,
    },
    /// Resolution notice to the reporter
    ResolutionNotice {
        /// Ticket title
        ticket_title: String,
    },
    /// Stale-ticket reminder to the claiming field inspector
    InspectorReminder {
        /// Ticket title
        ticket_title: String,
        /// Work location
        location: String,
        /// Last inspector update, if any
        last_update_at: Option<DateTime<Utc>>,
    },
    /// Status-change notice to the reporter
    StatusUpdate {
        /// Ticket title
        ticket_title: String,
        /// New status
        status: TicketStatus,
    },
    /// Fresh-incident alert to the official stakeholders
    StakeholderAlert {
        /// Incident description
        description: String,
        /// Latitude, if the report had a fix
        latitude: Option<f64>,
        /// Longitude, if the report had a fix
        longitude: Option<f64>,
    },
}

/// SMS bodies the workflow engine sends
#[derive(Debug, Clone)]
pub enum SmsTemplate {
    /// One-time code delivery
    OtpCode {
        /// Purpose label
        purpose: String,
        /// The six-digit code
        code: String,
        /// Validity window in minutes
        expires_minutes: i64,
    },
    /// Status-change notice to the reporter
    StatusUpdate {
        /// Ticket title
        ticket_title: String,
        /// New status
        status: TicketStatus,
    },
    /// Fresh-incident alert to the official stakeholders
    StakeholderAlert {
        /// Incident description
        description: String,
        /// Latitude, if the report had a fix
        latitude: Option<f64>,
        /// Longitude, if the report had a fix
        longitude: Option<f64>,
    },
}

/// Outbound message channels. Implementations must not panic; callers treat
/// failures as best-effort except where a flow requires at least one
/// successful channel.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Send an email to one address
    async fn send_email(&self, to: &str, template: EmailTemplate) -> Result<(), SendError>;

    /// Send an SMS to one phone number
    async fn send_sms(&self, to: &str, template: SmsTemplate) -> Result<(), SendError>;
}

/// Gateway that only logs. Used by the demo binary and anywhere no
/// provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingGateway;

#[async_trait]
impl NotificationGateway for LoggingGateway {
    async fn send_email(&self, to: &str, template: EmailTemplate) -> Result<(), SendError> {
        tracing::info!(to, ?template, "email (log only)");
        Ok(())
    }

    async fn send_sms(&self, to: &str, template: SmsTemplate) -> Result<(), SendError> {
        tracing::info!(to, ?template, "sms (log only)");
        Ok(())
    }
}

/// Time source injected into anything that reads the clock
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
