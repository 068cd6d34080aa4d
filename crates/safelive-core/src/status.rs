//! Status and priority enums with legacy-alias normalization
//!
//! The document store carries snake_case status strings; a handful of legacy
//! aliases (`pending_review`, `under_review`) still exist in old documents
//! and collapse to `pending` on parse.

use serde::{Deserialize, Serialize};

/// Incident priority assigned by the prediction oracle (or severity mapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Cosmetic or routine issues
    Low,
    /// Standard municipal work
    Medium,
    /// Urgent but not life-threatening
    High,
    /// Life/safety emergencies; gated by reviewer approval
    Critical,
}

impl Priority {
    /// Stable string form
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Parse a priority label
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IoT severity with lenient alias parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Minor severity
    Low,
    /// Moderate severity
    Medium,
    /// Major severity (default for unknown labels)
    High,
    /// Severe/emergency severity
    Critical,
}

impl Severity {
    /// Parse a severity token, accepting common sensor-side aliases.
    /// Unknown labels default to `High` so an unparseable alert is never
    /// quietly deprioritized.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        let normalized = value
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' '], "_");
        match normalized.as_str() {
            "low" | "minor" => Severity::Low,
            "medium" | "moderate" => Severity::Medium,
            "high" | "major" => Severity::High,
            "critical" | "severe" | "emergency" => Severity::Critical,
            _ => Severity::High,
        }
    }

    /// Stable string form
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Priority implied by this severity
    #[inline]
    #[must_use]
    pub fn to_priority(self) -> Priority {
        match self {
            Severity::Low => Priority::Low,
            Severity::Medium => Priority::Medium,
            Severity::High => Priority::High,
            Severity::Critical => Priority::Critical,
        }
    }
}

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly reported, no remediation yet
    Open,
    /// Waiting on review (AI validation or critical approval)
    Pending,
    /// Under active remediation
    InProgress,
    /// Remediation complete
    Resolved,
}

impl IncidentStatus {
    /// Stable string form
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Pending => "pending",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
        }
    }

    /// Parse an incident status, collapsing legacy aliases.
    /// `verified` is a ticket-only status and maps to `in_progress` here.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(IncidentStatus::Open),
            "pending" | "pending_review" | "under_review" => Some(IncidentStatus::Pending),
            "in_progress" | "verified" => Some(IncidentStatus::InProgress),
            "resolved" => Some(IncidentStatus::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket lifecycle status
///
/// `open -> pending -> in_progress -> verified -> resolved`, plus the
/// department-only reopen transition `resolved -> open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Work not started
    Open,
    /// Awaiting triage/review
    Pending,
    /// Under active remediation
    InProgress,
    /// Field work verified, awaiting resolution
    Verified,
    /// Closed
    Resolved,
}

impl TicketStatus {
    /// All ticket statuses, in lifecycle order
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open,
        TicketStatus::Pending,
        TicketStatus::InProgress,
        TicketStatus::Verified,
        TicketStatus::Resolved,
    ];

    /// Stable string form
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Verified => "verified",
            TicketStatus::Resolved => "resolved",
        }
    }

    /// Parse a ticket status, collapsing legacy aliases to `pending`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(TicketStatus::Open),
            "pending" | "pending_review" | "under_review" => Some(TicketStatus::Pending),
            "in_progress" => Some(TicketStatus::InProgress),
            "verified" => Some(TicketStatus::Verified),
            "resolved" => Some(TicketStatus::Resolved),
            _ => None,
        }
    }

    /// Incident status mirrored for this ticket status.
    /// `verified` is internal to tickets; reporters see `in_progress`.
    #[inline]
    #[must_use]
    pub fn to_incident_status(self) -> IncidentStatus {
        match self {
            TicketStatus::Open => IncidentStatus::Open,
            TicketStatus::Pending => IncidentStatus::Pending,
            TicketStatus::InProgress | TicketStatus::Verified => IncidentStatus::InProgress,
            TicketStatus::Resolved => IncidentStatus::Resolved,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
