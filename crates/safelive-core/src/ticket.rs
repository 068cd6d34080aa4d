//! Ticket records
//!
//! A ticket is the internal work-order mirroring an incident. Assignment,
//! progress, and note state live here; a derived subset is synchronized back
//! onto the incident after every transition.

use crate::ids::{IncidentId, TicketId, UserId};
use crate::incident::Incident;
use crate::status::{Priority, TicketStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One assigned worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    /// Worker account id
    pub worker_id: UserId,
    /// Worker display name
    pub name: String,
    /// Contact phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Specialization label
    pub specialization: String,
    /// When this worker was assigned
    pub assigned_at: DateTime<Utc>,
}

/// Append-only note on a ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketNote {
    /// Note text
    pub text: String,
    /// Authoring account id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<UserId>,
    /// Authoring display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Who reopened a resolved ticket, and when
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenStamp {
    /// Department account that reopened the ticket
    pub user_id: UserId,
    /// Display name of that account
    pub name: String,
    /// Reopen time
    pub timestamp: DateTime<Utc>,
}

/// Warning banner issued to assignees when a ticket is reopened
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenWarning {
    /// Warning text sent to assignees
    pub message: String,
    /// When the warning was issued
    pub issued_at: DateTime<Utc>,
    /// Department officer name shown in the warning
    pub department_name: String,
}

/// Internal work-order mirroring an incident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket id
    pub id: TicketId,
    /// Owning incident; orphaned tickets are periodically purged
    pub incident_id: IncidentId,
    /// Title copied from the incident at creation
    pub title: String,
    /// Description copied from the incident at creation
    pub description: String,
    /// Category copied from the incident at creation
    pub category: String,
    /// Work priority
    pub priority: Priority,
    /// Location copied from the incident at creation
    pub location: String,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Ordered assigned workers; first entry is the primary assignee
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    /// Display label, e.g. "Asha +2 more"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Supervisor (or department) account that made the assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by_id: Option<UserId>,
    /// Display name of the assigning account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by_name: Option<String>,
    /// When the current assignment was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    /// Field inspector who last claimed this ticket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_inspector_id: Option<UserId>,
    /// Display name of that inspector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_inspector_name: Option<String>,
    /// Completion percentage, multiple of 5 in [0, 100]
    #[serde(default)]
    pub progress_percent: u8,
    /// Which estimation path produced the percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_source: Option<String>,
    /// Estimation confidence in [0, 1]
    #[serde(default)]
    pub progress_confidence: f64,
    /// Latest progress update text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_summary: Option<String>,
    /// When the progress fields last changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_updated_at: Option<DateTime<Utc>>,
    /// Last field-inspector progress update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_inspector_update_at: Option<DateTime<Utc>>,
    /// Last worker progress update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_worker_update_at: Option<DateTime<Utc>>,
    /// Local date for which an inspector reminder was already sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspector_reminder_sent_for: Option<NaiveDate>,
    /// Set only when a resolved ticket is reopened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reopened_by: Option<ReopenStamp>,
    /// Warning issued to assignees at reopen; cleared on later transitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reopen_warning: Option<ReopenWarning>,
    /// Append-only notes
    #[serde(default)]
    pub notes: Vec<TicketNote>,
    /// Reporter email mirrored for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    /// Reporter phone mirrored for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_phone: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Mirror a ticket from a freshly stored incident.
    /// Incident statuses map onto the ticket status space directly.
    #[must_use]
    pub fn from_incident(incident: &Incident, now: DateTime<Utc>) -> Self {
        let status = TicketStatus::parse(incident.status.as_str()).unwrap_or(TicketStatus::Open);
        Self {
            id: TicketId::new(),
            incident_id: incident.id,
            title: incident.title.clone(),
            description: incident.description.clone(),
            category: incident.category.clone(),
            priority: incident.priority.unwrap_or(Priority::Medium),
            location: incident.location.clone(),
            status,
            assignees: Vec::new(),
            assigned_to: None,
            assigned_by_id: None,
            assigned_by_name: None,
            assigned_at: None,
            field_inspector_id: None,
            field_inspector_name: None,
            progress_percent: 0,
            progress_source: None,
            progress_confidence: 0.0,
            progress_summary: None,
            progress_updated_at: None,
            last_inspector_update_at: None,
            last_worker_update_at: None,
            inspector_reminder_sent_for: None,
            reopened_by: None,
            reopen_warning: None,
            notes: Vec::new(),
            reporter_email: incident.reporter_email.clone(),
            reporter_phone: incident.reporter_phone.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Ordered, deduplicated assigned worker ids
    #[must_use]
    pub fn worker_ids(&self) -> Vec<UserId> {
        let mut seen = std::collections::HashSet::new();
        self.assignees
            .iter()
            .map(|a| a.worker_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Whether any worker is assigned
    #[inline]
    #[must_use]
    pub fn has_assigned_workers(&self) -> bool {
        !self.assignees.is_empty()
    }

    /// Whether the given account is among the assigned workers
    #[inline]
    #[must_use]
    pub fn is_worker_assigned(&self, worker_id: UserId) -> bool {
        self.assignees.iter().any(|a| a.worker_id == worker_id)
    }

    /// Whether this ticket was ever reopened by department.
    /// A lingering reopen warning counts, so department retains its
    /// reopened-case powers until the warning is cleared.
    #[inline]
    #[must_use]
    pub fn is_reopened_case(&self) -> bool {
        self.reopened_by.is_some() || self.reopen_warning.is_some()
    }

    /// Latest update text: the progress summary, else the newest non-empty note
    #[must_use]
    pub fn latest_update_text(&self) -> Option<&str> {
        if let Some(summary) = self.progress_summary.as_deref() {
            if !summary.trim().is_empty() {
                return Some(summary);
            }
        }
        self.notes
            .iter()
            .rev()
            .map(|n| n.text.trim())
            .find(|text| !text.is_empty())
    }

    /// Append a note
    pub fn push_note(
        &mut self,
        text: impl Into<String>,
        author_id: Option<UserId>,
        author_name: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.notes.push(TicketNote {
            text: text.into(),
            author_id,
            author_name,
            created_at: now,
        });
    }
}
