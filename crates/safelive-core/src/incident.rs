//! Incident records

use crate::approval::CriticalApproval;
use crate::ids::{IncidentId, TicketId, UserId};
use crate::status::{IncidentStatus, Priority, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority prediction provenance stored alongside the incident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPriority {
    /// Predicted priority label
    pub priority: Priority,
    /// Oracle confidence in [0, 1]
    pub confidence: f64,
    /// Which estimation path produced the label
    pub provenance: String,
    /// When the prediction was made
    pub evaluated_at: DateTime<Utc>,
}

/// Ingestion metadata for sensor-submitted incidents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionMeta {
    /// Server receive time
    pub received_at: DateTime<Utc>,
    /// Remote address as reported by the transport layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    /// Client user agent, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Progress fields mirrored from the ticket onto its incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStamp {
    /// Completion percentage, multiple of 5 in [0, 100]
    pub percent: u8,
    /// Which estimation path produced the value
    pub source: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// When the value was produced
    pub updated_at: DateTime<Utc>,
}

/// A citizen- or sensor-reported problem awaiting or undergoing remediation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Incident id
    pub id: IncidentId,
    /// Short title
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Municipal category (roads, water, sanitation, ...)
    pub category: String,
    /// Human-readable location
    pub location: String,
    /// Latitude, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Priority; absent until the oracle (or severity mapping) assigns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Lifecycle status
    pub status: IncidentStatus,
    /// Reporter display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    /// Reporting account id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<UserId>,
    /// Reporter email for notifications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    /// Reporter phone for SMS/WhatsApp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_phone: Option<String>,
    /// Assignment display label mirrored from the ticket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    /// Back-reference to the mirrored ticket; immutable once set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<TicketId>,
    /// Why the incident is held in `pending`, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_reason: Option<String>,
    /// Critical-review gate, present for oracle-flagged critical incidents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical_approval: Option<CriticalApproval>,
    /// Priority prediction provenance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_priority: Option<AiPriority>,
    /// Sensor severity, for IoT submissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Impact scope token (city, ward, street, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Submission source token (edge, camera, sensor, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Reporting device id, for IoT submissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Device-side event id; (deviceId, eventId) deduplicates retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Sensor type label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    /// Sensor-side detection confidence in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Device-side capture time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    /// Server-side ingestion metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion: Option<IngestionMeta>,
    /// Progress mirrored from the ticket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressStamp>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Create a new open incident with the required fields
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        location: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IncidentId::new(),
            title: title.into(),
            description: description.into(),
            category: category.into(),
            location: location.into(),
            latitude: None,
            longitude: None,
            priority: None,
            status: IncidentStatus::Open,
            reported_by: None,
            reporter_id: None,
            reporter_email: None,
            reporter_phone: None,
            assigned_to: None,
            ticket_id: None,
            pending_reason: None,
            critical_approval: None,
            ai_priority: None,
            severity: None,
            scope: None,
            source: None,
            device_id: None,
            event_id: None,
            sensor_type: None,
            confidence: None,
            captured_at: None,
            ingestion: None,
            progress: None,
            created_at: now,
            updated_at: now,
        }
    }
}
