//! Audit logbook entries
//!
//! The logbook is append-only. Entries are read back newest first per
//! ticket; nothing ever edits or deletes one.

use crate::ids::{IncidentId, TicketId, UserId};
use crate::roles::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One append-only logbook record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Ticket this entry belongs to
    pub ticket_id: TicketId,
    /// Owning incident, when known at write time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<IncidentId>,
    /// Machine action name, e.g. "ticket_reopened_by_department"
    pub action: String,
    /// Acting account id, absent for system actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
    /// Acting display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    /// Acting role
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_role: Option<UserRole>,
    /// Free-form structured detail
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
    /// When the action happened
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// System action without an acting account
    #[must_use]
    pub fn system(
        ticket_id: TicketId,
        action: impl Into<String>,
        details: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            incident_id: None,
            action: action.into(),
            actor_id: None,
            actor_name: None,
            actor_role: None,
            details,
            created_at: now,
        }
    }

    /// Action performed by a signed-in account
    #[must_use]
    pub fn by_actor(
        ticket_id: TicketId,
        action: impl Into<String>,
        actor_id: UserId,
        actor_name: impl Into<String>,
        actor_role: UserRole,
        details: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            incident_id: None,
            action: action.into(),
            actor_id: Some(actor_id),
            actor_name: Some(actor_name.into()),
            actor_role: Some(actor_role),
            details,
            created_at: now,
        }
    }

    /// Attach the owning incident id
    #[inline]
    #[must_use]
    pub fn with_incident(mut self, incident_id: IncidentId) -> Self {
        self.incident_id = Some(incident_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn system_entry_omits_actor_fields() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let entry = AuditLogEntry::system(
            TicketId::new(),
            "ticket_status_updated",
            json!({"from": "open", "to": "in_progress"}),
            now,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("actorId").is_none());
        assert!(json.get("incidentId").is_none());
        assert_eq!(json["action"], "ticket_status_updated");
        assert_eq!(json["details"]["to"], "in_progress");
    }

    #[test]
    fn actor_entry_carries_identity_and_incident() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let incident_id = IncidentId::new();
        let entry = AuditLogEntry::by_actor(
            TicketId::new(),
            "worker_assigned_by_supervisor",
            UserId::new(),
            "Asha",
            UserRole::Supervisor,
            json!({"workers": 2}),
            now,
        )
        .with_incident(incident_id);
        assert_eq!(entry.incident_id, Some(incident_id));
        assert_eq!(entry.actor_name.as_deref(), Some("Asha"));
    }
}
