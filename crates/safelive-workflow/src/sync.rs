//! Ticket-to-incident field synchronization
//!
//! Every committed ticket transition mirrors a derived subset of fields onto
//! the owning incident. The read-then-write pair is not transactional; the
//! last writer wins, and the mirror converges on the next transition.

use chrono::{DateTime, Utc};
use safelive_core::incident::ProgressStamp;
use safelive_core::repo::IncidentRepository;
use safelive_core::{Ticket, WorkflowError};

/// Mirror a ticket's status, assignment label, and progress onto its
/// incident. A missing incident is tolerated; orphaned tickets are swept by
/// the maintenance pass instead of failing the transition here.
pub async fn mirror_onto_incident(
    incidents: &dyn IncidentRepository,
    ticket: &Ticket,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    let Some(mut incident) = incidents.get(ticket.incident_id).await? else {
        tracing::warn!(
            ticket = %ticket.id,
            incident = %ticket.incident_id,
            "ticket has no incident; skipping mirror"
        );
        return Ok(());
    };

    incident.status = ticket.status.to_incident_status();
    incident.assigned_to = ticket.assigned_to.clone();
    if let Some(source) = ticket.progress_source.clone() {
        incident.progress = Some(ProgressStamp {
            percent: ticket.progress_percent,
            source,
            confidence: ticket.progress_confidence,
            updated_at: ticket.progress_updated_at.unwrap_or(now),
        });
    }
    incident.updated_at = now;
    incidents.put(incident).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use safelive_core::{IncidentStatus, TicketStatus};
    use safelive_store::MemoryIncidents;
    use safelive_test_utils::{incident_with_ticket, ManualClock};
    use safelive_core::gateway::Clock;

    #[tokio::test]
    async fn verified_tickets_mirror_as_in_progress() {
        let clock = ManualClock::default_start();
        let now = clock.now();
        let incidents = MemoryIncidents::default();
        let (incident, mut ticket) = incident_with_ticket(now);
        let incident_id = incident.id;
        incidents.insert(incident).await.unwrap();

        ticket.status = TicketStatus::Verified;
        ticket.assigned_to = Some("Wasim +1 more".into());
        ticket.progress_percent = 60;
        ticket.progress_source = Some("heuristic_fallback".into());
        ticket.progress_confidence = 0.55;

        mirror_onto_incident(&incidents, &ticket, now).await.unwrap();

        let mirrored = incidents.get(incident_id).await.unwrap().unwrap();
        assert_eq!(mirrored.status, IncidentStatus::InProgress);
        assert_eq!(mirrored.assigned_to.as_deref(), Some("Wasim +1 more"));
        let progress = mirrored.progress.unwrap();
        assert_eq!(progress.percent, 60);
        assert_eq!(progress.source, "heuristic_fallback");
    }

    #[tokio::test]
    async fn missing_incident_is_tolerated() {
        let clock = ManualClock::default_start();
        let now = clock.now();
        let incidents = MemoryIncidents::default();
        let (_, ticket) = incident_with_ticket(now);
        assert!(mirror_onto_incident(&incidents, &ticket, now).await.is_ok());
    }

    #[tokio::test]
    async fn tickets_without_progress_leave_the_stamp_unset() {
        let clock = ManualClock::default_start();
        let now = clock.now();
        let incidents = MemoryIncidents::default();
        let (incident, mut ticket) = incident_with_ticket(now);
        let incident_id = incident.id;
        incidents.insert(incident).await.unwrap();

        ticket.status = TicketStatus::Pending;
        mirror_onto_incident(&incidents, &ticket, now).await.unwrap();

        let mirrored = incidents.get(incident_id).await.unwrap().unwrap();
        assert_eq!(mirrored.status, IncidentStatus::Pending);
        assert!(mirrored.progress.is_none());
    }
}
