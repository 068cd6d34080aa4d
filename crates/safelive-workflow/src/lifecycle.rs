//! Ticket lifecycle: status transitions, assignment, progress updates
//!
//! Every operation follows the same shape: load, authorize, mutate, persist,
//! mirror onto the incident, log, notify. Authorization failures happen
//! before any write; notification failures after the write are logged and
//! swallowed.

use crate::actions;
use crate::notify;
use crate::predict;
use crate::sync;
use chrono::{DateTime, Utc};
use safelive_core::gateway::{Clock, NotificationGateway};
use safelive_core::oracle::{provenance, round_confidence, PredictionOracle};
use safelive_core::repo::{
    AuditLogRepository, IncidentRepository, TicketRepository, UserRepository,
};
use safelive_core::ticket::{Assignee, ReopenStamp};
use safelive_core::{
    AuditLogEntry, Ticket, TicketId, TicketStatus, UserAccount, UserId, UserRole, WorkflowError,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// Drives tickets through their lifecycle on behalf of signed-in officials.
pub struct LifecycleService {
    incidents: Arc<dyn IncidentRepository>,
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserRepository>,
    audit: Arc<dyn AuditLogRepository>,
    gateway: Arc<dyn NotificationGateway>,
    oracle: Arc<dyn PredictionOracle>,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    /// Wire the service to its ports
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        audit: Arc<dyn AuditLogRepository>,
        gateway: Arc<dyn NotificationGateway>,
        oracle: Arc<dyn PredictionOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            incidents,
            tickets,
            users,
            audit,
            gateway,
            oracle,
            clock,
        }
    }

    /// Whether the account may touch this specific ticket at all
    #[must_use]
    pub fn can_access(ticket: &Ticket, actor: &UserAccount) -> bool {
        match actor.role {
            role if role.has_full_ticket_access() => true,
            UserRole::Worker => ticket.is_worker_assigned(actor.id),
            UserRole::FieldInspector => ticket
                .field_inspector_id
                .map_or(true, |id| id == actor.id),
            _ => false,
        }
    }

    /// Move a ticket to `target`, enforcing the per-role transition rules.
    ///
    /// Reopening (`resolved -> open`, department only) resets the progress
    /// fields, stamps `reopenedBy`, and warns the assigned workers. Once a
    /// ticket has been reopened, supervisor loses the power to resolve it
    /// and department gains verify/assign powers, until the warning clears.
    pub async fn update_status(
        &self,
        ticket_id: TicketId,
        target: TicketStatus,
        actor: &UserAccount,
        note: Option<&str>,
    ) -> Result<Ticket, WorkflowError> {
        let now = self.clock.now();
        let mut ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("ticket not found"))?;
        if !Self::can_access(&ticket, actor) {
            return Err(WorkflowError::authorization("this ticket is outside your scope"));
        }

        let from = ticket.status;
        let reopened_case = ticket.is_reopened_case();
        let reopening = target == TicketStatus::Open && from == TicketStatus::Resolved;

        match (target, reopening) {
            (TicketStatus::Open, true) => {
                if actor.role != UserRole::Department {
                    return Err(WorkflowError::authorization(
                        "only department can reopen a resolved ticket",
                    ));
                }
            }
            (TicketStatus::Resolved, _) => match actor.role {
                UserRole::Department => {}
                UserRole::Supervisor | UserRole::HeadSupervisor => {
                    if reopened_case {
                        return Err(WorkflowError::authorization(
                            "a reopened ticket can only be resolved by department",
                        ));
                    }
                }
                _ => {
                    return Err(WorkflowError::authorization(
                        "only department or supervisor can resolve a ticket",
                    ))
                }
            },
            (TicketStatus::Verified, _) => match actor.role {
                UserRole::Supervisor | UserRole::HeadSupervisor => {}
                UserRole::Department if reopened_case => {}
                _ => {
                    return Err(WorkflowError::authorization(
                        "only supervisor can verify this ticket",
                    ))
                }
            },
            (TicketStatus::Open | TicketStatus::Pending | TicketStatus::InProgress, _) => {
                if !actor.role.has_full_ticket_access() {
                    return Err(WorkflowError::authorization(
                        "your role cannot change ticket status",
                    ));
                }
            }
        }

        ticket.status = target;
        if reopening {
            ticket.reopened_by = Some(ReopenStamp {
                user_id: actor.id,
                name: actor.display_name().to_owned(),
                timestamp: now,
            });
            ticket.progress_percent = 0;
            ticket.progress_source = Some(provenance::REOPENED_RESET.to_owned());
            ticket.progress_confidence = 1.0;
            ticket.progress_summary = None;
            ticket.progress_updated_at = Some(now);
            ticket.last_inspector_update_at = None;
            ticket.last_worker_update_at = None;
            ticket.inspector_reminder_sent_for = None;
        } else if ticket.reopen_warning.is_some() {
            // the warning banner survives exactly until the next transition
            ticket.reopen_warning = None;
        }
        if let Some(note) = note {
            let note = note.trim();
            if !note.is_empty() {
                ticket.push_note(note, Some(actor.id), Some(actor.display_name().to_owned()), now);
            }
        }
        ticket.updated_at = now;
        self.tickets.put(ticket.clone()).await?;
        sync::mirror_onto_incident(self.incidents.as_ref(), &ticket, now).await?;

        let action = if reopening {
            actions::TICKET_REOPENED
        } else {
            actions::STATUS_CHANGED
        };
        self.log(
            &ticket,
            action,
            actor,
            json!({ "from": from, "to": target }),
            now,
        )
        .await;

        notify::status_update(self.gateway.as_ref(), &ticket).await;
        if reopening && ticket.has_assigned_workers() {
            let warning = notify::reopen_notices(
                self.gateway.as_ref(),
                self.users.as_ref(),
                &ticket,
                actor.display_name(),
                now,
            )
            .await;
            ticket.reopen_warning = Some(warning);
            self.tickets.put(ticket.clone()).await?;
        }

        Ok(ticket)
    }

    /// Replace the assigned worker set. Supervisor everywhere; department
    /// only on reopened cases.
    pub async fn assign(
        &self,
        ticket_id: TicketId,
        worker_ids: &[UserId],
        actor: &UserAccount,
        note: Option<&str>,
    ) -> Result<Ticket, WorkflowError> {
        let now = self.clock.now();
        let mut ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("ticket not found"))?;
        if !Self::can_access(&ticket, actor) {
            return Err(WorkflowError::authorization("this ticket is outside your scope"));
        }
        match actor.role {
            UserRole::Supervisor | UserRole::HeadSupervisor => {}
            UserRole::Department if ticket.is_reopened_case() => {}
            UserRole::Department => {
                return Err(WorkflowError::authorization(
                    "department can only assign workers on a reopened ticket",
                ))
            }
            _ => {
                return Err(WorkflowError::authorization(
                    "only supervisor can assign workers",
                ))
            }
        }

        let mut seen = HashSet::new();
        let unique: Vec<UserId> = worker_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if unique.is_empty() {
            return Err(WorkflowError::validation("at least one worker is required"));
        }

        let mut assignees = Vec::with_capacity(unique.len());
        for worker_id in unique {
            let account = self
                .users
                .get(worker_id)
                .await?
                .filter(|account| account.role == UserRole::Worker)
                .ok_or_else(|| {
                    WorkflowError::validation("selected worker account not found")
                })?;
            assignees.push(Assignee {
                worker_id,
                name: account.display_name().to_owned(),
                phone: account.phone.clone(),
                email: account.email.clone(),
                specialization: account
                    .specialization
                    .clone()
                    .unwrap_or_else(|| "General".to_owned()),
                assigned_at: now,
            });
        }

        let names: Vec<String> = assignees.iter().map(|a| a.name.clone()).collect();
        let label = match assignees.len() {
            1 => assignees[0].name.clone(),
            n => format!("{} +{} more", assignees[0].name, n - 1),
        };
        ticket.assignees = assignees;
        ticket.assigned_to = Some(label);
        ticket.assigned_by_id = Some(actor.id);
        ticket.assigned_by_name = Some(actor.display_name().to_owned());
        ticket.assigned_at = Some(now);
        if let Some(note) = note {
            let note = note.trim();
            if !note.is_empty() {
                ticket.push_note(note, Some(actor.id), Some(actor.display_name().to_owned()), now);
            }
        }
        ticket.updated_at = now;
        self.tickets.put(ticket.clone()).await?;
        sync::mirror_onto_incident(self.incidents.as_ref(), &ticket, now).await?;

        let action = if actor.role == UserRole::Department {
            actions::WORKER_ASSIGNED_BY_DEPARTMENT
        } else {
            actions::WORKER_ASSIGNED_BY_SUPERVISOR
        };
        self.log(
            &ticket,
            action,
            actor,
            json!({ "workers": names, "count": names.len() }),
            now,
        )
        .await;

        notify::assignment_notices(self.gateway.as_ref(), &ticket).await;
        Ok(ticket)
    }

    /// Post a progress update from the field. The text is scored into a
    /// completion percentage; a first inspector update also claims the
    /// ticket for that inspector.
    pub async fn progress_update(
        &self,
        ticket_id: TicketId,
        update_text: &str,
        actor: &UserAccount,
    ) -> Result<Ticket, WorkflowError> {
        if !matches!(actor.role, UserRole::FieldInspector | UserRole::Worker) {
            return Err(WorkflowError::authorization(
                "only field inspectors and workers post progress updates",
            ));
        }
        let text = update_text.trim();
        if text.chars().count() < 5 {
            return Err(WorkflowError::validation(
                "update text must be at least 5 characters",
            ));
        }
        let now = self.clock.now();
        let mut ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("ticket not found"))?;
        if !Self::can_access(&ticket, actor) {
            return Err(WorkflowError::authorization("this ticket is outside your scope"));
        }
        if ticket.status == TicketStatus::Resolved {
            return Err(WorkflowError::validation(
                "resolved tickets cannot receive progress updates",
            ));
        }

        let prediction = predict::progress_with_fallback(self.oracle.as_ref(), text).await;
        ticket.progress_percent = prediction.percent.min(100);
        ticket.progress_source = Some(prediction.provenance.to_owned());
        ticket.progress_confidence = round_confidence(prediction.confidence);
        ticket.progress_summary = Some(text.to_owned());
        ticket.progress_updated_at = Some(now);
        if matches!(ticket.status, TicketStatus::Open | TicketStatus::Pending) {
            ticket.status = TicketStatus::InProgress;
        }

        let (action, note_prefix) = match actor.role {
            UserRole::FieldInspector => {
                ticket.last_inspector_update_at = Some(now);
                if ticket.field_inspector_id.is_none() {
                    ticket.field_inspector_id = Some(actor.id);
                    ticket.field_inspector_name = Some(actor.display_name().to_owned());
                }
                (actions::PROGRESS_BY_FIELD_INSPECTOR, "Field Inspector update")
            }
            _ => {
                ticket.last_worker_update_at = Some(now);
                (actions::PROGRESS_BY_WORKER, "Worker update")
            }
        };
        let percent = ticket.progress_percent;
        ticket.push_note(
            format!("{note_prefix}: {text} ({percent}%)"),
            Some(actor.id),
            Some(actor.display_name().to_owned()),
            now,
        );
        ticket.updated_at = now;
        self.tickets.put(ticket.clone()).await?;
        sync::mirror_onto_incident(self.incidents.as_ref(), &ticket, now).await?;

        self.log(
            &ticket,
            action,
            actor,
            json!({
                "percent": percent,
                "source": prediction.provenance,
                "confidence": ticket.progress_confidence,
            }),
            now,
        )
        .await;

        notify::status_update(self.gateway.as_ref(), &ticket).await;
        Ok(ticket)
    }

    /// The append-only logbook for one ticket, newest first. Department only.
    pub async fn logbook(
        &self,
        ticket_id: TicketId,
        actor: &UserAccount,
    ) -> Result<Vec<AuditLogEntry>, WorkflowError> {
        if actor.role != UserRole::Department {
            return Err(WorkflowError::authorization(
                "only department reads the logbook",
            ));
        }
        let ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("ticket not found"))?;
        Ok(self.audit.for_ticket(ticket.id).await?)
    }

    /// Every ticket visible to this account, newest first.
    ///
    /// Inspectors see unassigned-or-own unresolved tickets; workers their
    /// assignments; department and supervisors everything.
    pub async fn tickets_for(&self, actor: &UserAccount) -> Result<Vec<Ticket>, WorkflowError> {
        let all = self.tickets.list().await?;
        Ok(all
            .into_iter()
            .filter(|ticket| Self::visible_in_list(ticket, actor))
            .collect())
    }

    fn visible_in_list(ticket: &Ticket, actor: &UserAccount) -> bool {
        match actor.role {
            role if role.has_full_ticket_access() => true,
            UserRole::Worker => ticket.is_worker_assigned(actor.id),
            UserRole::FieldInspector => {
                ticket.status != TicketStatus::Resolved
                    && ticket.field_inspector_id.map_or(true, |id| id == actor.id)
            }
            _ => false,
        }
    }

    async fn log(
        &self,
        ticket: &Ticket,
        action: &str,
        actor: &UserAccount,
        details: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let entry = AuditLogEntry::by_actor(
            ticket.id,
            action,
            actor.id,
            actor.display_name(),
            actor.role,
            details,
            now,
        )
        .with_incident(ticket.incident_id);
        if let Err(error) = self.audit.append(entry).await {
            tracing::warn!(%error, "lifecycle audit append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use safelive_core::gateway::Clock as _;
    use safelive_core::{Incident, IncidentStatus};
    use safelive_store::MemoryStore;
    use safelive_test_utils::{
        incident_with_ticket, seeded_store, Officials, ManualClock, RecordingGateway,
        ScriptedOracle,
    };

    struct Fixture {
        store: MemoryStore,
        officials: Officials,
        gateway: Arc<RecordingGateway>,
        oracle: Arc<ScriptedOracle>,
        clock: ManualClock,
        service: LifecycleService,
        incident: Incident,
        ticket: Ticket,
    }

    async fn fixture() -> Fixture {
        let (store, officials) = seeded_store().await;
        let gateway = RecordingGateway::new();
        let oracle = ScriptedOracle::new();
        let clock = ManualClock::default_start();
        let service = LifecycleService::new(
            store.incidents.clone(),
            store.tickets.clone(),
            store.users.clone(),
            store.audit.clone(),
            gateway.clone(),
            oracle.clone(),
            Arc::new(clock.clone()),
        );
        let (incident, ticket) = incident_with_ticket(clock.now());
        store.incidents.insert(incident.clone()).await.unwrap();
        store.tickets.insert(ticket.clone()).await.unwrap();
        Fixture {
            store,
            officials,
            gateway,
            oracle,
            clock,
            service,
            incident,
            ticket,
        }
    }

    async fn resolve(fx: &Fixture) -> Ticket {
        fx.service
            .update_status(fx.ticket.id, TicketStatus::Resolved, &fx.officials.supervisor, None)
            .await
            .unwrap()
    }

    async fn assign_workers(fx: &Fixture) -> Ticket {
        let ids: Vec<UserId> = fx.officials.workers.iter().map(|w| w.id).collect();
        fx.service
            .assign(fx.ticket.id, &ids, &fx.officials.supervisor, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn supervisor_resolves_and_the_incident_follows() {
        let fx = fixture().await;
        let ticket = resolve(&fx).await;
        assert_eq!(ticket.status, TicketStatus::Resolved);

        let incident = fx.store.incidents.get(fx.incident.id).await.unwrap().unwrap();
        assert_eq!(incident.status, IncidentStatus::Resolved);

        let entries = fx.store.audit.for_ticket(fx.ticket.id).await.unwrap();
        assert_eq!(entries[0].action, actions::STATUS_CHANGED);
    }

    #[tokio::test]
    async fn workers_cannot_change_status() {
        let fx = fixture().await;
        assign_workers(&fx).await;
        let error = fx
            .service
            .update_status(
                fx.ticket.id,
                TicketStatus::Resolved,
                &fx.officials.workers[0],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));
    }

    #[tokio::test]
    async fn only_department_reopens_a_resolved_ticket() {
        let fx = fixture().await;
        resolve(&fx).await;

        let error = fx
            .service
            .update_status(fx.ticket.id, TicketStatus::Open, &fx.officials.supervisor, None)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));

        let ticket = fx
            .service
            .update_status(fx.ticket.id, TicketStatus::Open, &fx.officials.department, None)
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.reopened_by.is_some());
    }

    #[tokio::test]
    async fn reopening_resets_progress_and_warns_assignees() {
        let fx = fixture().await;
        assign_workers(&fx).await;
        fx.service
            .progress_update(fx.ticket.id, "work is 60% complete", &fx.officials.workers[0])
            .await
            .unwrap();
        fx.service
            .update_status(fx.ticket.id, TicketStatus::Resolved, &fx.officials.department, None)
            .await
            .unwrap();
        fx.gateway.clear();

        let ticket = fx
            .service
            .update_status(fx.ticket.id, TicketStatus::Open, &fx.officials.department, None)
            .await
            .unwrap();

        assert_eq!(ticket.progress_percent, 0);
        assert_eq!(ticket.progress_source.as_deref(), Some(provenance::REOPENED_RESET));
        assert_eq!(ticket.progress_confidence, 1.0);
        assert!(ticket.progress_summary.is_none());
        assert!(ticket.last_worker_update_at.is_none());
        assert!(ticket.inspector_reminder_sent_for.is_none());
        let warning = ticket.reopen_warning.unwrap();
        assert!(warning.message.contains("reopened"));
        // both assigned workers got the warning email
        assert_eq!(fx.gateway.emails().len(), 2);

        let entries = fx.store.audit.for_ticket(fx.ticket.id).await.unwrap();
        assert_eq!(entries[0].action, actions::TICKET_REOPENED);
    }

    #[tokio::test]
    async fn reopened_cases_shift_powers_to_department() {
        let fx = fixture().await;
        assign_workers(&fx).await;
        fx.service
            .update_status(fx.ticket.id, TicketStatus::Resolved, &fx.officials.department, None)
            .await
            .unwrap();
        fx.service
            .update_status(fx.ticket.id, TicketStatus::Open, &fx.officials.department, None)
            .await
            .unwrap();

        // supervisor cannot resolve the reopened case
        let error = fx
            .service
            .update_status(fx.ticket.id, TicketStatus::Resolved, &fx.officials.supervisor, None)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));

        // department can verify it
        let ticket = fx
            .service
            .update_status(fx.ticket.id, TicketStatus::Verified, &fx.officials.department, None)
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Verified);
        // the transition consumed the warning banner
        assert!(ticket.reopen_warning.is_none());
        // reopenedBy persists, so department keeps its powers
        assert!(ticket.is_reopened_case());
    }

    #[tokio::test]
    async fn department_cannot_verify_a_fresh_ticket() {
        let fx = fixture().await;
        let error = fx
            .service
            .update_status(fx.ticket.id, TicketStatus::Verified, &fx.officials.department, None)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));
    }

    #[tokio::test]
    async fn assignment_builds_the_display_label() {
        let fx = fixture().await;
        let ticket = assign_workers(&fx).await;
        assert_eq!(ticket.assignees.len(), 2);
        assert_eq!(ticket.assigned_to.as_deref(), Some("Wasim Worker +1 more"));
        assert_eq!(
            ticket.assigned_by_name.as_deref(),
            Some(fx.officials.supervisor.name.as_str())
        );

        let incident = fx.store.incidents.get(fx.incident.id).await.unwrap().unwrap();
        assert_eq!(incident.assigned_to.as_deref(), Some("Wasim Worker +1 more"));

        let entries = fx.store.audit.for_ticket(fx.ticket.id).await.unwrap();
        assert_eq!(entries[0].action, actions::WORKER_ASSIGNED_BY_SUPERVISOR);
        // each worker got an assignment email
        assert_eq!(fx.gateway.emails().len(), 2);
    }

    #[tokio::test]
    async fn assignment_rejects_non_worker_accounts() {
        let fx = fixture().await;
        let error = fx
            .service
            .assign(fx.ticket.id, &[fx.officials.inspector.id], &fx.officials.supervisor, None)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Validation(_)));

        let error = fx
            .service
            .assign(fx.ticket.id, &[], &fx.officials.supervisor, None)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn department_assigns_only_on_reopened_cases() {
        let fx = fixture().await;
        let worker_id = fx.officials.workers[0].id;
        let error = fx
            .service
            .assign(fx.ticket.id, &[worker_id], &fx.officials.department, None)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));

        fx.service
            .update_status(fx.ticket.id, TicketStatus::Resolved, &fx.officials.department, None)
            .await
            .unwrap();
        fx.service
            .update_status(fx.ticket.id, TicketStatus::Open, &fx.officials.department, None)
            .await
            .unwrap();
        let ticket = fx
            .service
            .assign(fx.ticket.id, &[worker_id], &fx.officials.department, None)
            .await
            .unwrap();
        assert_eq!(ticket.assigned_to.as_deref(), Some("Wasim Worker"));

        let entries = fx.store.audit.for_ticket(fx.ticket.id).await.unwrap();
        assert_eq!(entries[0].action, actions::WORKER_ASSIGNED_BY_DEPARTMENT);
    }

    #[tokio::test]
    async fn explicit_percentages_win_and_open_tickets_start() {
        let fx = fixture().await;
        assign_workers(&fx).await;
        fx.oracle.fail(true);

        let ticket = fx
            .service
            .progress_update(fx.ticket.id, "repair is 60% complete", &fx.officials.workers[0])
            .await
            .unwrap();

        assert_eq!(ticket.progress_percent, 60);
        assert_eq!(
            ticket.progress_source.as_deref(),
            Some(provenance::EXPLICIT_PERCENTAGE)
        );
        assert_eq!(ticket.status, TicketStatus::InProgress);
        assert!(ticket.last_worker_update_at.is_some());
        let note = ticket.notes.last().unwrap();
        assert_eq!(note.text, "Worker update: repair is 60% complete (60%)");

        let incident = fx.store.incidents.get(fx.incident.id).await.unwrap().unwrap();
        assert_eq!(incident.progress.unwrap().percent, 60);
    }

    #[tokio::test]
    async fn first_inspector_update_claims_the_ticket() {
        let fx = fixture().await;
        let ticket = fx
            .service
            .progress_update(fx.ticket.id, "site visit done, started work", &fx.officials.inspector)
            .await
            .unwrap();
        assert_eq!(ticket.field_inspector_id, Some(fx.officials.inspector.id));
        assert!(ticket.last_inspector_update_at.is_some());
        let note = ticket.notes.last().unwrap();
        assert!(note.text.starts_with("Field Inspector update: "));

        let entries = fx.store.audit.for_ticket(fx.ticket.id).await.unwrap();
        assert_eq!(entries[0].action, actions::PROGRESS_BY_FIELD_INSPECTOR);
    }

    #[tokio::test]
    async fn progress_updates_validate_text_and_state() {
        let fx = fixture().await;
        let error = fx
            .service
            .progress_update(fx.ticket.id, "ok", &fx.officials.inspector)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Validation(_)));

        // unassigned worker is out of scope
        let error = fx
            .service
            .progress_update(fx.ticket.id, "started clearing debris", &fx.officials.workers[0])
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));

        resolve(&fx).await;
        let error = fx
            .service
            .progress_update(fx.ticket.id, "started clearing debris", &fx.officials.inspector)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn logbook_is_department_only_and_newest_first() {
        let fx = fixture().await;
        assign_workers(&fx).await;
        fx.clock.advance(chrono::Duration::minutes(5));
        resolve(&fx).await;

        let error = fx
            .service
            .logbook(fx.ticket.id, &fx.officials.supervisor)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));

        let entries = fx
            .service
            .logbook(fx.ticket.id, &fx.officials.department)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, actions::STATUS_CHANGED);
        assert_eq!(entries[1].action, actions::WORKER_ASSIGNED_BY_SUPERVISOR);
    }

    #[tokio::test]
    async fn listings_respect_role_scope() {
        let fx = fixture().await;
        // a second ticket assigned to worker 0
        let (other_incident, other_ticket) = incident_with_ticket(fx.clock.now());
        fx.store.incidents.insert(other_incident).await.unwrap();
        fx.store.tickets.insert(other_ticket.clone()).await.unwrap();
        fx.service
            .assign(
                other_ticket.id,
                &[fx.officials.workers[0].id],
                &fx.officials.supervisor,
                None,
            )
            .await
            .unwrap();

        let all = fx.service.tickets_for(&fx.officials.department).await.unwrap();
        assert_eq!(all.len(), 2);

        let mine = fx.service.tickets_for(&fx.officials.workers[0]).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, other_ticket.id);

        assert!(fx
            .service
            .tickets_for(&safelive_test_utils::citizen())
            .await
            .unwrap()
            .is_empty());

        // inspectors stop seeing resolved tickets
        let before = fx.service.tickets_for(&fx.officials.inspector).await.unwrap();
        assert_eq!(before.len(), 2);
        resolve(&fx).await;
        let after = fx.service.tickets_for(&fx.officials.inspector).await.unwrap();
        assert_eq!(after.len(), 1);
    }
}
