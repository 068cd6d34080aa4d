//! Periodic progress reconciliation
//!
//! Tickets drift: workers forget to post updates, reviews resolve incidents
//! out of band, assignments land after an estimate was made. This pass walks
//! every ticket and recomputes the progress fields from ground truth:
//!
//! - resolved tickets are pinned at 100
//! - open tickets with nobody assigned are pinned at 0
//! - everything else is re-scored from a context string built out of the
//!   headline fields and the latest update, capped at 40 while still open,
//!   floored at 10 once a team is on site, and never allowed to move
//!   backwards
//!
//! For estimation, pending counts as open and verified as in progress.
//!
//! A ticket whose recomputed fields match what is stored is skipped, so the
//! pass is idempotent and cheap on a quiet system.

use crate::TaskHandle;
use chrono::{DateTime, Utc};
use safelive_core::gateway::Clock;
use safelive_core::oracle::{
    provenance, round_confidence, OracleError, PredictionOracle, ProgressPrediction,
};
use safelive_core::repo::{AuditLogRepository, IncidentRepository, StoreError, TicketRepository};
use safelive_core::{AuditLogEntry, Ticket, TicketStatus, WorkflowError};
use safelive_workflow::{actions, sync};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Open tickets cannot report more than this until work actually starts
const OPEN_CAP: u8 = 40;
/// A staffed in-progress ticket reports at least this much
const ASSIGNED_FLOOR: u8 = 10;

/// Why one ticket's reconciliation was abandoned
#[derive(Debug, thiserror::Error)]
enum ReconcileError {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Counters from one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Tickets examined
    pub examined: usize,
    /// Tickets whose progress fields changed
    pub updated: usize,
    /// Tickets already consistent
    pub skipped: usize,
    /// Tickets that failed and were left untouched
    pub failed: usize,
}

/// The reconciliation pass and its ports
pub struct ProgressTask {
    incidents: Arc<dyn IncidentRepository>,
    tickets: Arc<dyn TicketRepository>,
    audit: Arc<dyn AuditLogRepository>,
    oracle: Arc<dyn PredictionOracle>,
    clock: Arc<dyn Clock>,
}

/// Verified tickets estimate like in-progress ones; pending like open
fn normalized_status(status: TicketStatus) -> TicketStatus {
    match status {
        TicketStatus::Verified => TicketStatus::InProgress,
        TicketStatus::Pending => TicketStatus::Open,
        other => other,
    }
}

/// What the oracle sees: the ticket's headline fields plus the latest
/// update, joined into one sentence-like string
fn progress_context(ticket: &Ticket, status: TicketStatus, staffed: bool) -> String {
    let mut parts = vec![
        format!("title: {}", ticket.title),
        format!("category: {}", ticket.category),
        format!("priority: {}", ticket.priority.as_str()),
        format!("status: {}", status.as_str()),
        if staffed {
            "workers assigned".to_owned()
        } else {
            "workers not assigned".to_owned()
        },
    ];
    if let Some(text) = ticket.latest_update_text() {
        parts.push(format!("latest update: {text}"));
    }
    parts.join(". ")
}

impl ProgressTask {
    /// Wire the pass to its ports
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        tickets: Arc<dyn TicketRepository>,
        audit: Arc<dyn AuditLogRepository>,
        oracle: Arc<dyn PredictionOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            incidents,
            tickets,
            audit,
            oracle,
            clock,
        }
    }

    /// Reconcile every ticket once. One bad ticket never aborts the pass.
    pub async fn run_pass(&self) -> Result<PassSummary, WorkflowError> {
        let now = self.clock.now();
        let mut summary = PassSummary::default();
        for ticket in self.tickets.list().await? {
            summary.examined += 1;
            match self.reconcile(ticket, now).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => summary.skipped += 1,
                Err(error) => {
                    summary.failed += 1;
                    tracing::warn!(%error, "progress reconciliation failed for ticket");
                }
            }
        }
        Ok(summary)
    }

    async fn reconcile(
        &self,
        mut ticket: Ticket,
        now: DateTime<Utc>,
    ) -> Result<bool, ReconcileError> {
        let target = self.target_for(&ticket).await?;
        let confidence = round_confidence(target.confidence);
        let unchanged = ticket.progress_percent == target.percent
            && ticket.progress_source.as_deref() == Some(target.provenance)
            && round_confidence(ticket.progress_confidence) == confidence;
        if unchanged {
            return Ok(false);
        }

        let ticket_id = ticket.id;
        let incident_id = ticket.incident_id;
        ticket.progress_percent = target.percent;
        ticket.progress_source = Some(target.provenance.to_owned());
        ticket.progress_confidence = confidence;
        ticket.progress_updated_at = Some(now);
        ticket.updated_at = now;
        self.tickets.put(ticket.clone()).await?;
        sync::mirror_onto_incident(self.incidents.as_ref(), &ticket, now).await?;

        let entry = AuditLogEntry::system(
            ticket_id,
            actions::PROGRESS_RECONCILED,
            json!({
                "percent": target.percent,
                "source": target.provenance,
                "confidence": confidence,
            }),
            now,
        )
        .with_incident(incident_id);
        if let Err(error) = self.audit.append(entry).await {
            tracing::warn!(%error, "reconciliation audit append failed");
        }
        Ok(true)
    }

    async fn target_for(&self, ticket: &Ticket) -> Result<ProgressPrediction, OracleError> {
        let status = normalized_status(ticket.status);
        let staffed = ticket.has_assigned_workers();
        if status == TicketStatus::Resolved {
            return Ok(ProgressPrediction {
                percent: 100,
                confidence: 1.0,
                provenance: provenance::STATUS_RESOLVED,
            });
        }
        if status == TicketStatus::Open && !staffed {
            return Ok(ProgressPrediction {
                percent: 0,
                confidence: 1.0,
                provenance: provenance::AWAITING_ASSIGNMENT,
            });
        }

        let context = progress_context(ticket, status, staffed);
        let mut prediction = self.oracle.predict_progress(&context).await?;
        if status == TicketStatus::Open {
            prediction.percent = prediction.percent.min(OPEN_CAP);
        }
        if status == TicketStatus::InProgress && staffed {
            prediction.percent = prediction.percent.max(ASSIGNED_FLOOR);
        }
        // estimates only ever move forward; official resets rewrite the
        // stored percent directly and bypass this pass
        prediction.percent = prediction.percent.max(ticket.progress_percent);
        Ok(prediction)
    }

    /// Run the pass forever on a fixed cadence until the handle stops it.
    pub fn spawn(self: Arc<Self>, every: Duration) -> TaskHandle {
        TaskHandle::spawn("progress-reconciliation", every, move || {
            let task = Arc::clone(&self);
            async move {
                match task.run_pass().await {
                    Ok(summary) => tracing::debug!(?summary, "progress pass complete"),
                    Err(error) => tracing::warn!(%error, "progress pass failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use safelive_core::ticket::Assignee;
    use safelive_store::MemoryStore;
    use safelive_test_utils::{incident_with_ticket, worker, ManualClock, ScriptedOracle};

    struct Fixture {
        store: MemoryStore,
        oracle: Arc<ScriptedOracle>,
        task: ProgressTask,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let oracle = ScriptedOracle::new();
        let clock = ManualClock::default_start();
        let task = ProgressTask::new(
            store.incidents.clone(),
            store.tickets.clone(),
            store.audit.clone(),
            oracle.clone(),
            Arc::new(clock.clone()),
        );
        Fixture {
            store,
            oracle,
            task,
            clock,
        }
    }

    async fn seed_ticket(fx: &Fixture, mutate: impl FnOnce(&mut Ticket)) -> Ticket {
        let (incident, mut ticket) = incident_with_ticket(fx.clock.now());
        mutate(&mut ticket);
        fx.store.incidents.insert(incident).await.unwrap();
        fx.store.tickets.insert(ticket.clone()).await.unwrap();
        ticket
    }

    fn staffed(ticket: &mut Ticket, now: DateTime<Utc>) {
        let account = worker("Wasim Worker");
        ticket.assignees.push(Assignee {
            worker_id: account.id,
            name: account.name,
            phone: account.phone,
            email: account.email,
            specialization: "Plumbing".into(),
            assigned_at: now,
        });
    }

    #[tokio::test]
    async fn resolved_tickets_are_pinned_at_one_hundred() {
        let fx = fixture();
        let ticket = seed_ticket(&fx, |t| {
            t.status = TicketStatus::Resolved;
            t.progress_percent = 70;
            t.progress_source = Some(provenance::HEURISTIC_FALLBACK.into());
        })
        .await;

        let summary = fx.task.run_pass().await.unwrap();
        assert_eq!(summary.updated, 1);

        let stored = fx.store.tickets.get(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, 100);
        assert_eq!(stored.progress_source.as_deref(), Some(provenance::STATUS_RESOLVED));
        assert_eq!(stored.progress_confidence, 1.0);

        let entries = fx.store.audit.for_ticket(ticket.id).await.unwrap();
        assert_eq!(entries[0].action, actions::PROGRESS_RECONCILED);
    }

    #[tokio::test]
    async fn unassigned_open_tickets_are_pinned_at_zero() {
        let fx = fixture();
        let ticket = seed_ticket(&fx, |t| {
            t.progress_percent = 25;
            t.progress_source = Some(provenance::HEURISTIC_FALLBACK.into());
        })
        .await;

        fx.task.run_pass().await.unwrap();
        let stored = fx.store.tickets.get(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, 0);
        assert_eq!(
            stored.progress_source.as_deref(),
            Some(provenance::AWAITING_ASSIGNMENT)
        );
    }

    #[tokio::test]
    async fn open_estimates_are_capped_and_staffed_ones_floored() {
        let fx = fixture();
        let now = fx.clock.now();
        fx.oracle.script_progress(90, 0.9);
        let open = seed_ticket(&fx, |t| staffed(t, now)).await;

        fx.oracle.script_progress(90, 0.9);
        fx.task.run_pass().await.unwrap();
        let stored = fx.store.tickets.get(open.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, OPEN_CAP);

        fx.oracle.script_progress(5, 0.9);
        let low = seed_ticket(&fx, |t| {
            t.status = TicketStatus::InProgress;
            staffed(t, now);
        })
        .await;
        fx.task.run_pass().await.unwrap();
        let stored = fx.store.tickets.get(low.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, ASSIGNED_FLOOR);
    }

    #[tokio::test]
    async fn pending_tickets_estimate_like_open_ones() {
        let fx = fixture();
        let now = fx.clock.now();
        fx.oracle.script_progress(90, 0.9);

        let unassigned = seed_ticket(&fx, |t| t.status = TicketStatus::Pending).await;
        let staffed_ticket = seed_ticket(&fx, |t| {
            t.status = TicketStatus::Pending;
            staffed(t, now);
        })
        .await;

        fx.task.run_pass().await.unwrap();
        let stored = fx.store.tickets.get(unassigned.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, 0);
        assert_eq!(
            stored.progress_source.as_deref(),
            Some(provenance::AWAITING_ASSIGNMENT)
        );

        let stored = fx.store.tickets.get(staffed_ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, OPEN_CAP);
    }

    #[tokio::test]
    async fn verified_tickets_estimate_like_in_progress_ones() {
        let fx = fixture();
        let now = fx.clock.now();
        fx.oracle.script_progress(5, 0.9);
        let ticket = seed_ticket(&fx, |t| {
            t.status = TicketStatus::Verified;
            staffed(t, now);
        })
        .await;

        fx.task.run_pass().await.unwrap();
        let stored = fx.store.tickets.get(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, ASSIGNED_FLOOR);
    }

    #[test]
    fn oracle_context_carries_the_headline_fields() {
        let (_, mut ticket) = incident_with_ticket(ManualClock::default_start().now());
        ticket.status = TicketStatus::Verified;
        ticket.progress_summary = Some("pipes replaced, testing flow".into());

        let context = progress_context(&ticket, normalized_status(ticket.status), false);
        assert_eq!(
            context,
            "title: Broken streetlight. category: electricity. \
             priority: medium. status: in_progress. workers not assigned. \
             latest update: pipes replaced, testing flow"
        );
    }

    #[tokio::test]
    async fn estimates_never_move_backwards() {
        let fx = fixture();
        let now = fx.clock.now();
        fx.oracle.script_progress(20, 0.9);
        let ticket = seed_ticket(&fx, |t| {
            t.status = TicketStatus::InProgress;
            t.progress_percent = 60;
            t.progress_source = Some(provenance::EXPLICIT_PERCENTAGE.into());
            t.progress_confidence = 0.98;
            staffed(t, now);
        })
        .await;

        fx.task.run_pass().await.unwrap();
        let stored = fx.store.tickets.get(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, 60);
    }

    #[tokio::test]
    async fn consistent_tickets_are_skipped() {
        let fx = fixture();
        seed_ticket(&fx, |t| {
            t.status = TicketStatus::Resolved;
            t.progress_percent = 100;
            t.progress_source = Some(provenance::STATUS_RESOLVED.into());
            t.progress_confidence = 1.0;
        })
        .await;

        let summary = fx.task.run_pass().await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.updated, 0);

        // a second pass over a just-updated ticket is also a no-op
        let first = fx.task.run_pass().await.unwrap();
        assert_eq!(first.updated, 0);
    }

    #[tokio::test]
    async fn oracle_failures_do_not_abort_the_pass() {
        let fx = fixture();
        let now = fx.clock.now();
        fx.oracle.fail(true);
        seed_ticket(&fx, |t| {
            t.status = TicketStatus::InProgress;
            staffed(t, now);
        })
        .await;
        seed_ticket(&fx, |t| t.status = TicketStatus::Resolved).await;

        let summary = fx.task.run_pass().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.updated, 1);
    }
}
