//! Critical-incident review
//!
//! Critical reports wait in `pending` until one reviewer approves them. Each
//! eligible reviewer gets a pair of single-use one-click links; only SHA-256
//! digests of the tokens are persisted. One approval wins immediately; a
//! rejection only finalizes once every reviewer has rejected.

use crate::actions;
use crate::config::WorkflowConfig;
use chrono::{DateTime, Duration, Utc};
use safelive_core::approval::{
    ApprovalRecipient, ApprovalState, CriticalApproval, ReviewDecision,
};
use safelive_core::gateway::{Clock, EmailTemplate, NotificationGateway};
use safelive_core::repo::{
    AuditLogRepository, IncidentRepository, TicketRepository, UserRepository,
};
use safelive_core::{
    AuditLogEntry, Incident, IncidentId, IncidentStatus, TicketStatus, UserRole, WorkflowError,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// `pendingReason` while the review is open
pub const PENDING_APPROVAL_REQUIRED: &str = "critical_email_approval_required";
/// `pendingReason` when no reviewer account had an email address
pub const PENDING_RECIPIENTS_UNAVAILABLE: &str = "critical_email_recipients_unavailable";
/// `pendingReason` once every reviewer rejected
pub const PENDING_REJECTED: &str = "critical_email_rejected";
/// `pendingReason` once the review window elapsed undecided
pub const PENDING_EXPIRED: &str = "critical_email_approval_expired";

/// Raw token pair for one reviewer. Lives only long enough to be mailed out.
#[derive(Debug, Clone)]
pub struct RecipientTokens {
    /// Reviewer email
    pub email: String,
    /// Reviewer display name
    pub name: String,
    /// Raw approve token
    pub approve_token: String,
    /// Raw reject token
    pub reject_token: String,
}

/// Human-readable result of a one-click review decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    /// Confirmation-page heading
    pub title: String,
    /// Confirmation-page body
    pub message: String,
    /// Aggregate review state after this decision
    pub state: ApprovalState,
}

fn generate_token() -> String {
    let bytes: [u8; 24] = rand::random();
    hex::encode(bytes)
}

fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

fn token_matches(raw: &str, digest_hex: &str) -> bool {
    hash_token(raw).as_bytes().ct_eq(digest_hex.as_bytes()).into()
}

/// Mark the incident pending and attach an approval block covering every
/// reviewer account that has an email address. Returns the raw token pairs
/// for [`send_review_requests`]; nothing else ever sees them.
pub(crate) async fn begin_review(
    users: &dyn UserRepository,
    config: &WorkflowConfig,
    incident: &mut Incident,
    now: DateTime<Utc>,
) -> Result<Vec<RecipientTokens>, WorkflowError> {
    let mut reviewers = Vec::new();
    for role in [
        UserRole::HeadSupervisor,
        UserRole::Supervisor,
        UserRole::Department,
    ] {
        reviewers.extend(users.list_by_role(role).await?);
    }

    let mut seen = HashSet::new();
    let mut recipients = Vec::new();
    let mut tokens = Vec::new();
    for account in reviewers {
        let Some(email) = account.email.clone() else {
            continue;
        };
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !seen.insert(email.clone()) {
            continue;
        }
        let approve_token = generate_token();
        let reject_token = generate_token();
        recipients.push(ApprovalRecipient {
            email: email.clone(),
            name: account.display_name().to_owned(),
            role: account.role,
            decision: ReviewDecision::Pending,
            decision_at: None,
            approve_token_hash: hash_token(&approve_token),
            reject_token_hash: hash_token(&reject_token),
        });
        tokens.push(RecipientTokens {
            email,
            name: account.display_name().to_owned(),
            approve_token,
            reject_token,
        });
    }

    incident.status = IncidentStatus::Pending;
    if recipients.is_empty() {
        tracing::warn!(incident = %incident.id, "no critical reviewers available");
        incident.pending_reason = Some(PENDING_RECIPIENTS_UNAVAILABLE.to_owned());
        incident.critical_approval = Some(CriticalApproval {
            required: true,
            state: ApprovalState::Unavailable,
            requested_at: now,
            expires_at: now,
            last_decision_at: None,
            recipients: Vec::new(),
        });
        return Ok(Vec::new());
    }

    incident.pending_reason = Some(PENDING_APPROVAL_REQUIRED.to_owned());
    incident.critical_approval = Some(CriticalApproval {
        required: true,
        state: ApprovalState::Pending,
        requested_at: now,
        expires_at: now + Duration::hours(config.approval_expire_hours),
        last_decision_at: None,
        recipients,
    });
    Ok(tokens)
}

/// Mail each reviewer their one-click approve/reject links. Best effort.
pub(crate) async fn send_review_requests(
    gateway: &dyn NotificationGateway,
    config: &WorkflowConfig,
    incident: &Incident,
    tokens: &[RecipientTokens],
) {
    let Some(approval) = incident.critical_approval.as_ref() else {
        return;
    };
    let severity = incident
        .severity
        .map(|s| s.as_str().to_owned())
        .or_else(|| incident.priority.map(|p| p.as_str().to_owned()))
        .unwrap_or_else(|| "critical".to_owned());

    for pair in tokens {
        let approve_url = format!(
            "{}/incidents/{}/review?decision=approve&token={}",
            config.review_base_url, incident.id, pair.approve_token
        );
        let reject_url = format!(
            "{}/incidents/{}/review?decision=reject&token={}",
            config.review_base_url, incident.id, pair.reject_token
        );
        let template = EmailTemplate::CriticalApprovalRequest {
            incident_title: incident.title.clone(),
            category: incident.category.clone(),
            location: incident.location.clone(),
            severity: severity.clone(),
            approve_url,
            reject_url,
            expires_at: approval.expires_at,
        };
        if let Err(error) = gateway.send_email(&pair.email, template).await {
            tracing::warn!(%error, to = %pair.email, "review request email failed");
        }
    }
}

/// Records one-click review decisions against pending critical incidents.
pub struct ApprovalService {
    incidents: Arc<dyn IncidentRepository>,
    tickets: Arc<dyn TicketRepository>,
    audit: Arc<dyn AuditLogRepository>,
    gateway: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
}

impl ApprovalService {
    /// Wire the service to its ports
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        tickets: Arc<dyn TicketRepository>,
        audit: Arc<dyn AuditLogRepository>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            incidents,
            tickets,
            audit,
            gateway,
            clock,
        }
    }

    /// Record the decision carried by a review token.
    ///
    /// The token identifies both the reviewer and the intended decision; a
    /// mismatched or replayed token never mutates anything. One approval
    /// immediately moves the incident (and its ticket) to `in_progress`.
    pub async fn decide(
        &self,
        incident_id: IncidentId,
        decision: ReviewDecision,
        token: &str,
    ) -> Result<ReviewOutcome, WorkflowError> {
        if decision == ReviewDecision::Pending {
            return Err(WorkflowError::validation("decision must be approve or reject"));
        }
        let now = self.clock.now();
        let mut incident = self
            .incidents
            .get(incident_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("incident not found"))?;
        let Some(mut approval) = incident.critical_approval.clone() else {
            return Err(WorkflowError::validation("incident has no critical review"));
        };
        match approval.state {
            ApprovalState::Unavailable => {
                return Err(WorkflowError::validation(
                    "review never started; no reviewers were available",
                ))
            }
            ApprovalState::Approved | ApprovalState::Rejected | ApprovalState::Expired => {
                return Err(WorkflowError::conflict("this review has already been completed"))
            }
            ApprovalState::Pending => {}
        }
        if approval.is_expired(now) {
            approval.state = ApprovalState::Expired;
            incident.pending_reason = Some(PENDING_EXPIRED.to_owned());
            incident.critical_approval = Some(approval);
            incident.updated_at = now;
            self.incidents.put(incident.clone()).await?;
            self.log_review(&incident, actions::CRITICAL_REVIEW_EXPIRED, json!({}), now)
                .await;
            return Err(WorkflowError::conflict("the review window has expired"));
        }

        let Some(index) = approval.recipients.iter().position(|recipient| {
            let digest = match decision {
                ReviewDecision::Approve => recipient.approve_token_hash.as_str(),
                _ => recipient.reject_token_hash.as_str(),
            };
            token_matches(token, digest)
        }) else {
            return Err(WorkflowError::authorization("invalid review token"));
        };

        let recipient = &mut approval.recipients[index];
        if recipient.decision == decision {
            return Err(WorkflowError::conflict("this decision was already submitted"));
        }
        if recipient.decision != ReviewDecision::Pending {
            return Err(WorkflowError::conflict(
                "a different decision was already submitted from this address",
            ));
        }
        recipient.decision = decision;
        recipient.decision_at = Some(now);
        let decided_by = recipient.name.clone();

        approval.last_decision_at = Some(now);
        let aggregate = approval.aggregate_state();
        approval.state = aggregate;
        incident.critical_approval = Some(approval.clone());
        incident.updated_at = now;

        let outcome = match aggregate {
            ApprovalState::Approved => {
                incident.status = IncidentStatus::InProgress;
                incident.pending_reason = None;
                ReviewOutcome {
                    title: "Approval Recorded".into(),
                    message: format!(
                        "Incident '{}' has been approved for remediation.",
                        incident.title
                    ),
                    state: aggregate,
                }
            }
            ApprovalState::Rejected => {
                incident.pending_reason = Some(PENDING_REJECTED.to_owned());
                ReviewOutcome {
                    title: "Rejection Recorded".into(),
                    message: format!(
                        "Incident '{}' was rejected by every reviewer and stays pending.",
                        incident.title
                    ),
                    state: aggregate,
                }
            }
            _ => ReviewOutcome {
                title: "Decision Recorded".into(),
                message: "Your decision has been recorded. The incident stays pending until a \
                          reviewer approves it."
                    .into(),
                state: aggregate,
            },
        };
        self.incidents.put(incident.clone()).await?;

        match aggregate {
            ApprovalState::Approved => {
                if let Some(mut ticket) = self.tickets.get_by_incident(incident.id).await? {
                    ticket.status = TicketStatus::InProgress;
                    ticket.updated_at = now;
                    self.tickets.put(ticket).await?;
                }
                self.log_review(
                    &incident,
                    actions::CRITICAL_APPROVED,
                    json!({ "decidedBy": decided_by }),
                    now,
                )
                .await;
            }
            ApprovalState::Rejected => {
                self.log_review(
                    &incident,
                    actions::CRITICAL_REJECTED,
                    json!({ "decidedBy": decided_by }),
                    now,
                )
                .await;
            }
            _ => {}
        }

        if matches!(aggregate, ApprovalState::Approved | ApprovalState::Rejected) {
            for reviewer in &approval.recipients {
                let template = EmailTemplate::CriticalApprovalOutcome {
                    incident_title: incident.title.clone(),
                    approved: aggregate == ApprovalState::Approved,
                    decided_by: decided_by.clone(),
                };
                if let Err(error) = self.gateway.send_email(&reviewer.email, template).await {
                    tracing::warn!(%error, to = %reviewer.email, "outcome email failed");
                }
            }
        }

        Ok(outcome)
    }

    async fn log_review(
        &self,
        incident: &Incident,
        action: &str,
        details: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let Some(ticket_id) = incident.ticket_id else {
            return;
        };
        let entry =
            AuditLogEntry::system(ticket_id, action, details, now).with_incident(incident.id);
        if let Err(error) = self.audit.append(entry).await {
            tracing::warn!(%error, "review audit append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use safelive_core::gateway::Clock as _;
    use safelive_core::{Priority, Ticket, UserAccount};
    use safelive_store::MemoryStore;
    use safelive_test_utils::{seeded_store, ManualClock, RecordingGateway};

    async fn critical_incident(
        store: &MemoryStore,
        config: &WorkflowConfig,
        now: DateTime<Utc>,
    ) -> (Incident, Vec<RecipientTokens>) {
        let mut incident =
            Incident::new("Gas leak", "Strong smell near the market", "emergency", "Market Rd", now);
        incident.priority = Some(Priority::Critical);
        let tokens = begin_review(store.users.as_ref(), config, &mut incident, now)
            .await
            .unwrap();
        let ticket = Ticket::from_incident(&incident, now);
        incident.ticket_id = Some(ticket.id);
        store.tickets.insert(ticket).await.unwrap();
        store.incidents.insert(incident.clone()).await.unwrap();
        (incident, tokens)
    }

    fn service(store: &MemoryStore, gateway: Arc<RecordingGateway>, clock: ManualClock) -> ApprovalService {
        ApprovalService::new(
            store.incidents.clone(),
            store.tickets.clone(),
            store.audit.clone(),
            gateway,
            Arc::new(clock),
        )
    }

    #[tokio::test]
    async fn reviewers_are_deduplicated_by_email() {
        let (store, officials) = seeded_store().await;
        // a second account sharing the supervisor's address must fold away
        let duplicate = UserAccount::new("Head", UserRole::HeadSupervisor)
            .with_email(officials.supervisor.email.clone().unwrap().to_uppercase());
        store.users.insert(duplicate).await.unwrap();

        let clock = ManualClock::default_start();
        let config = WorkflowConfig::default();
        let mut incident = Incident::new("t", "d", "emergency", "l", clock.now());
        let tokens = begin_review(store.users.as_ref(), &config, &mut incident, clock.now())
            .await
            .unwrap();

        // supervisor + department, each once
        assert_eq!(tokens.len(), 2);
        let approval = incident.critical_approval.unwrap();
        assert_eq!(approval.state, ApprovalState::Pending);
        assert_eq!(incident.pending_reason.as_deref(), Some(PENDING_APPROVAL_REQUIRED));
    }

    #[tokio::test]
    async fn no_reviewers_marks_the_block_unavailable() {
        let store = MemoryStore::new();
        let clock = ManualClock::default_start();
        let config = WorkflowConfig::default();
        let mut incident = Incident::new("t", "d", "emergency", "l", clock.now());
        let tokens = begin_review(store.users.as_ref(), &config, &mut incident, clock.now())
            .await
            .unwrap();

        assert!(tokens.is_empty());
        let approval = incident.critical_approval.unwrap();
        assert_eq!(approval.state, ApprovalState::Unavailable);
        assert_eq!(
            incident.pending_reason.as_deref(),
            Some(PENDING_RECIPIENTS_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn first_approval_wins_and_starts_work() {
        let (store, _) = seeded_store().await;
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let config = WorkflowConfig::default();
        let (incident, tokens) = critical_incident(&store, &config, clock.now()).await;
        let service = service(&store, gateway.clone(), clock);

        let outcome = service
            .decide(incident.id, ReviewDecision::Approve, &tokens[0].approve_token)
            .await
            .unwrap();

        assert_eq!(outcome.state, ApprovalState::Approved);
        assert_eq!(outcome.title, "Approval Recorded");

        let stored = store.incidents.get(incident.id).await.unwrap().unwrap();
        assert_eq!(stored.status, IncidentStatus::InProgress);
        assert!(stored.pending_reason.is_none());

        let ticket = store
            .tickets
            .get_by_incident(incident.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::InProgress);

        // outcome broadcast reaches every reviewer
        assert_eq!(gateway.emails().len(), tokens.len());
    }

    #[tokio::test]
    async fn repeated_decisions_conflict() {
        let (store, _) = seeded_store().await;
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let config = WorkflowConfig::default();
        let (incident, tokens) = critical_incident(&store, &config, clock.now()).await;
        let service = service(&store, gateway, clock);

        service
            .decide(incident.id, ReviewDecision::Approve, &tokens[0].approve_token)
            .await
            .unwrap();
        let error = service
            .decide(incident.id, ReviewDecision::Approve, &tokens[0].approve_token)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejection_finalizes_only_when_everyone_rejected() {
        let (store, _) = seeded_store().await;
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let config = WorkflowConfig::default();
        let (incident, tokens) = critical_incident(&store, &config, clock.now()).await;
        let service = service(&store, gateway, clock);

        let first = service
            .decide(incident.id, ReviewDecision::Reject, &tokens[0].reject_token)
            .await
            .unwrap();
        assert_eq!(first.state, ApprovalState::Pending);
        assert_eq!(first.title, "Decision Recorded");

        let last = service
            .decide(incident.id, ReviewDecision::Reject, &tokens[1].reject_token)
            .await
            .unwrap();
        assert_eq!(last.state, ApprovalState::Rejected);

        let stored = store.incidents.get(incident.id).await.unwrap().unwrap();
        assert_eq!(stored.status, IncidentStatus::Pending);
        assert_eq!(stored.pending_reason.as_deref(), Some(PENDING_REJECTED));
    }

    #[tokio::test]
    async fn stale_links_expire_the_review() {
        let (store, _) = seeded_store().await;
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let config = WorkflowConfig::default();
        let (incident, tokens) = critical_incident(&store, &config, clock.now()).await;
        clock.advance(Duration::hours(25));
        let service = service(&store, gateway, clock);

        let error = service
            .decide(incident.id, ReviewDecision::Approve, &tokens[0].approve_token)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Conflict(_)));

        let stored = store.incidents.get(incident.id).await.unwrap().unwrap();
        let approval = stored.critical_approval.unwrap();
        assert_eq!(approval.state, ApprovalState::Expired);
        assert_eq!(stored.pending_reason.as_deref(), Some(PENDING_EXPIRED));
    }

    #[tokio::test]
    async fn wrong_tokens_are_rejected() {
        let (store, _) = seeded_store().await;
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let config = WorkflowConfig::default();
        let (incident, tokens) = critical_incident(&store, &config, clock.now()).await;
        let service = service(&store, gateway, clock);

        // a reject token cannot approve
        let error = service
            .decide(incident.id, ReviewDecision::Approve, &tokens[0].reject_token)
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Authorization(_)));
    }
}
