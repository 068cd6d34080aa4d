//! Best-effort outbound notifications
//!
//! Everything here runs after the transition has committed. Failures are
//! logged and never surfaced to the caller.

use chrono::{DateTime, Utc};
use safelive_core::gateway::{EmailTemplate, NotificationGateway, SmsTemplate};
use safelive_core::repo::UserRepository;
use safelive_core::ticket::ReopenWarning;
use safelive_core::{Incident, Ticket, TicketStatus, UserRole};
use std::collections::BTreeSet;

/// SMS the reporter about the new status; on resolution also email them.
pub(crate) async fn status_update(gateway: &dyn NotificationGateway, ticket: &Ticket) {
    if let Some(phone) = ticket.reporter_phone.as_deref() {
        let template = SmsTemplate::StatusUpdate {
            ticket_title: ticket.title.clone(),
            status: ticket.status,
        };
        if let Err(error) = gateway.send_sms(phone, template).await {
            tracing::warn!(%error, "status sms failed");
        }
    }
    if ticket.status == TicketStatus::Resolved {
        if let Some(email) = ticket.reporter_email.as_deref() {
            let template = EmailTemplate::ResolutionNotice {
                ticket_title: ticket.title.clone(),
            };
            if let Err(error) = gateway.send_email(email, template).await {
                tracing::warn!(%error, "resolution email failed");
            }
        }
    }
}

/// Email each assigned worker about their new assignment.
pub(crate) async fn assignment_notices(gateway: &dyn NotificationGateway, ticket: &Ticket) {
    let assigned_by = ticket
        .assigned_by_name
        .clone()
        .unwrap_or_else(|| "Supervisor".to_owned());
    for assignee in &ticket.assignees {
        let Some(email) = assignee.email.as_deref() else {
            continue;
        };
        let template = EmailTemplate::WorkerAssignment {
            ticket_title: ticket.title.clone(),
            location: ticket.location.clone(),
            priority: ticket.priority,
            assigned_by: assigned_by.clone(),
        };
        if let Err(error) = gateway.send_email(email, template).await {
            tracing::warn!(%error, to = email, "assignment email failed");
        }
    }
}

/// Alert the official stakeholders that a fresh incident arrived. Callers
/// skip this while the incident is held for critical review.
pub(crate) async fn stakeholder_alert(
    gateway: &dyn NotificationGateway,
    users: &dyn UserRepository,
    incident: &Incident,
) {
    let mut emails = BTreeSet::new();
    let mut phones = BTreeSet::new();
    for role in [
        UserRole::HeadSupervisor,
        UserRole::Supervisor,
        UserRole::Department,
    ] {
        match users.list_by_role(role).await {
            Ok(accounts) => {
                for account in accounts {
                    if let Some(email) = account.email {
                        emails.insert(email);
                    }
                    if let Some(phone) = account.phone {
                        phones.insert(phone);
                    }
                }
            }
            Err(error) => tracing::warn!(%error, "stakeholder lookup failed"),
        }
    }

    for email in &emails {
        let template = EmailTemplate::StakeholderAlert {
            description: incident.description.clone(),
            latitude: incident.latitude,
            longitude: incident.longitude,
        };
        if let Err(error) = gateway.send_email(email, template).await {
            tracing::warn!(%error, to = %email, "stakeholder alert email failed");
        }
    }
    for phone in &phones {
        let template = SmsTemplate::StakeholderAlert {
            description: incident.description.clone(),
            latitude: incident.latitude,
            longitude: incident.longitude,
        };
        if let Err(error) = gateway.send_sms(phone, template).await {
            tracing::warn!(%error, "stakeholder alert sms failed");
        }
    }
}

/// Warn every assigned worker that the ticket came back, then hand the
/// warning record to the caller for persistence.
pub(crate) async fn reopen_notices(
    gateway: &dyn NotificationGateway,
    users: &dyn UserRepository,
    ticket: &Ticket,
    department_name: &str,
    now: DateTime<Utc>,
) -> ReopenWarning {
    let message = format!(
        "Ticket '{}' was reopened by {}. Earlier progress was reset; please revisit the site.",
        ticket.title, department_name
    );

    let mut emails = BTreeSet::new();
    let mut phones = BTreeSet::new();
    for assignee in &ticket.assignees {
        if let Some(email) = assignee.email.clone() {
            emails.insert(email);
        }
        if let Some(phone) = assignee.phone.clone() {
            phones.insert(phone);
        }
    }
    // assignee snapshots can predate a contact-detail change
    for worker_id in ticket.worker_ids() {
        match users.get(worker_id).await {
            Ok(Some(account)) => {
                if let Some(email) = account.email {
                    emails.insert(email);
                }
                if let Some(phone) = account.phone {
                    phones.insert(phone);
                }
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "worker lookup failed during reopen notice"),
        }
    }

    for email in &emails {
        let template = EmailTemplate::ReopenWarning {
            ticket_title: ticket.title.clone(),
            department_name: department_name.to_owned(),
            message: message.clone(),
        };
        if let Err(error) = gateway.send_email(email, template).await {
            tracing::warn!(%error, to = %email, "reopen email failed");
        }
    }
    for phone in &phones {
        let template = SmsTemplate::StatusUpdate {
            ticket_title: ticket.title.clone(),
            status: TicketStatus::Open,
        };
        if let Err(error) = gateway.send_sms(phone, template).await {
            tracing::warn!(%error, "reopen sms failed");
        }
    }

    ReopenWarning {
        message,
        issued_at: now,
        department_name: department_name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use safelive_core::gateway::Clock;
    use safelive_core::ticket::Assignee;
    use safelive_store::MemoryUsers;
    use safelive_test_utils::{incident_with_ticket, worker, ManualClock, RecordingGateway};

    #[tokio::test]
    async fn resolution_reaches_both_reporter_channels() {
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let (_, mut ticket) = incident_with_ticket(clock.now());
        ticket.status = TicketStatus::Resolved;
        ticket.reporter_email = Some("chitra@safelive.test".into());
        ticket.reporter_phone = Some("+911111115555".into());

        status_update(gateway.as_ref(), &ticket).await;

        assert_eq!(gateway.sms().len(), 1);
        assert_eq!(gateway.email_recipients(), vec!["chitra@safelive.test"]);
    }

    #[tokio::test]
    async fn unresolved_statuses_send_sms_only() {
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let (_, mut ticket) = incident_with_ticket(clock.now());
        ticket.status = TicketStatus::InProgress;
        ticket.reporter_email = Some("chitra@safelive.test".into());
        ticket.reporter_phone = Some("+911111115555".into());

        status_update(gateway.as_ref(), &ticket).await;

        assert_eq!(gateway.sms().len(), 1);
        assert!(gateway.emails().is_empty());
    }

    #[tokio::test]
    async fn stakeholder_alerts_reach_every_official_channel() {
        let clock = ManualClock::default_start();
        let gateway = RecordingGateway::new();
        let users = MemoryUsers::default();
        users.insert(safelive_test_utils::supervisor()).await.unwrap();
        users.insert(safelive_test_utils::department()).await.unwrap();
        users.insert(safelive_test_utils::field_inspector()).await.unwrap();
        let (incident, _) = incident_with_ticket(clock.now());

        stakeholder_alert(gateway.as_ref(), &users, &incident).await;

        let mut recipients = gateway.email_recipients();
        recipients.sort();
        // inspectors are not in the stakeholder audience
        assert_eq!(recipients, vec!["dev@safelive.test", "sita@safelive.test"]);
        // only the supervisor fixture carries a phone number
        assert_eq!(gateway.sms().len(), 1);
    }

    #[tokio::test]
    async fn reopen_notices_reach_deduplicated_contacts() {
        let clock = ManualClock::default_start();
        let now = clock.now();
        let gateway = RecordingGateway::new();
        let users = MemoryUsers::default();
        let account = worker("Wasim Worker");
        let email = account.email.clone().unwrap();
        users.insert(account.clone()).await.unwrap();

        let (_, mut ticket) = incident_with_ticket(now);
        // the assignee snapshot carries the same contact as the account
        ticket.assignees.push(Assignee {
            worker_id: account.id,
            name: account.name.clone(),
            phone: account.phone.clone(),
            email: account.email.clone(),
            specialization: "Plumbing".into(),
            assigned_at: now,
        });

        let warning = reopen_notices(gateway.as_ref(), &users, &ticket, "Dev Department", now).await;

        assert_eq!(gateway.email_recipients(), vec![email]);
        assert_eq!(gateway.sms().len(), 1);
        assert_eq!(warning.department_name, "Dev Department");
        assert!(warning.message.contains("reopened by Dev Department"));
    }
}
