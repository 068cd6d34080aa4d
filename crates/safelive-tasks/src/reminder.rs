//! End-of-day inspector reminders
//!
//! Field inspectors are expected to post at least one update per working
//! day. After the configured local hour, tickets under active remediation
//! with no inspector update that day trigger a reminder email: to the
//! claiming inspector when the ticket has one, otherwise to the whole
//! inspector pool. A per-day flag on the ticket keeps the reminder to one
//! per local day.

use crate::TaskHandle;
use chrono::{FixedOffset, Timelike};
use safelive_core::gateway::{Clock, EmailTemplate, NotificationGateway};
use safelive_core::repo::{TicketRepository, UserRepository};
use safelive_core::{Ticket, TicketStatus, UserRole, WorkflowError};
use std::sync::Arc;
use std::time::Duration;

/// Reminder schedule, expressed in a fixed local timezone
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Local timezone offset from UTC, in minutes. Defaults to IST (+5:30).
    pub utc_offset_minutes: i32,
    /// Local hour (0-23) after which reminders go out
    pub send_after_hour: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            send_after_hour: 18,
        }
    }
}

/// The reminder pass and its ports
pub struct ReminderTask {
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
}

impl ReminderTask {
    /// Wire the pass to its ports
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            tickets,
            users,
            gateway,
            clock,
            config,
        }
    }

    /// Check every active ticket once; returns how many reminders went out.
    pub async fn run_pass(&self) -> Result<usize, WorkflowError> {
        let now = self.clock.now();
        let Some(offset) = FixedOffset::east_opt(self.config.utc_offset_minutes * 60) else {
            tracing::error!(
                offset_minutes = self.config.utc_offset_minutes,
                "invalid reminder timezone offset"
            );
            return Ok(0);
        };
        let local = now.with_timezone(&offset);
        if local.hour() < self.config.send_after_hour {
            return Ok(0);
        }
        let today = local.date_naive();

        let mut sent = 0;
        for mut ticket in self.tickets.list().await? {
            if !matches!(
                ticket.status,
                TicketStatus::InProgress | TicketStatus::Verified
            ) {
                continue;
            }
            if ticket.inspector_reminder_sent_for == Some(today) {
                continue;
            }
            let updated_today = ticket
                .last_inspector_update_at
                .map(|at| at.with_timezone(&offset).date_naive() == today)
                .unwrap_or(false);
            if updated_today {
                continue;
            }

            let recipients = self.recipients_for(&ticket).await?;
            if recipients.is_empty() {
                continue;
            }
            let mut delivered = false;
            for email in &recipients {
                let template = EmailTemplate::InspectorReminder {
                    ticket_title: ticket.title.clone(),
                    location: ticket.location.clone(),
                    last_update_at: ticket.last_inspector_update_at,
                };
                match self.gateway.send_email(email, template).await {
                    Ok(()) => delivered = true,
                    Err(error) => {
                        tracing::warn!(%error, to = %email, "inspector reminder failed");
                    }
                }
            }
            // only a delivered reminder consumes the per-day slot
            if delivered {
                ticket.inspector_reminder_sent_for = Some(today);
                ticket.updated_at = now;
                self.tickets.put(ticket).await?;
                sent += 1;
            }
        }
        Ok(sent)
    }

    async fn recipients_for(&self, ticket: &Ticket) -> Result<Vec<String>, WorkflowError> {
        if let Some(inspector_id) = ticket.field_inspector_id {
            if let Some(account) = self.users.get(inspector_id).await? {
                if let Some(email) = account.email {
                    return Ok(vec![email]);
                }
            }
        }
        // unclaimed tickets nag the whole inspector pool
        let inspectors = self.users.list_by_role(UserRole::FieldInspector).await?;
        Ok(inspectors
            .into_iter()
            .filter_map(|account| account.email)
            .collect())
    }

    /// Run the pass forever on a fixed cadence until the handle stops it.
    pub fn spawn(self: Arc<Self>, every: Duration) -> TaskHandle {
        TaskHandle::spawn("inspector-reminders", every, move || {
            let task = Arc::clone(&self);
            async move {
                match task.run_pass().await {
                    Ok(sent) if sent > 0 => tracing::info!(sent, "inspector reminders sent"),
                    Ok(_) => {}
                    Err(error) => tracing::warn!(%error, "reminder pass failed"),
                }
            }
        })
    }
}
