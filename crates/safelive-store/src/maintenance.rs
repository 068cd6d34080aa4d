//! Store maintenance sweeps
//!
//! Two housekeeping passes run at process start and periodically: dropping
//! tickets whose incident no longer exists, and expiring stale OTP
//! challenges in lieu of a database TTL index.

use chrono::{DateTime, Utc};
use safelive_core::repo::{IncidentRepository, OtpRepository, StoreError, TicketRepository};

/// Delete tickets whose owning incident is gone. Returns how many were
/// removed.
pub async fn purge_orphan_tickets(
    incidents: &dyn IncidentRepository,
    tickets: &dyn TicketRepository,
) -> Result<usize, StoreError> {
    let mut purged = 0;
    for ticket in tickets.list().await? {
        if incidents.get(ticket.incident_id).await?.is_none() {
            if tickets.delete(ticket.id).await? {
                purged += 1;
            }
            tracing::info!(ticket_id = %ticket.id, incident_id = %ticket.incident_id, "purged orphan ticket");
        }
    }
    Ok(purged)
}

/// Drop OTP challenges past their expiry. Returns how many were removed.
pub async fn sweep_expired_challenges(
    otp: &dyn OtpRepository,
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let removed = otp.purge_expired(now).await?;
    if removed > 0 {
        tracing::debug!(removed, "swept expired otp challenges");
    }
    Ok(removed)
}
