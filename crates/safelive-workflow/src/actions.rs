//! Audit logbook action names
//!
//! One constant per logbook action so entries stay greppable across crates.
//! Never rename a constant's value; old documents carry the old strings.

/// Ticket mirror created at intake
pub const TICKET_CREATED: &str = "ticket_created";

/// Ordinary status transition
pub const STATUS_CHANGED: &str = "ticket_status_updated";

/// Department reopened a resolved ticket
pub const TICKET_REOPENED: &str = "ticket_reopened_by_department";

/// Supervisor assigned workers
pub const WORKER_ASSIGNED_BY_SUPERVISOR: &str = "worker_assigned_by_supervisor";

/// Department assigned workers on a reopened ticket
pub const WORKER_ASSIGNED_BY_DEPARTMENT: &str = "worker_assigned_by_department";

/// Field inspector posted a progress update
pub const PROGRESS_BY_FIELD_INSPECTOR: &str = "progress_updated_by_field_inspector";

/// Worker posted a progress update
pub const PROGRESS_BY_WORKER: &str = "progress_updated_by_worker";

/// Background pass reconciled the progress fields
pub const PROGRESS_RECONCILED: &str = "progress_reconciled";

/// A reviewer approved a critical incident
pub const CRITICAL_APPROVED: &str = "critical_incident_approved";

/// Every reviewer rejected a critical incident
pub const CRITICAL_REJECTED: &str = "critical_incident_rejected";

/// The critical review window elapsed undecided
pub const CRITICAL_REVIEW_EXPIRED: &str = "critical_review_expired";
