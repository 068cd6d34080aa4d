//! Incident intake
//!
//! Two front doors: citizen reports (validated strictly, rejected on bad
//! input) and sensor reports (sanitized leniently, never bounced for a
//! missing title). Both produce an incident plus its mirrored ticket, with
//! the back-reference filled in after the pair exists.

use crate::actions;
use crate::approval;
use crate::config::WorkflowConfig;
use crate::notify;
use crate::predict;
use chrono::{DateTime, Utc};
use safelive_core::gateway::{Clock, EmailTemplate, NotificationGateway};
use safelive_core::incident::{AiPriority, IngestionMeta};
use safelive_core::oracle::{PredictionOracle, PriorityInput};
use safelive_core::repo::{
    AuditLogRepository, IncidentRepository, TicketRepository, UserRepository,
};
use safelive_core::{
    AuditLogEntry, Incident, IncidentId, IncidentStatus, Priority, Severity, Ticket, TicketId,
    UserAccount, UserRole, WorkflowError,
};
use serde_json::json;
use std::sync::Arc;

/// A report submitted by a signed-in citizen
#[derive(Debug, Clone, Default)]
pub struct CitizenReport {
    /// Short title
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Municipal category
    pub category: String,
    /// Human-readable location
    pub location: String,
    /// Latitude, if the client had a fix
    pub latitude: Option<f64>,
    /// Longitude, if the client had a fix
    pub longitude: Option<f64>,
    /// Reporter-stated severity label
    pub severity: Option<String>,
    /// Reporter-stated impact scope
    pub scope: Option<String>,
    /// Submission source override
    pub source: Option<String>,
}

/// A report pushed by an edge device
#[derive(Debug, Clone, Default)]
pub struct IotReport {
    /// Reporting device id
    pub device_id: String,
    /// Device-side event id; retries reuse it
    pub event_id: String,
    /// Optional title; defaulted when absent
    pub title: Option<String>,
    /// Optional description; defaulted when absent
    pub description: Option<String>,
    /// Optional category; defaults to `general`
    pub category: Option<String>,
    /// Optional location text
    pub location: Option<String>,
    /// Latitude
    pub latitude: Option<f64>,
    /// Longitude
    pub longitude: Option<f64>,
    /// Sensor severity label; aliases are tolerated
    pub severity: Option<String>,
    /// Impact scope token
    pub scope: Option<String>,
    /// Source token; defaults to `iot_sensor`
    pub source: Option<String>,
    /// Sensor type label
    pub sensor_type: Option<String>,
    /// Device-side detection confidence
    pub confidence: Option<f64>,
    /// Device-side capture time
    pub captured_at: Option<DateTime<Utc>>,
    /// Remote address as seen by the transport layer
    pub remote_ip: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
}

/// Acknowledgement returned to the device
#[derive(Debug, Clone)]
pub struct IotAck {
    /// Incident this event maps to
    pub incident_id: IncidentId,
    /// Mirrored ticket, once created
    pub ticket_id: Option<TicketId>,
    /// Echo of the device event id
    pub event_id: String,
    /// When the event was first ingested
    pub received_at: DateTime<Utc>,
    /// Whether this submission was a retry of an already-ingested event
    pub duplicate: bool,
}

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2000;
const LOCATION_MAX: usize = 300;

fn clip(value: &str, max: usize) -> String {
    let trimmed = value.trim();
    trimmed.chars().take(max).collect()
}

fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), WorkflowError> {
    if let Some(latitude) = latitude {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(WorkflowError::validation("latitude must be within [-90, 90]"));
        }
    }
    if let Some(longitude) = longitude {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(WorkflowError::validation("longitude must be within [-180, 180]"));
        }
    }
    Ok(())
}

/// Ingests citizen and sensor reports and deletes incidents with their
/// mirrored tickets.
pub struct IntakeService {
    incidents: Arc<dyn IncidentRepository>,
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserRepository>,
    audit: Arc<dyn AuditLogRepository>,
    gateway: Arc<dyn NotificationGateway>,
    oracle: Arc<dyn PredictionOracle>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
}

impl IntakeService {
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
        config: WorkflowConfig,
    ) -> Self {
        Self {
            incidents,
            tickets,
            users,
            audit,
            gateway,
            oracle,
            clock,
            config,
        }
    }

    /// Ingest a citizen report: predict a priority, gate critical ones
    /// behind reviewer approval, and create the incident/ticket pair.
    pub async fn report_citizen(
        &self,
        report: CitizenReport,
        reporter: &UserAccount,
    ) -> Result<Incident, WorkflowError> {
        let title = report.title.trim();
        if title.is_empty() {
            return Err(WorkflowError::validation("title is required"));
        }
        let description = report.description.trim();
        if description.is_empty() {
            return Err(WorkflowError::validation("description is required"));
        }
        let category = report.category.trim().to_lowercase();
        if category.is_empty() {
            return Err(WorkflowError::validation("category is required"));
        }
        let location = report.location.trim();
        if location.is_empty() {
            return Err(WorkflowError::validation("location is required"));
        }
        validate_coordinates(report.latitude, report.longitude)?;

        let now = self.clock.now();
        let source = report.source.clone().or_else(|| Some("citizen".to_owned()));
        let input = PriorityInput {
            title: title.to_owned(),
            description: description.to_owned(),
            category: category.clone(),
            severity: report.severity.clone(),
            scope: report.scope.clone(),
            source: source.clone(),
            location: Some(location.to_owned()),
        };
        let prediction = predict::priority_with_fallback(self.oracle.as_ref(), &input).await;

        let mut incident = Incident::new(title, description, category, location, now);
        incident.latitude = report.latitude;
        incident.longitude = report.longitude;
        incident.severity = report.severity.as_deref().map(Severity::parse_lenient);
        incident.scope = report.scope;
        incident.source = source;
        incident.reported_by = Some(reporter.display_name().to_owned());
        incident.reporter_id = Some(reporter.id);
        incident.reporter_email = reporter.email.clone();
        incident.reporter_phone = reporter.phone.clone();
        incident.priority = Some(prediction.priority);
        incident.ai_priority = Some(AiPriority {
            priority: prediction.priority,
            confidence: prediction.confidence,
            provenance: prediction.provenance.to_owned(),
            evaluated_at: now,
        });

        let mut tokens = Vec::new();
        if prediction.priority == Priority::Critical && self.config.approval_enabled {
            tokens =
                approval::begin_review(self.users.as_ref(), &self.config, &mut incident, now)
                    .await?;
        }

        let ticket = self.store_pair(&mut incident, now, "citizen").await?;

        if let Some(email) = incident.reporter_email.as_deref() {
            let template = EmailTemplate::StatusUpdate {
                ticket_title: incident.title.clone(),
                status: ticket.status,
            };
            if let Err(error) = self.gateway.send_email(email, template).await {
                tracing::warn!(%error, "submission email failed");
            }
        }
        if !tokens.is_empty() {
            approval::send_review_requests(self.gateway.as_ref(), &self.config, &incident, &tokens)
                .await;
        }
        // held reports alert the stakeholders only once review clears them
        if incident.status != IncidentStatus::Pending {
            notify::stakeholder_alert(self.gateway.as_ref(), self.users.as_ref(), &incident).await;
        }

        Ok(incident)
    }

    /// Ingest a sensor report. Retries of an already-ingested
    /// (deviceId, eventId) pair get a duplicate acknowledgement and change
    /// nothing.
    pub async fn report_iot(&self, report: IotReport) -> Result<IotAck, WorkflowError> {
        let device_id = report.device_id.trim().to_owned();
        if device_id.is_empty() {
            return Err(WorkflowError::validation("deviceId is required"));
        }
        let event_id = report.event_id.trim().to_owned();
        if event_id.is_empty() {
            return Err(WorkflowError::validation("eventId is required"));
        }
        validate_coordinates(report.latitude, report.longitude)?;

        let now = self.clock.now();
        if let Some(existing) = self.incidents.find_by_event(&device_id, &event_id).await? {
            return Ok(IotAck {
                incident_id: existing.id,
                ticket_id: existing.ticket_id,
                event_id,
                received_at: existing
                    .ingestion
                    .as_ref()
                    .map_or(existing.created_at, |meta| meta.received_at),
                duplicate: true,
            });
        }

        let mut title = clip(report.title.as_deref().unwrap_or(""), TITLE_MAX);
        if title.is_empty() {
            title = format!("Sensor alert from {device_id}");
        }
        let mut description = clip(report.description.as_deref().unwrap_or(""), DESCRIPTION_MAX);
        if description.is_empty() {
            description = format!("Automated report from device {device_id}");
        }
        let category = report
            .category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "general".to_owned());
        let mut location = clip(report.location.as_deref().unwrap_or(""), LOCATION_MAX);
        if location.is_empty() {
            location = "Unknown location".to_owned();
        }
        let source = report.source.clone().or_else(|| Some("iot_sensor".to_owned()));
        let severity = report.severity.as_deref().map(Severity::parse_lenient);

        // a stated severity maps straight onto a priority; only unlabelled
        // alerts go through the oracle
        let mut ai_priority = None;
        let priority = match severity {
            Some(severity) => severity.to_priority(),
            None => {
                let input = PriorityInput {
                    title: title.clone(),
                    description: description.clone(),
                    category: category.clone(),
                    severity: None,
                    scope: report.scope.clone(),
                    source: source.clone(),
                    location: Some(location.clone()),
                };
                let prediction =
                    predict::priority_with_fallback(self.oracle.as_ref(), &input).await;
                ai_priority = Some(AiPriority {
                    priority: prediction.priority,
                    confidence: prediction.confidence,
                    provenance: prediction.provenance.to_owned(),
                    evaluated_at: now,
                });
                prediction.priority
            }
        };

        let mut incident = Incident::new(title, description, category, location, now);
        incident.latitude = report.latitude;
        incident.longitude = report.longitude;
        incident.severity = severity;
        incident.scope = report.scope;
        incident.source = source;
        incident.priority = Some(priority);
        incident.ai_priority = ai_priority;
        incident.device_id = Some(device_id.clone());
        incident.event_id = Some(event_id.clone());
        incident.sensor_type = report.sensor_type;
        incident.confidence = report.confidence.map(|c| c.clamp(0.0, 1.0));
        incident.captured_at = report.captured_at;
        incident.ingestion = Some(IngestionMeta {
            received_at: now,
            remote_ip: report.remote_ip,
            user_agent: report.user_agent,
        });

        let mut tokens = Vec::new();
        if priority == Priority::Critical && self.config.approval_enabled {
            tokens =
                approval::begin_review(self.users.as_ref(), &self.config, &mut incident, now)
                    .await?;
        }

        let ticket = self.store_pair(&mut incident, now, "iot_sensor").await?;
        if !tokens.is_empty() {
            approval::send_review_requests(self.gateway.as_ref(), &self.config, &incident, &tokens)
                .await;
        }
        if incident.status != IncidentStatus::Pending {
            notify::stakeholder_alert(self.gateway.as_ref(), self.users.as_ref(), &incident).await;
        }

        Ok(IotAck {
            incident_id: incident.id,
            ticket_id: Some(ticket.id),
            event_id,
            received_at: now,
            duplicate: false,
        })
    }

    /// Delete an incident and its mirrored ticket. Department only.
    pub async fn delete_incident(
        &self,
        incident_id: IncidentId,
        actor: &UserAccount,
    ) -> Result<(), WorkflowError> {
        if actor.role != UserRole::Department {
            return Err(WorkflowError::authorization(
                "only department can delete an incident",
            ));
        }
        let ticket = self.tickets.get_by_incident(incident_id).await?;
        if !self.incidents.delete(incident_id).await? {
            return Err(WorkflowError::not_found("incident not found"));
        }
        if let Some(ticket) = ticket {
            self.tickets.delete(ticket.id).await?;
        }
        Ok(())
    }

    /// Insert the incident, mirror its ticket, back-fill `ticketId`, and
    /// append the creation logbook entry.
    async fn store_pair(
        &self,
        incident: &mut Incident,
        now: DateTime<Utc>,
        origin: &str,
    ) -> Result<Ticket, WorkflowError> {
        self.incidents.insert(incident.clone()).await?;
        let ticket = Ticket::from_incident(incident, now);
        self.tickets.insert(ticket.clone()).await?;
        incident.ticket_id = Some(ticket.id);
        self.incidents.put(incident.clone()).await?;

        let entry = AuditLogEntry::system(
            ticket.id,
            actions::TICKET_CREATED,
            json!({
                "category": incident.category,
                "priority": incident.priority,
                "source": origin,
            }),
            now,
        )
        .with_incident(incident.id);
        if let Err(error) = self.audit.append(entry).await {
            tracing::warn!(%error, "intake audit append failed");
        }
        Ok(ticket)
    }
}
