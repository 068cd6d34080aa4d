//! Testing utilities for the SafeLive workspace
//!
//! Shared fixtures: a settable clock, a recording notification gateway, a
//! scripted prediction oracle, and seeded accounts/records.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use safelive_core::gateway::{Clock, EmailTemplate, NotificationGateway, SendError, SmsTemplate};
use safelive_core::oracle::{
    OracleError, PredictionOracle, PriorityInput, PriorityPrediction, ProgressPrediction,
};
use safelive_core::repo::UserRepository;
use safelive_core::{Incident, Priority, Ticket, UserAccount, UserRole};
use safelive_store::MemoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Fixed, readable baseline instant
    pub fn default_start() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// One captured outbound email
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub template: EmailTemplate,
}

/// One captured outbound SMS
#[derive(Debug, Clone)]
pub struct SentSms {
    pub to: String,
    pub template: SmsTemplate,
}

/// Gateway that records every message and can be told to fail per channel
#[derive(Debug, Default)]
pub struct RecordingGateway {
    emails: Mutex<Vec<SentEmail>>,
    sms: Mutex<Vec<SentSms>>,
    fail_email: AtomicBool,
    fail_sms: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_email(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sms(&self, fail: bool) {
        self.fail_sms.store(fail, Ordering::SeqCst);
    }

    pub fn emails(&self) -> Vec<SentEmail> {
        self.emails.lock().clone()
    }

    pub fn sms(&self) -> Vec<SentSms> {
        self.sms.lock().clone()
    }

    pub fn email_recipients(&self) -> Vec<String> {
        self.emails.lock().iter().map(|m| m.to.clone()).collect()
    }

    pub fn clear(&self) {
        self.emails.lock().clear();
        self.sms.lock().clear();
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send_email(&self, to: &str, template: EmailTemplate) -> Result<(), SendError> {
        if self.fail_email.load(Ordering::SeqCst) {
            return Err(SendError::Unavailable("email disabled in test".into()));
        }
        self.emails.lock().push(SentEmail {
            to: to.to_owned(),
            template,
        });
        Ok(())
    }

    async fn send_sms(&self, to: &str, template: SmsTemplate) -> Result<(), SendError> {
        if self.fail_sms.load(Ordering::SeqCst) {
            return Err(SendError::Unavailable("sms disabled in test".into()));
        }
        self.sms.lock().push(SentSms {
            to: to.to_owned(),
            template,
        });
        Ok(())
    }
}

/// Oracle that returns exactly what the test scripted
#[derive(Debug)]
pub struct ScriptedOracle {
    priority: Mutex<PriorityPrediction>,
    progress: Mutex<ProgressPrediction>,
    fail: AtomicBool,
}

impl ScriptedOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            priority: Mutex::new(PriorityPrediction {
                priority: Priority::Medium,
                confidence: 0.9,
                provenance: safelive_core::oracle::provenance::ZERO_SHOT_PRETRAINED,
            }),
            progress: Mutex::new(ProgressPrediction {
                percent: 50,
                confidence: 0.9,
                provenance: safelive_core::oracle::provenance::ZERO_SHOT_PRETRAINED,
            }),
            fail: AtomicBool::new(false),
        })
    }

    pub fn script_priority(&self, priority: Priority, confidence: f64) {
        let mut slot = self.priority.lock();
        slot.priority = priority;
        slot.confidence = confidence;
    }

    pub fn script_progress(&self, percent: u8, confidence: f64) {
        let mut slot = self.progress.lock();
        slot.percent = percent;
        slot.confidence = confidence;
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PredictionOracle for ScriptedOracle {
    async fn predict_priority(
        &self,
        _input: &PriorityInput,
    ) -> Result<PriorityPrediction, OracleError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("scripted failure".into()));
        }
        Ok(self.priority.lock().clone())
    }

    async fn predict_progress(&self, _text: &str) -> Result<ProgressPrediction, OracleError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("scripted failure".into()));
        }
        Ok(self.progress.lock().clone())
    }
}

pub fn supervisor() -> UserAccount {
    UserAccount::new("Sita Supervisor", UserRole::Supervisor)
        .with_email("sita@safelive.test")
        .with_phone("+911111110001")
}

pub fn department() -> UserAccount {
    UserAccount::new("Dev Department", UserRole::Department).with_email("dev@safelive.test")
}

pub fn field_inspector() -> UserAccount {
    UserAccount::new("Indra Inspector", UserRole::FieldInspector)
        .with_email("indra@safelive.test")
}

pub fn worker(name: &str) -> UserAccount {
    UserAccount::new(name, UserRole::Worker)
        .with_email(format!("{}@safelive.test", name.to_lowercase().replace(' ', ".")))
        .with_phone("+911111119999")
        .with_specialization("Plumbing")
}

pub fn citizen() -> UserAccount {
    UserAccount::new("Chitra Citizen", UserRole::Citizen)
        .with_email("chitra@safelive.test")
        .with_phone("+911111115555")
}

/// The seeded official accounts in a [`seeded_store`]
#[derive(Debug, Clone)]
pub struct Officials {
    pub supervisor: UserAccount,
    pub department: UserAccount,
    pub inspector: UserAccount,
    pub workers: Vec<UserAccount>,
}

/// A fresh in-memory store with one account per official role and two
/// workers already inserted
pub async fn seeded_store() -> (MemoryStore, Officials) {
    let store = MemoryStore::new();
    let officials = Officials {
        supervisor: supervisor(),
        department: department(),
        inspector: field_inspector(),
        workers: vec![worker("Wasim Worker"), worker("Waman Worker")],
    };
    for account in [
        officials.supervisor.clone(),
        officials.department.clone(),
        officials.inspector.clone(),
    ]
    .into_iter()
    .chain(officials.workers.iter().cloned())
    {
        store
            .users
            .insert(account)
            .await
            .expect("seeding a fresh store cannot collide");
    }
    (store, officials)
}

/// A plain medium-priority incident plus its mirrored ticket
pub fn incident_with_ticket(now: DateTime<Utc>) -> (Incident, Ticket) {
    let mut incident = Incident::new(
        "Broken streetlight",
        "Streetlight out near the school crossing",
        "electricity",
        "5th Avenue",
        now,
    );
    incident.priority = Some(Priority::Medium);
    let ticket = Ticket::from_incident(&incident, now);
    incident.ticket_id = Some(ticket.id);
    (incident, ticket)
}
