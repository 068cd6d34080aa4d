//! OTP challenge issuance and verification

use crate::{hash, mask};
use chrono::{DateTime, Duration, Utc};
use safelive_core::error::WorkflowError;
use safelive_core::gateway::{Clock, EmailTemplate, NotificationGateway, SmsTemplate};
use safelive_core::repo::OtpRepository;
use safelive_core::{ChallengeId, DeliveryRecord, OtpChallenge, OtpPurpose, UserAccount, UserId};
use secrecy::SecretString;
use std::sync::Arc;

/// OTP service tuning
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Code validity window in minutes
    pub expire_minutes: i64,
    /// Failed attempts allowed before the challenge is burned
    pub max_attempts: u32,
    /// Minimum seconds between issues for the same (user, purpose)
    pub min_resend_seconds: i64,
    /// Server secret keying the code hashes
    pub secret: SecretString,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expire_minutes: 10,
            max_attempts: 5,
            min_resend_seconds: 30,
            secret: SecretString::from("safelive-dev-secret"),
        }
    }
}

impl OtpConfig {
    /// With a server secret
    #[inline]
    #[must_use]
    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.secret = secret;
        self
    }
}

/// What the caller learns after a successful issue. Destinations are
/// masked; the raw code never appears here.
#[derive(Debug, Clone)]
pub struct OtpIssue {
    /// Challenge to present at verification
    pub challenge_id: ChallengeId,
    /// Channels that accepted the code, "email" and/or "sms"
    pub channels_sent: Vec<String>,
    /// Masked email destination, when email was attempted
    pub masked_email: Option<String>,
    /// Masked phone destination, when SMS was attempted
    pub masked_phone: Option<String>,
    /// Hard expiry of the challenge
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies single-use passcode challenges
pub struct OtpService {
    challenges: Arc<dyn OtpRepository>,
    gateway: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    config: OtpConfig,
}

impl OtpService {
    /// Wire the service to its collaborators
    #[must_use]
    pub fn new(
        challenges: Arc<dyn OtpRepository>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        config: OtpConfig,
    ) -> Self {
        Self {
            challenges,
            gateway,
            clock,
            config,
        }
    }

    /// Issue a fresh challenge for one account and purpose.
    ///
    /// Refuses with a conflict while an active challenge younger than the
    /// resend interval exists; otherwise invalidates any prior active
    /// challenge for the pair before inserting the new one. At least one
    /// delivery channel must accept the code.
    pub async fn issue(
        &self,
        user: &UserAccount,
        purpose: OtpPurpose,
    ) -> Result<OtpIssue, WorkflowError> {
        let now = self.clock.now();

        if let Some(existing) = self.challenges.latest_for(user.id, purpose).await? {
            if existing.is_active(now)
                && now - existing.created_at < Duration::seconds(self.config.min_resend_seconds)
            {
                return Err(WorkflowError::conflict(
                    "OTP recently sent. Please wait a moment and try again.",
                ));
            }
        }

        let invalidated = self
            .challenges
            .invalidate_active(user.id, purpose, now)
            .await?;
        if invalidated > 0 {
            tracing::debug!(user_id = %user.id, ?purpose, invalidated, "invalidated prior otp challenges");
        }

        let code = hash::generate_code();
        let expires_at = now + Duration::minutes(self.config.expire_minutes.max(1));
        let challenge = OtpChallenge {
            id: ChallengeId::new(),
            user_id: user.id,
            purpose,
            otp_hash: hash::hash_code(&self.config.secret, &code),
            attempts: 0,
            max_attempts: self.config.max_attempts,
            used: false,
            used_at: None,
            deliveries: Vec::new(),
            created_at: now,
            expires_at,
        };
        let challenge_id = challenge.id;
        self.challenges.insert(challenge).await?;

        let mut channels_sent = Vec::new();
        let mut masked_email = None;
        let mut masked_phone = None;

        if let Some(email) = user.email.as_deref().filter(|e| !e.trim().is_empty()) {
            masked_email = mask::mask_email(email);
            let outcome = self
                .gateway
                .send_email(
                    email,
                    EmailTemplate::OtpCode {
                        purpose: purpose.label().to_owned(),
                        code: code.clone(),
                        expires_minutes: self.config.expire_minutes,
                    },
                )
                .await;
            let delivered = match outcome {
                Ok(()) => {
                    channels_sent.push("email".to_owned());
                    true
                }
                Err(err) => {
                    tracing::warn!(user_id = %user.id, error = %err, "otp email delivery failed");
                    false
                }
            };
            self.challenges
                .record_delivery(
                    challenge_id,
                    DeliveryRecord {
                        channel: "email".to_owned(),
                        destination_masked: masked_email.clone().unwrap_or_default(),
                        delivered,
                        attempted_at: now,
                    },
                )
                .await?;
        }

        if let Some(phone) = user.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            masked_phone = mask::mask_phone(phone);
            let outcome = self
                .gateway
                .send_sms(
                    phone,
                    SmsTemplate::OtpCode {
                        purpose: purpose.label().to_owned(),
                        code: code.clone(),
                        expires_minutes: self.config.expire_minutes,
                    },
                )
                .await;
            let delivered = match outcome {
                Ok(()) => {
                    channels_sent.push("sms".to_owned());
                    true
                }
                Err(err) => {
                    tracing::warn!(user_id = %user.id, error = %err, "otp sms delivery failed");
                    false
                }
            };
            self.challenges
                .record_delivery(
                    challenge_id,
                    DeliveryRecord {
                        channel: "sms".to_owned(),
                        destination_masked: masked_phone.clone().unwrap_or_default(),
                        delivered,
                        attempted_at: now,
                    },
                )
                .await?;
        }

        if channels_sent.is_empty() {
            return Err(WorkflowError::Delivery(
                "unable to deliver OTP to email or phone".to_owned(),
            ));
        }

        Ok(OtpIssue {
            challenge_id,
            channels_sent,
            masked_email,
            masked_phone,
            expires_at,
        })
    }

    /// Verify a submitted code against a challenge.
    ///
    /// Single-use: the winning verification consumes the challenge, so a
    /// repeat with the correct code fails. Wrong codes burn an attempt;
    /// reaching the attempt cap locks the challenge out.
    pub async fn verify(
        &self,
        challenge_id: ChallengeId,
        submitted: &str,
        expected_purpose: OtpPurpose,
        expected_user: Option<UserId>,
    ) -> Result<OtpChallenge, WorkflowError> {
        let code = submitted.trim();
        if code.is_empty() {
            return Err(WorkflowError::validation("OTP code is required"));
        }

        let now = self.clock.now();
        let challenge = self
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("OTP challenge not found"))?;

        if challenge.purpose != expected_purpose {
            return Err(WorkflowError::authorization("OTP challenge purpose mismatch"));
        }
        if let Some(user_id) = expected_user {
            if challenge.user_id != user_id {
                return Err(WorkflowError::authorization(
                    "OTP challenge does not belong to this user",
                ));
            }
        }
        if challenge.used {
            return Err(WorkflowError::conflict("OTP challenge already used"));
        }
        if challenge.expires_at < now {
            return Err(WorkflowError::authorization("OTP expired"));
        }
        if challenge.attempts >= challenge.max_attempts {
            return Err(WorkflowError::conflict(
                "too many attempts, request a new OTP",
            ));
        }

        let provided = hash::hash_code(&self.config.secret, code);
        if !hash::digests_match(&challenge.otp_hash, &provided) {
            let attempts = self.challenges.increment_attempts(challenge_id).await?;
            tracing::debug!(%challenge_id, attempts, "otp code mismatch");
            return Err(WorkflowError::authorization("invalid OTP"));
        }

        if !self.challenges.mark_used_if_unused(challenge_id, now).await? {
            return Err(WorkflowError::conflict("OTP challenge already used"));
        }

        let mut verified = challenge;
        verified.used = true;
        verified.used_at = Some(now);
        Ok(verified)
    }
}
