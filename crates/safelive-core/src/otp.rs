//! OTP challenge records
//!
//! Codes are never stored in plaintext. A challenge carries a keyed hash of
//! the six-digit code plus the counters the verification path mutates
//! atomically.

use crate::ids::{ChallengeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a code was issued. One active challenge is allowed per
/// (user, purpose) pair; issuing a new one invalidates the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    /// Second factor at sign in
    Login2fa,
    /// Password change confirmation
    ChangePassword,
    /// Turning two-factor on
    Enable2fa,
    /// Turning two-factor off
    Disable2fa,
}

impl OtpPurpose {
    /// Human label used in notification templates
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Login2fa => "sign-in",
            Self::ChangePassword => "password change",
            Self::Enable2fa => "enabling 2FA",
            Self::Disable2fa => "disabling 2FA",
        }
    }
}

/// Per-channel delivery outcome recorded on the challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    /// Channel name, "email" or "sms"
    pub channel: String,
    /// Masked destination, never the raw address
    pub destination_masked: String,
    /// Whether the gateway accepted the message
    pub delivered: bool,
    /// When delivery was attempted
    pub attempted_at: DateTime<Utc>,
}

/// A single issued code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpChallenge {
    /// Challenge id
    pub id: ChallengeId,
    /// Account the code was issued to
    pub user_id: UserId,
    /// Why it was issued
    pub purpose: OtpPurpose,
    /// Keyed hash of the six-digit code, hex encoded
    pub otp_hash: String,
    /// Failed verification attempts so far
    pub attempts: u32,
    /// Attempts allowed before the challenge is burned
    pub max_attempts: u32,
    /// Set once the code is consumed or burned
    pub used: bool,
    /// When the code was consumed, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    /// Delivery outcomes, one per channel attempted
    #[serde(default)]
    pub deliveries: Vec<DeliveryRecord>,
    /// Issue time; resend throttling keys off this
    pub created_at: DateTime<Utc>,
    /// Hard expiry
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Whether this challenge can still be verified at `now`
    #[inline]
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.attempts < self.max_attempts && now < self.expires_at
    }

    /// Whether any channel accepted the code
    #[must_use]
    pub fn any_delivered(&self) -> bool {
        self.deliveries.iter().any(|d| d.delivered)
    }
}
