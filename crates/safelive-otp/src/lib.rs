//! SafeLive OTP - passcode challenges for sensitive account actions
//!
//! Issues six-digit single-use codes for sign-in 2FA, password changes, and
//! 2FA enable/disable, and verifies them against keyed hashes:
//! - Codes persist only as HMAC-SHA256 digests under a server secret
//! - One active challenge per (user, purpose); new issues invalidate old ones
//! - Resend throttling, bounded attempts, hard expiry
//! - Dual-channel best-effort delivery with masked acknowledgements
//!
//! # Example
//!
//! ```rust,ignore
//! use safelive_otp::{OtpConfig, OtpService};
//! use safelive_core::OtpPurpose;
//!
//! # async fn example(service: OtpService, user: safelive_core::UserAccount) {
//! let issue = service.issue(&user, OtpPurpose::Login2fa).await.unwrap();
//! // ... the user reads the code from email or SMS ...
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod hash;
pub mod mask;
pub mod service;

pub use hash::{digests_match, generate_code, hash_code};
pub use mask::{mask_email, mask_phone};
pub use service::{OtpConfig, OtpIssue, OtpService};
