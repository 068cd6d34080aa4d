//! Destination redaction for OTP acknowledgements
//!
//! The issue response tells the caller where the code went without echoing
//! the full address or number back.

/// Mask an email address, keeping the first two local characters and the
/// full domain. Returns `None` for values that are not email-shaped.
#[must_use]
pub fn mask_email(value: &str) -> Option<String> {
    let email = value.trim();
    let (local, domain) = email.split_once('@')?;
    if domain.is_empty() {
        return None;
    }
    if local.is_empty() {
        return Some(format!("***@{domain}"));
    }
    let prefix: String = local.chars().take(2).collect();
    let stars = local.chars().count().saturating_sub(prefix.chars().count()).max(1);
    Some(format!("{prefix}{}@{domain}", "*".repeat(stars)))
}

/// Mask a phone number, keeping the last four digits. Returns `None` when
/// fewer than four digits are present.
#[must_use]
pub fn mask_phone(value: &str) -> Option<String> {
    let phone = value.trim();
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return None;
    }
    let suffix = &digits[digits.len() - 4..];
    let stars = "*".repeat((digits.len() - 4).max(4));
    if phone.starts_with('+') {
        Some(format!("+{stars}{suffix}"))
    } else {
        Some(format!("{stars}{suffix}"))
    }
}
