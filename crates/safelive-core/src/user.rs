//! User account records

use crate::ids::UserId;
use crate::roles::UserRole;
use serde::{Deserialize, Serialize};

/// A user account as loaded from the record store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Account id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact email, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Role decided at record-load time
    pub role: UserRole,
    /// Worker specialization label, for worker accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

impl UserAccount {
    /// Create a new account with the given role
    #[must_use]
    pub fn new(name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: None,
            phone: None,
            role,
            specialization: None,
        }
    }

    /// With contact email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// With contact phone
    #[inline]
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// With worker specialization
    #[inline]
    #[must_use]
    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    /// Best available label for notifications and audit entries
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            return &self.name;
        }
        if let Some(email) = self.email.as_deref() {
            if !email.is_empty() {
                return email;
            }
        }
        if let Some(phone) = self.phone.as_deref() {
            if !phone.is_empty() {
                return phone;
            }
        }
        "Official"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_contact() {
        let account = UserAccount::new("", UserRole::Worker).with_email("w@example.org");
        assert_eq!(account.display_name(), "w@example.org");

        let named = UserAccount::new("Asha", UserRole::Supervisor);
        assert_eq!(named.display_name(), "Asha");
    }
}
