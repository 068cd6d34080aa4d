//! User role sum type
//!
//! The source documents carry a `userType` plus an optional `officialRole`
//! string; both are folded into a single role variant at record-load time so
//! the rest of the engine never inspects raw fields.

use serde::{Deserialize, Serialize};

/// Role of a user account, decided once when the record is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Ordinary reporter
    Citizen,
    /// Department official: reopen/verify-reopened/assign-reopened powers
    Department,
    /// Supervisor: assignment and verification authority
    Supervisor,
    /// Field inspector: progress updates on unassigned-or-own tickets
    FieldInspector,
    /// Remediation worker: progress updates on assigned tickets only
    Worker,
    /// Distinguished supervisor account; counted as a critical reviewer
    HeadSupervisor,
}

impl UserRole {
    /// Stable string form
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Citizen => "citizen",
            UserRole::Department => "department",
            UserRole::Supervisor => "supervisor",
            UserRole::FieldInspector => "field_inspector",
            UserRole::Worker => "worker",
            UserRole::HeadSupervisor => "head_supervisor",
        }
    }

    /// Fold a raw (userType, officialRole) label pair into a role.
    /// Labels tolerate hyphens/spaces; unknown official roles yield `None`.
    #[must_use]
    pub fn from_labels(user_type: &str, official_role: Option<&str>) -> Option<Self> {
        let normalize =
            |value: &str| value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalize(user_type).as_str() {
            "head_supervisor" => Some(UserRole::HeadSupervisor),
            "official" => match normalize(official_role.unwrap_or_default()).as_str() {
                "department" => Some(UserRole::Department),
                "supervisor" => Some(UserRole::Supervisor),
                "field_inspector" => Some(UserRole::FieldInspector),
                "worker" => Some(UserRole::Worker),
                _ => None,
            },
            "citizen" | "user" => Some(UserRole::Citizen),
            _ => None,
        }
    }

    /// Whether this role belongs to municipal staff
    #[inline]
    #[must_use]
    pub fn is_official(self) -> bool {
        !matches!(self, UserRole::Citizen)
    }

    /// Whether this role sees every ticket regardless of assignment
    #[inline]
    #[must_use]
    pub fn has_full_ticket_access(self) -> bool {
        matches!(
            self,
            UserRole::Department | UserRole::Supervisor | UserRole::HeadSupervisor
        )
    }

    /// Whether accounts with this role review critical incidents
    #[inline]
    #[must_use]
    pub fn is_critical_reviewer(self) -> bool {
        matches!(
            self,
            UserRole::Supervisor | UserRole::Department | UserRole::HeadSupervisor
        )
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fold_into_variants() {
        assert_eq!(
            UserRole::from_labels("official", Some("field-inspector")),
            Some(UserRole::FieldInspector)
        );
        assert_eq!(
            UserRole::from_labels("official", Some("Field Inspector")),
            Some(UserRole::FieldInspector)
        );
        assert_eq!(
            UserRole::from_labels("head_supervisor", None),
            Some(UserRole::HeadSupervisor)
        );
        assert_eq!(UserRole::from_labels("citizen", None), Some(UserRole::Citizen));
        assert_eq!(UserRole::from_labels("official", Some("mayor")), None);
    }

    #[test]
    fn reviewer_and_access_flags() {
        assert!(UserRole::HeadSupervisor.is_critical_reviewer());
        assert!(!UserRole::Worker.is_critical_reviewer());
        assert!(UserRole::Department.has_full_ticket_access());
        assert!(!UserRole::FieldInspector.has_full_ticket_access());
        assert!(!UserRole::Citizen.is_official());
    }
}
