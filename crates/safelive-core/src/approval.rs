//! Critical-incident approval records
//!
//! Embedded in the incident document. Each recipient holds the hashes of two
//! single-use decision tokens; raw tokens exist only inside outbound review
//! emails and are never persisted.

use crate::roles::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate state of a critical-incident review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// Awaiting reviewer decisions
    Pending,
    /// At least one reviewer approved (first-approve-wins)
    Approved,
    /// Every reviewer decided and none approved
    Rejected,
    /// The review window elapsed before a decision
    Expired,
    /// No eligible reviewers existed when the review was requested
    Unavailable,
}

/// A single reviewer's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Not yet decided
    Pending,
    /// Approve remediation
    Approve,
    /// Reject; keep the incident pending
    Reject,
}

/// One reviewer on a critical-incident approval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecipient {
    /// Reviewer email (lowercased, deduplication key)
    pub email: String,
    /// Reviewer display name
    pub name: String,
    /// Reviewer role at request time
    pub role: UserRole,
    /// Current decision
    pub decision: ReviewDecision,
    /// When the decision was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_at: Option<DateTime<Utc>>,
    /// SHA-256 hex digest of the approve token
    pub approve_token_hash: String,
    /// SHA-256 hex digest of the reject token
    pub reject_token_hash: String,
}

/// Critical-incident approval block embedded in an incident
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalApproval {
    /// Whether approval gates this incident
    pub required: bool,
    /// Aggregate review state
    pub state: ApprovalState,
    /// When the review was requested
    pub requested_at: DateTime<Utc>,
    /// Review window deadline
    pub expires_at: DateTime<Utc>,
    /// Timestamp of the most recent recorded decision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_decision_at: Option<DateTime<Utc>>,
    /// Ordered reviewer list
    pub recipients: Vec<ApprovalRecipient>,
}

impl CriticalApproval {
    /// Recompute the aggregate state from recorded decisions.
    ///
    /// Quorum rule: a single `Approve` wins immediately; `Rejected` requires
    /// every recipient to have decided without approving.
    #[must_use]
    pub fn aggregate_state(&self) -> ApprovalState {
        let mut pending = 0usize;
        for recipient in &self.recipients {
            match recipient.decision {
                ReviewDecision::Approve => return ApprovalState::Approved,
                ReviewDecision::Pending => pending += 1,
                ReviewDecision::Reject => {}
            }
        }
        if pending == 0 {
            ApprovalState::Rejected
        } else {
            ApprovalState::Pending
        }
    }

    /// Whether the review window has elapsed
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recipient(decision: ReviewDecision) -> ApprovalRecipient {
        ApprovalRecipient {
            email: "r@example.org".into(),
            name: "Reviewer".into(),
            role: UserRole::Supervisor,
            decision,
            decision_at: None,
            approve_token_hash: String::new(),
            reject_token_hash: String::new(),
        }
    }

    fn approval(decisions: &[ReviewDecision]) -> CriticalApproval {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        CriticalApproval {
            required: true,
            state: ApprovalState::Pending,
            requested_at: at,
            expires_at: at + chrono::Duration::hours(24),
            last_decision_at: None,
            recipients: decisions.iter().map(|d| recipient(*d)).collect(),
        }
    }

    #[test]
    fn single_approve_wins() {
        let block = approval(&[
            ReviewDecision::Reject,
            ReviewDecision::Approve,
            ReviewDecision::Pending,
        ]);
        assert_eq!(block.aggregate_state(), ApprovalState::Approved);
    }

    #[test]
    fn unanimous_reject_finalizes() {
        let block = approval(&[ReviewDecision::Reject, ReviewDecision::Reject]);
        assert_eq!(block.aggregate_state(), ApprovalState::Rejected);
    }

    #[test]
    fn remaining_pending_stays_pending() {
        let block = approval(&[ReviewDecision::Reject, ReviewDecision::Pending]);
        assert_eq!(block.aggregate_state(), ApprovalState::Pending);
    }
}
