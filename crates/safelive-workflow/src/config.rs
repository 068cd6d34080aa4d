//! Workflow engine configuration

/// Tunable knobs shared by the intake, lifecycle, and approval services
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Whether critical incidents wait on reviewer approval before work starts
    pub approval_enabled: bool,
    /// Review window length, in hours
    pub approval_expire_hours: i64,
    /// Base URL stamped into one-click review links
    pub review_base_url: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            approval_enabled: true,
            approval_expire_hours: 24,
            review_base_url: "http://localhost:8000".into(),
        }
    }
}

impl WorkflowConfig {
    /// Toggle the critical-approval gate
    #[inline]
    #[must_use]
    pub fn with_approval_enabled(mut self, enabled: bool) -> Self {
        self.approval_enabled = enabled;
        self
    }

    /// Override the review window length
    #[inline]
    #[must_use]
    pub fn with_approval_expire_hours(mut self, hours: i64) -> Self {
        self.approval_expire_hours = hours;
        self
    }

    /// Override the base URL used in review links
    #[inline]
    #[must_use]
    pub fn with_review_base_url(mut self, url: impl Into<String>) -> Self {
        self.review_base_url = url.into();
        self
    }
}
