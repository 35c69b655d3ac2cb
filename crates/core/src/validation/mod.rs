//! License validation engine.
//!
//! Each stage is a small evaluator that returns either its contribution to a
//! grant or a [`Denial`]. Denials are data: a reason code, a human-readable
//! message and the context fields a client needs to render remediation UI.
//! The [`orchestrator`] composes the stages in a fixed order.

pub mod entitlement;
pub mod orchestrator;
pub mod time_restriction;
pub mod usage;

use serde::{Deserialize, Serialize};

use crate::license::LicenseType;
use crate::onboarding::ProgressStatus;
use crate::types::{DbId, Timestamp};

use entitlement::{Permissions, Restrictions};
use usage::{UsageCounts, UsageLimits};

define_str_enum! {
    /// Why a validation request was denied.
    DenialReason {
        LicenseNotFound = "license_not_found",
        LicenseExpired = "license_expired",
        TrialExpired = "trial_expired",
        OnboardingRequired = "onboarding_required",
        OnboardingIncomplete = "onboarding_incomplete",
        UserTypeNotAllowed = "user_type_not_allowed",
        PluginNotEnabled = "plugin_not_enabled",
        UserLimitExceeded = "user_limit_exceeded",
        ProjectLimitExceeded = "project_limit_exceeded",
        StorageLimitExceeded = "storage_limit_exceeded",
        UsageCheckFailed = "usage_check_failed",
        ValidationError = "validation_error",
    }
}

impl DenialReason {
    /// Whether the denial reflects a system failure rather than a business rule.
    pub fn is_system_failure(self) -> bool {
        matches!(self, Self::UsageCheckFailed | Self::ValidationError)
    }
}

/// An inbound validation request. The principal is already authenticated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationRequest {
    pub license_key: String,
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub requested_plugin: Option<String>,
    pub requested_action: Option<String>,
}

/// Onboarding state echoed back on onboarding denials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingStatusSummary {
    pub overall_status: ProgressStatus,
    pub sessions_completed: i32,
    pub total_sessions_required: i32,
    pub onboarding_deadline: Option<Timestamp>,
    pub next_steps: Vec<String>,
}

/// A denied validation. Context fields are present only for the reasons that
/// use them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Denial {
    pub reason: DenialReason,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_user_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_plugins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<UsageCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<UsageLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_status: Option<OnboardingStatusSummary>,
}

impl Denial {
    pub fn new(reason: DenialReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            expires_at: None,
            allowed_user_types: None,
            enabled_plugins: None,
            current_usage: None,
            limits: None,
            onboarding_status: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_allowed_user_types(mut self, types: Vec<String>) -> Self {
        self.allowed_user_types = Some(types);
        self
    }

    pub fn with_enabled_plugins(mut self, plugins: Vec<String>) -> Self {
        self.enabled_plugins = Some(plugins);
        self
    }

    pub fn with_usage(mut self, current: UsageCounts, limits: UsageLimits) -> Self {
        self.current_usage = Some(current);
        self.limits = Some(limits);
        self
    }

    pub fn with_onboarding_status(mut self, status: OnboardingStatusSummary) -> Self {
        self.onboarding_status = Some(status);
        self
    }
}

/// A granted validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grant {
    pub license_id: DbId,
    pub license_type: LicenseType,
    pub permissions: Permissions,
    pub restrictions: Restrictions,
    pub warnings: Vec<String>,
    pub current_usage: UsageCounts,
    pub limits: UsageLimits,
}

/// The orchestrator's output. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Granted(Grant),
    Denied(Denial),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// The denial reason, present iff the result is invalid.
    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            Self::Granted(_) => None,
            Self::Denied(denial) => Some(denial.reason),
        }
    }
}
