//! Validation orchestrator.
//!
//! Evaluation order per request:
//!
//! 1. License lookup by key, status `active`
//! 2. Onboarding gate (trial licenses only)
//! 3. Time restrictions
//! 4. User-type entitlement
//! 5. Plugin entitlement
//! 6. Usage quota
//! 7. Permission and restriction synthesis
//!
//! The first failing stage short-circuits; warnings gathered before a denial
//! are discarded. Store failures become `validation_error`.

use std::sync::Arc;

use crate::error::StoreError;
use crate::onboarding::gate::{check_onboarding, GateConfig};
use crate::store::Stores;
use crate::types::Timestamp;

use super::entitlement::{check_plugin, check_user_type, resolve_permissions, summarize_restrictions};
use super::time_restriction::evaluate_time_restrictions;
use super::usage::{check_usage, UsageLimits};
use super::{Denial, DenialReason, Grant, ValidationRequest, ValidationResult};

/// Why evaluation stopped before producing a grant.
enum Rejection {
    Denied(Denial),
    Failed(StoreError),
}

impl From<Denial> for Rejection {
    fn from(denial: Denial) -> Self {
        Rejection::Denied(denial)
    }
}

impl From<StoreError> for Rejection {
    fn from(err: StoreError) -> Self {
        Rejection::Failed(err)
    }
}

/// Validates license requests against the injected stores.
///
/// Holds no mutable state; one instance serves concurrent requests.
pub struct LicenseValidator {
    stores: Stores,
    gate: GateConfig,
}

impl LicenseValidator {
    pub fn new(stores: Stores, gate: GateConfig) -> Self {
        Self { stores, gate }
    }

    pub fn shared(stores: Stores, gate: GateConfig) -> Arc<Self> {
        Arc::new(Self::new(stores, gate))
    }

    /// Run the full pipeline for `request` at `now`. Always returns a
    /// well-formed result.
    pub async fn validate(&self, request: &ValidationRequest, now: Timestamp) -> ValidationResult {
        match self.evaluate(request, now).await {
            Ok(grant) => {
                tracing::debug!(
                    license_id = grant.license_id,
                    warnings = grant.warnings.len(),
                    "License validation granted"
                );
                ValidationResult::Granted(grant)
            }
            Err(Rejection::Denied(denial)) => {
                tracing::info!(
                    reason = %denial.reason,
                    user_id = request.user_id.as_deref(),
                    "License validation denied"
                );
                ValidationResult::Denied(denial)
            }
            Err(Rejection::Failed(err)) => {
                tracing::error!(error = %err, "License validation failed");
                ValidationResult::Denied(Denial::new(
                    DenialReason::ValidationError,
                    "License validation could not be completed",
                ))
            }
        }
    }

    async fn evaluate(&self, request: &ValidationRequest, now: Timestamp) -> Result<Grant, Rejection> {
        // 1. Lookup.
        let license = self
            .stores
            .licenses
            .find_by_key(&request.license_key)
            .await?
            .filter(|l| l.is_active())
            .ok_or_else(|| {
                Denial::new(DenialReason::LicenseNotFound, "License not found or inactive")
            })?;

        let mut warnings = Vec::new();

        // 2. Onboarding gate.
        if license.is_trial() {
            let gate_warnings = check_onboarding(
                self.stores.onboarding.as_ref(),
                &license,
                request.user_id.as_deref(),
                now,
                &self.gate,
            )
            .await??;
            warnings.extend(gate_warnings);
        }

        // 3. Time restrictions.
        warnings.extend(evaluate_time_restrictions(&license, now)?);

        // 4-5. Entitlements.
        check_user_type(&license, request.user_type.as_deref())?;
        check_plugin(&license, request.requested_plugin.as_deref())?;

        // 6. Usage quota.
        let current_usage = check_usage(self.stores.usage.as_ref(), &license).await?;

        // 7. Synthesis.
        Ok(Grant {
            license_id: license.id,
            license_type: license.license_type,
            permissions: resolve_permissions(&license, &current_usage),
            restrictions: summarize_restrictions(&license),
            warnings,
            current_usage,
            limits: UsageLimits::from_license(&license),
        })
    }
}
