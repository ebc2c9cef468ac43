//! Policy checks over a signature-verified statement.
//!
//! Each check is independent and short-circuits on failure; the order is
//! fixed for deterministic diagnostics, not for security — all enabled
//! checks must pass. A bypassed check is recorded distinctly from a pass and
//! logged as a security-relevant condition.

use chrono::Utc;
use ppac_config::PolicySnapshot;
use serde::Serialize;

use crate::errors::{AttestationError, Result};
use crate::statement::AttestationStatement;

/// Outcome of one pipeline check, kept for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    /// Skipped via a policy bypass flag. A weakened security posture, never
    /// equivalent to `Passed` in audit output.
    Bypassed,
}

impl CheckOutcome {
    pub(crate) fn passed(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Passed,
        }
    }

    pub(crate) fn bypassed(name: &'static str) -> Self {
        tracing::warn!(check = name, "Verification check bypassed by policy configuration");
        Self {
            name,
            status: CheckStatus::Bypassed,
        }
    }
}

/// Run the policy checks: timestamp window, package allow-list, certificate
/// digest allow-list, and required integrity verdicts.
pub fn validate(
    statement: &AttestationStatement,
    policy: &PolicySnapshot,
    checks: &mut Vec<CheckOutcome>,
) -> Result<()> {
    validate_timestamp(statement.timestamp_ms, policy)?;
    checks.push(CheckOutcome::passed("timestamp"));

    validate_package_name(statement, policy)?;
    checks.push(CheckOutcome::passed("apk_package_name"));

    if policy.disable_apk_certificate_digests_check {
        checks.push(CheckOutcome::bypassed("apk_certificate_digests"));
    } else {
        validate_certificate_digests(statement, policy)?;
        checks.push(CheckOutcome::passed("apk_certificate_digests"));
    }

    validate_integrity(statement, policy)?;
    checks.push(CheckOutcome::passed("integrity"));

    Ok(())
}

/// The statement timestamp must lie within `[now - window, now + window]`.
/// The symmetric window tolerates clock skew in both directions.
fn validate_timestamp(timestamp_ms: i64, policy: &PolicySnapshot) -> Result<()> {
    let now_ms = Utc::now().timestamp_millis();
    let window_ms = policy.validity_window_ms();

    if timestamp_ms < now_ms - window_ms || timestamp_ms > now_ms + window_ms {
        return Err(AttestationError::TimestampOutOfRange { timestamp_ms });
    }
    Ok(())
}

fn validate_package_name(
    statement: &AttestationStatement,
    policy: &PolicySnapshot,
) -> Result<()> {
    if !policy
        .allowed_apk_package_names
        .iter()
        .any(|allowed| allowed == &statement.apk_package_name)
    {
        return Err(AttestationError::ClientNotAllowed(
            statement.apk_package_name.clone(),
        ));
    }
    Ok(())
}

/// Exactly one digest must be present and it must be allow-listed. Zero or
/// multiple digests fail even if one of them matches.
fn validate_certificate_digests(
    statement: &AttestationStatement,
    policy: &PolicySnapshot,
) -> Result<()> {
    let digests = &statement.apk_certificate_digest_sha256;
    let allowed = match digests.as_slice() {
        [single] => policy
            .allowed_apk_certificate_digests
            .iter()
            .any(|digest| digest == single),
        _ => false,
    };

    if !allowed {
        return Err(AttestationError::DigestNotAllowed);
    }
    Ok(())
}

fn validate_integrity(
    statement: &AttestationStatement,
    policy: &PolicySnapshot,
) -> Result<()> {
    if policy.require_cts_profile_match && !statement.cts_profile_match {
        return Err(AttestationError::IntegrityRequirementNotMet("ctsProfileMatch"));
    }
    if policy.require_basic_integrity && !statement.basic_integrity {
        return Err(AttestationError::IntegrityRequirementNotMet("basicIntegrity"));
    }

    let markers = statement.evaluation_markers();
    if policy.require_evaluation_type_basic && !markers.contains(&"BASIC") {
        return Err(AttestationError::IntegrityRequirementNotMet("evaluationType BASIC"));
    }
    if policy.require_evaluation_type_hardware_backed && !markers.contains(&"HARDWARE_BACKED") {
        return Err(AttestationError::IntegrityRequirementNotMet(
            "evaluationType HARDWARE_BACKED",
        ));
    }

    Ok(())
}
