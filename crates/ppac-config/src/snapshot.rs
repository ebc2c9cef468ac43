//! Immutable per-run policy view.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::AndroidAttestationConfig;

/// Read-only policy snapshot consumed by one verification pipeline run.
///
/// The pipeline never reads live configuration; it captures a snapshot at the
/// start of a run so concurrent configuration reloads cannot produce a
/// half-updated policy. Changing the policy (including for tests) means
/// constructing a new snapshot, never mutating a shared one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub certificate_hostname: String,
    pub attestation_validity: Duration,
    pub allowed_apk_package_names: Vec<String>,
    pub allowed_apk_certificate_digests: Vec<String>,
    pub require_cts_profile_match: bool,
    pub require_basic_integrity: bool,
    pub require_evaluation_type_basic: bool,
    pub require_evaluation_type_hardware_backed: bool,
    pub disable_nonce_check: bool,
    pub disable_apk_certificate_digests_check: bool,
}

impl From<&AndroidAttestationConfig> for PolicySnapshot {
    fn from(config: &AndroidAttestationConfig) -> Self {
        Self {
            certificate_hostname: config.certificate_hostname.clone(),
            attestation_validity: Duration::from_secs(u64::from(
                config.attestation_validity_seconds,
            )),
            allowed_apk_package_names: config.allowed_apk_package_names.clone(),
            allowed_apk_certificate_digests: config.allowed_apk_certificate_digests.clone(),
            require_cts_profile_match: config.require_cts_profile_match,
            require_basic_integrity: config.require_basic_integrity,
            require_evaluation_type_basic: config.require_evaluation_type_basic,
            require_evaluation_type_hardware_backed: config.require_evaluation_type_hardware_backed,
            disable_nonce_check: config.disable_nonce_check,
            disable_apk_certificate_digests_check: config.disable_apk_certificate_digests_check,
        }
    }
}

impl PolicySnapshot {
    /// Validity window in milliseconds, as compared against statement and
    /// salt timestamps.
    pub fn validity_window_ms(&self) -> i64 {
        self.attestation_validity.as_millis() as i64
    }
}
