//! Attestation policy configuration for the PPAC donation gateway
//!
//! This crate provides a single source of truth for the verification policy
//! applied to device-integrity attestation statements.
//!
//! Configuration can be loaded from:
//! - Environment variables (PPAC_* prefix)
//! - TOML configuration files
//! - Programmatic defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use ppac_config::PpacConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PpacConfig::from_env()?;
//! println!("Pinned hostname: {}", config.android.certificate_hostname);
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub mod app;
mod snapshot;

pub use snapshot::PolicySnapshot;

/// Environment variable that points to an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "PPAC_CONFIG_FILE";

/// Top-level configuration for the donation gateway verification policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PpacConfig {
    /// Android attestation verification policy.
    pub android: AndroidAttestationConfig,
}

impl Default for PpacConfig {
    fn default() -> Self {
        Self {
            android: AndroidAttestationConfig::default(),
        }
    }
}

/// Verification policy for Android SafetyNet attestation statements.
///
/// Mirrors the server-side policy knobs: the pinned issuer hostname, the
/// attestation/salt validity window, client identity allow-lists, required
/// device integrity verdicts, and per-check bypass switches for controlled
/// test environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidAttestationConfig {
    /// Hostname the attestation leaf certificate must be issued to.
    pub certificate_hostname: String,

    /// Validity window in seconds, applied symmetrically to the statement
    /// timestamp and as the single-use window for salts.
    pub attestation_validity_seconds: u32,

    /// APK package names accepted as donation clients.
    pub allowed_apk_package_names: Vec<String>,

    /// Base64-encoded SHA-256 APK signing certificate digests accepted as
    /// donation clients. A statement must carry exactly one of these.
    pub allowed_apk_certificate_digests: Vec<String>,

    /// Require the `ctsProfileMatch` verdict to be true.
    pub require_cts_profile_match: bool,

    /// Require the `basicIntegrity` verdict to be true.
    pub require_basic_integrity: bool,

    /// Require `BASIC` to appear in the statement evaluation type.
    pub require_evaluation_type_basic: bool,

    /// Require `HARDWARE_BACKED` to appear in the statement evaluation type.
    pub require_evaluation_type_hardware_backed: bool,

    /// Bypass the nonce check. Only for controlled environments; every use
    /// is logged as a security-relevant condition.
    pub disable_nonce_check: bool,

    /// Bypass the APK certificate digest check. Only for controlled
    /// environments; every use is logged as a security-relevant condition.
    pub disable_apk_certificate_digests_check: bool,
}

impl Default for AndroidAttestationConfig {
    fn default() -> Self {
        Self {
            certificate_hostname: "attest.android.com".to_string(),
            attestation_validity_seconds: 7200,
            allowed_apk_package_names: Vec::new(),
            allowed_apk_certificate_digests: Vec::new(),
            require_cts_profile_match: false,
            require_basic_integrity: false,
            require_evaluation_type_basic: false,
            require_evaluation_type_hardware_backed: false,
            disable_nonce_check: false,
            disable_apk_certificate_digests_check: false,
        }
    }
}

impl PpacConfig {
    /// Load configuration from the environment.
    ///
    /// Starts from defaults, merges an optional TOML file referenced by
    /// `PPAC_CONFIG_FILE`, then applies `PPAC_*` environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var(CONFIG_FILE_ENV) {
            Ok(path) => Self::from_file(&path)
                .with_context(|| format!("Failed to load config file {path}"))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;
        toml::from_str(&raw).context("Failed to parse TOML configuration")
    }

    /// Apply `PPAC_*` environment variable overrides on top of the current
    /// values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let android = &mut self.android;

        if let Ok(hostname) = env::var("PPAC_CERTIFICATE_HOSTNAME") {
            android.certificate_hostname = hostname;
        }
        if let Ok(validity) = env::var("PPAC_ATTESTATION_VALIDITY_SECONDS") {
            android.attestation_validity_seconds = validity
                .parse()
                .context("PPAC_ATTESTATION_VALIDITY_SECONDS must be an integer")?;
        }
        if let Ok(names) = env::var("PPAC_ALLOWED_APK_PACKAGE_NAMES") {
            android.allowed_apk_package_names = parse_list(&names);
        }
        if let Ok(digests) = env::var("PPAC_ALLOWED_APK_CERTIFICATE_DIGESTS") {
            android.allowed_apk_certificate_digests = parse_list(&digests);
        }

        for (var, field) in [
            (
                "PPAC_REQUIRE_CTS_PROFILE_MATCH",
                &mut android.require_cts_profile_match,
            ),
            (
                "PPAC_REQUIRE_BASIC_INTEGRITY",
                &mut android.require_basic_integrity,
            ),
            (
                "PPAC_REQUIRE_EVALUATION_TYPE_BASIC",
                &mut android.require_evaluation_type_basic,
            ),
            (
                "PPAC_REQUIRE_EVALUATION_TYPE_HARDWARE_BACKED",
                &mut android.require_evaluation_type_hardware_backed,
            ),
            ("PPAC_DISABLE_NONCE_CHECK", &mut android.disable_nonce_check),
            (
                "PPAC_DISABLE_APK_CERTIFICATE_DIGESTS_CHECK",
                &mut android.disable_apk_certificate_digests_check,
            ),
        ] {
            if let Ok(value) = env::var(var) {
                *field = parse_bool(var, &value)?;
            }
        }

        Ok(())
    }

    /// Validate the configuration for production use.
    ///
    /// Allow-lists may only be empty when the corresponding check is
    /// disabled; a bypassed check in the configuration is reported as a
    /// warning since it weakens the security posture.
    pub fn validate(&self) -> Result<()> {
        let android = &self.android;

        if android.certificate_hostname.trim().is_empty() {
            return Err(anyhow!("android.certificate_hostname must not be empty"));
        }
        if android.attestation_validity_seconds == 0 {
            return Err(anyhow!(
                "android.attestation_validity_seconds must be greater than zero"
            ));
        }
        if android.allowed_apk_package_names.is_empty() {
            return Err(anyhow!(
                "android.allowed_apk_package_names must not be empty"
            ));
        }
        if android.allowed_apk_certificate_digests.is_empty()
            && !android.disable_apk_certificate_digests_check
        {
            return Err(anyhow!(
                "android.allowed_apk_certificate_digests must not be empty \
                 unless the digest check is disabled"
            ));
        }

        if android.disable_nonce_check {
            tracing::warn!("Nonce check is disabled by configuration");
        }
        if android.disable_apk_certificate_digests_check {
            tracing::warn!("APK certificate digest check is disabled by configuration");
        }

        Ok(())
    }

    /// Immutable policy view for a single verification pipeline run.
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::from(&self.android)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{var} must be a boolean, got {other:?}")),
    }
}
