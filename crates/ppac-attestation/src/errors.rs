//! Error taxonomy for the attestation verification pipeline.
//!
//! Every failure is terminal for the current pipeline run and is surfaced to
//! the caller as one typed rejection. Messages carry enough context for audit
//! logging but never raw cryptographic material; low-level diagnostics stay
//! in internal tracing output.

use serde::Serialize;
use thiserror::Error;

use crate::salt::SaltRecord;

/// Attestation pipeline errors.
#[derive(Error, Debug)]
pub enum AttestationError {
    #[error("Empty salt received")]
    MissingSalt,

    #[error("Salt {} is not valid anymore (created at {})", .0.token, .0.created_at_ms)]
    SaltExpired(SaltRecord),

    #[error("Mandatory authentication field is missing: {0}")]
    MissingMandatoryField(&'static str),

    #[error("Failed to parse signed attestation statement: {0}")]
    StatementParse(String),

    #[error("Error during cryptographic verification of the statement signature: {0}")]
    SignatureVerification(String),

    #[error("Hostname verification failed for attestation certificate (expected {hostname})")]
    HostnameValidation { hostname: String },

    #[error("Nonce could not be calculated: {0}")]
    NonceCalculation(String),

    #[error("Recalculated nonce {recalculated} does not match the received nonce {received}")]
    NonceMismatch {
        recalculated: String,
        received: String,
    },

    #[error("Statement timestamp {timestamp_ms} is outside the attestation validity window")]
    TimestampOutOfRange { timestamp_ms: i64 },

    #[error("APK package name {0} is not part of the allow-list")]
    ClientNotAllowed(String),

    #[error("APK certificate digests do not satisfy the allow-list")]
    DigestNotAllowed,

    #[error("Device integrity requirement not met: {0}")]
    IntegrityRequirementNotMet(&'static str),

    #[error("Salt store failure: {0}")]
    Store(#[from] StoreError),
}

/// Salt store backend errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("salt store backend error: {0}")]
    Backend(String),
}

/// Result type for attestation operations.
pub type Result<T> = std::result::Result<T, AttestationError>;

/// Discriminant of a pipeline rejection.
///
/// Callers map these to their own transport-level status codes and use them
/// as stable audit-log labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    MissingSalt,
    SaltExpired,
    MissingMandatoryField,
    StatementParse,
    SignatureVerification,
    HostnameValidation,
    NonceCalculation,
    NonceMismatch,
    TimestampOutOfRange,
    ClientNotAllowed,
    DigestNotAllowed,
    IntegrityRequirementNotMet,
    Store,
}

impl AttestationError {
    /// Stable discriminant for status mapping and audit logging.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MissingSalt => RejectionKind::MissingSalt,
            Self::SaltExpired(_) => RejectionKind::SaltExpired,
            Self::MissingMandatoryField(_) => RejectionKind::MissingMandatoryField,
            Self::StatementParse(_) => RejectionKind::StatementParse,
            Self::SignatureVerification(_) => RejectionKind::SignatureVerification,
            Self::HostnameValidation { .. } => RejectionKind::HostnameValidation,
            Self::NonceCalculation(_) => RejectionKind::NonceCalculation,
            Self::NonceMismatch { .. } => RejectionKind::NonceMismatch,
            Self::TimestampOutOfRange { .. } => RejectionKind::TimestampOutOfRange,
            Self::ClientNotAllowed(_) => RejectionKind::ClientNotAllowed,
            Self::DigestNotAllowed => RejectionKind::DigestNotAllowed,
            Self::IntegrityRequirementNotMet(_) => RejectionKind::IntegrityRequirementNotMet,
            Self::Store(_) => RejectionKind::Store,
        }
    }
}
