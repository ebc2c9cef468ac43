//! The attestation verification pipeline.
//!
//! A strictly ordered, fail-fast sequence of checks over one donation
//! request:
//!
//! ```text
//! AdmitSalt -> ParseStatement -> VerifySignature -> ValidateHostname
//!           -> VerifyNonce -> ValidatePolicy -> Accepted
//! ```
//!
//! Any stage failure rejects the request with a typed error; nothing is
//! retried, since salt admission has a side effect and a blind retry would
//! weaken the replay guarantee. Callers must not trust any statement field
//! before the pipeline has accepted it.

use std::sync::Arc;

use ppac_config::PolicySnapshot;

use crate::errors::{AttestationError, Result};
use crate::hostname;
use crate::nonce::NonceCalculator;
use crate::policy::{self, CheckOutcome};
use crate::salt::{SaltRegistry, SaltStore};
use crate::statement::{AttestationStatement, SignedStatement};
use crate::strategy::{LeafCertificate, SignatureVerificationStrategy};

/// One inbound donation request, as handed over by the transport layer.
#[derive(Debug, Clone, Copy)]
pub struct AttestationRequest<'a> {
    /// Client-generated single-use salt token.
    pub salt: &'a str,
    /// Signed attestation statement (JWS compact serialization).
    pub signed_statement: &'a str,
    /// The payload bytes the statement attests to.
    pub payload: &'a [u8],
}

/// A statement that passed every enabled check.
#[derive(Debug, Clone)]
pub struct VerifiedStatement {
    pub statement: AttestationStatement,
    pub leaf_certificate: LeafCertificate,
    /// Per-check audit trail; bypassed checks are visible here.
    pub checks: Vec<CheckOutcome>,
}

/// Orchestrates the verification pipeline over injected capabilities.
pub struct DeviceAttestationVerifier {
    salts: SaltRegistry,
    strategy: Arc<dyn SignatureVerificationStrategy>,
    policy: PolicySnapshot,
}

impl DeviceAttestationVerifier {
    /// Construct a verifier over a salt store, a signature verification
    /// strategy, and one immutable policy snapshot.
    pub fn new(
        salt_store: Arc<dyn SaltStore>,
        strategy: Arc<dyn SignatureVerificationStrategy>,
        policy: PolicySnapshot,
    ) -> Self {
        let salts = SaltRegistry::new(salt_store, policy.attestation_validity);
        Self {
            salts,
            strategy,
            policy,
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// Returns the verified statement on acceptance; every rejection is a
    /// typed [`AttestationError`] and terminal for this request.
    pub async fn verify(&self, request: &AttestationRequest<'_>) -> Result<VerifiedStatement> {
        let result = self.run_pipeline(request).await;

        if let Err(err) = &result {
            match err {
                AttestationError::Store(reason) => {
                    tracing::error!(%reason, "Salt store failure during attestation verification");
                }
                other => {
                    tracing::warn!(kind = ?other.kind(), error = %other, "Attestation statement rejected");
                }
            }
        }

        result
    }

    async fn run_pipeline(&self, request: &AttestationRequest<'_>) -> Result<VerifiedStatement> {
        let mut checks = Vec::new();

        self.salts.admit(request.salt).await?;
        checks.push(CheckOutcome::passed("salt"));

        if request.signed_statement.is_empty() {
            return Err(AttestationError::MissingMandatoryField("signedStatement"));
        }
        let parsed = SignedStatement::parse(request.signed_statement)?;

        let leaf = self
            .strategy
            .verify_signature(&parsed)
            .await
            .map_err(|err| AttestationError::SignatureVerification(err.to_string()))?;
        checks.push(CheckOutcome::passed("signature"));

        hostname::verify_hostname(&self.policy.certificate_hostname, &leaf)?;
        checks.push(CheckOutcome::passed("hostname"));

        self.verify_nonce(&parsed, request, &mut checks)?;

        policy::validate(parsed.statement(), &self.policy, &mut checks)?;

        tracing::debug!(
            package = %parsed.statement().apk_package_name,
            checks = checks.len(),
            "Attestation statement accepted"
        );

        Ok(VerifiedStatement {
            statement: parsed.into_statement(),
            leaf_certificate: leaf,
            checks,
        })
    }

    fn verify_nonce(
        &self,
        parsed: &SignedStatement,
        request: &AttestationRequest<'_>,
        checks: &mut Vec<CheckOutcome>,
    ) -> Result<()> {
        if self.policy.disable_nonce_check {
            checks.push(CheckOutcome::bypassed("nonce"));
            return Ok(());
        }

        let received = &parsed.statement().nonce;
        if received.is_empty() {
            return Err(AttestationError::MissingMandatoryField("nonce"));
        }

        NonceCalculator::new(request.payload)?.verify(received, request.salt)?;
        checks.push(CheckOutcome::passed("nonce"));
        Ok(())
    }
}
