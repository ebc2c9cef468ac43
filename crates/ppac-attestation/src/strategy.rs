//! Pluggable cryptographic verification of signed statements.
//!
//! The pipeline never verifies signatures itself; it delegates to an injected
//! [`SignatureVerificationStrategy`] so the trust-chain engine can be swapped
//! (hardware-backed, remote verification service, test double) without
//! touching the policy pipeline.

use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_FIXED, RSA_PKCS1_2048_8192_SHA256};
use thiserror::Error;
use x509_parser::prelude::*;

use crate::statement::SignedStatement;

/// Errors raised by a verification strategy.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("certificate chain is empty")]
    EmptyChain,

    #[error("failed to parse certificate: {0}")]
    CertificateParse(String),

    #[error("certificate is outside its validity period")]
    CertificateNotValid,

    #[error("certificate chain link did not verify: {0}")]
    ChainLink(String),

    #[error("certificate chain does not terminate in a trusted root")]
    UntrustedAnchor,

    #[error("statement signature is invalid")]
    SignatureInvalid,

    #[error("verification backend error: {0}")]
    Backend(String),
}

/// Leaf certificate returned by a successful verification.
///
/// Carries the DER bytes; consumers re-parse on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCertificate {
    der: Vec<u8>,
}

impl LeafCertificate {
    pub fn new(der: Vec<u8>) -> Self {
        Self { der }
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

/// Capability trait for verifying a signed statement's signature and chain.
///
/// On success the implementation returns the leaf certificate the statement
/// was signed with; the pipeline then pins its hostname. Implementations may
/// perform blocking or remote work; callers treat the call as an opaque
/// async boundary and drive cancellation from the outside.
#[async_trait]
pub trait SignatureVerificationStrategy: Send + Sync {
    async fn verify_signature(
        &self,
        statement: &SignedStatement,
    ) -> Result<LeafCertificate, CryptoError>;
}

/// Chain verification against the certificates embedded in the statement.
///
/// Verifies the JWS signature with the leaf key, every issuer link in the
/// embedded chain plus each certificate's validity period, and finally
/// anchors the terminal certificate against the configured trust roots.
pub struct DefaultVerificationStrategy {
    trust_roots: Vec<Vec<u8>>,
}

impl DefaultVerificationStrategy {
    /// Build a strategy trusting the given root certificates (DER).
    ///
    /// With no roots configured the terminal certificate must be self-signed;
    /// issuer pinning then rests on the hostname check, which suits test
    /// environments but not production.
    pub fn new(trust_roots: Vec<Vec<u8>>) -> Self {
        if trust_roots.is_empty() {
            tracing::warn!("No attestation trust roots configured; accepting self-signed chain anchors");
        }
        Self { trust_roots }
    }

    fn verify_chain(&self, statement: &SignedStatement) -> Result<LeafCertificate, CryptoError> {
        let chain_der = statement.certificate_chain();
        let (leaf_der, terminal_der) = match (chain_der.first(), chain_der.last()) {
            (Some(leaf), Some(terminal)) => (leaf, terminal),
            _ => return Err(CryptoError::EmptyChain),
        };

        let chain = chain_der
            .iter()
            .map(|der| parse_certificate(der))
            .collect::<Result<Vec<_>, _>>()?;

        verify_statement_signature(statement, &chain[0])?;

        for cert in &chain {
            if !cert.validity().is_valid() {
                return Err(CryptoError::CertificateNotValid);
            }
        }

        for pair in chain.windows(2) {
            pair[0]
                .verify_signature(Some(pair[1].public_key()))
                .map_err(|err| CryptoError::ChainLink(err.to_string()))?;
        }

        self.verify_anchor(terminal_der, &chain[chain.len() - 1])?;

        Ok(LeafCertificate::new(leaf_der.clone()))
    }

    fn verify_anchor(
        &self,
        terminal_der: &[u8],
        terminal: &X509Certificate<'_>,
    ) -> Result<(), CryptoError> {
        if self.trust_roots.is_empty() {
            return terminal
                .verify_signature(None)
                .map_err(|_| CryptoError::UntrustedAnchor);
        }

        for root_der in &self.trust_roots {
            if root_der.as_slice() == terminal_der {
                return Ok(());
            }
            let root = parse_certificate(root_der)?;
            if terminal.verify_signature(Some(root.public_key())).is_ok() {
                return Ok(());
            }
        }

        Err(CryptoError::UntrustedAnchor)
    }
}

#[async_trait]
impl SignatureVerificationStrategy for DefaultVerificationStrategy {
    async fn verify_signature(
        &self,
        statement: &SignedStatement,
    ) -> Result<LeafCertificate, CryptoError> {
        self.verify_chain(statement)
    }
}

fn parse_certificate<'a>(der: &'a [u8]) -> Result<X509Certificate<'a>, CryptoError> {
    let (rest, cert) = X509Certificate::from_der(der)
        .map_err(|err| CryptoError::CertificateParse(err.to_string()))?;
    if !rest.is_empty() {
        return Err(CryptoError::CertificateParse(
            "trailing bytes after certificate".to_string(),
        ));
    }
    Ok(cert)
}

fn verify_statement_signature(
    statement: &SignedStatement,
    leaf: &X509Certificate<'_>,
) -> Result<(), CryptoError> {
    let spki = &leaf.public_key().subject_public_key.data;

    let algorithm: &'static dyn ring::signature::VerificationAlgorithm = match statement.algorithm() {
        Algorithm::RS256 => &RSA_PKCS1_2048_8192_SHA256,
        Algorithm::ES256 => &ECDSA_P256_SHA256_FIXED,
        other => {
            return Err(CryptoError::Backend(format!(
                "algorithm {other:?} passed parsing but has no verifier"
            )))
        }
    };

    UnparsedPublicKey::new(algorithm, spki.as_ref())
        .verify(statement.signing_input(), statement.signature())
        .map_err(|_| CryptoError::SignatureInvalid)
}
