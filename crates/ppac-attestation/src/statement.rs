//! Parsing of signed attestation statements (JWS compact serialization).
//!
//! Parsing only establishes well-formedness. Every field of the embedded
//! statement is untrusted until the signature and certificate chain have been
//! verified and the pipeline has run the policy checks.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{Algorithm, Header};
use serde::{Deserialize, Serialize};

use crate::errors::{AttestationError, Result};

/// Statement payload issued by the device platform integrity service.
///
/// Field names follow the SafetyNet wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AttestationStatement {
    /// Base64 digest binding the statement to one payload + salt pair.
    pub nonce: String,

    /// Statement issuance time, epoch milliseconds.
    pub timestamp_ms: i64,

    /// Package name of the calling app.
    pub apk_package_name: String,

    /// Base64 SHA-256 digests of the APK signing certificates.
    pub apk_certificate_digest_sha256: Vec<String>,

    /// Base64 SHA-256 digest of the APK itself, when present.
    pub apk_digest_sha256: Option<String>,

    /// Device passed the compatibility test suite profile check.
    pub cts_profile_match: bool,

    /// Device passed the basic integrity check.
    pub basic_integrity: bool,

    /// Comma-separated markers describing how the verdict was evaluated
    /// (`BASIC`, `HARDWARE_BACKED`).
    pub evaluation_type: Option<String>,

    /// Error token set by the integrity service when the verdict could not
    /// be computed.
    pub error: Option<String>,

    /// Remediation advice accompanying a negative verdict.
    pub advice: Option<String>,
}

impl AttestationStatement {
    /// Markers from `evaluation_type`, trimmed.
    pub fn evaluation_markers(&self) -> Vec<&str> {
        self.evaluation_type
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|marker| !marker.is_empty())
            .collect()
    }
}

/// A parsed, not-yet-verified signed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedStatement {
    header: Header,
    statement: AttestationStatement,
    certificate_chain: Vec<Vec<u8>>,
    signing_input: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedStatement {
    /// Parse a JWS compact serialization (`header.payload.signature`).
    ///
    /// Fails on malformed container format, undecodable segments, an
    /// unsupported algorithm, or a missing certificate chain. Parsing the
    /// same input twice yields structurally identical results.
    pub fn parse(token: &str) -> Result<Self> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|err| AttestationError::StatementParse(err.to_string()))?;

        match header.alg {
            Algorithm::RS256 | Algorithm::ES256 => {}
            other => {
                return Err(AttestationError::StatementParse(format!(
                    "unsupported signature algorithm {other:?}"
                )))
            }
        }

        let mut segments = token.split('.');
        let (encoded_header, encoded_payload, encoded_signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None) if !p.is_empty() && !s.is_empty() => (h, p, s),
                _ => {
                    return Err(AttestationError::StatementParse(
                        "token is not a three-segment JWS compact serialization".to_string(),
                    ))
                }
            };

        let payload = URL_SAFE_NO_PAD
            .decode(encoded_payload)
            .map_err(|err| AttestationError::StatementParse(format!("payload segment: {err}")))?;
        let statement: AttestationStatement = serde_json::from_slice(&payload)
            .map_err(|err| AttestationError::StatementParse(format!("statement body: {err}")))?;

        let signature = URL_SAFE_NO_PAD
            .decode(encoded_signature)
            .map_err(|err| AttestationError::StatementParse(format!("signature segment: {err}")))?;

        let certificate_chain = match &header.x5c {
            Some(chain) if !chain.is_empty() => chain
                .iter()
                .map(|cert| {
                    STANDARD.decode(cert).map_err(|err| {
                        AttestationError::StatementParse(format!("x5c certificate: {err}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(AttestationError::StatementParse(
                    "header carries no x5c certificate chain".to_string(),
                ))
            }
        };

        let signing_input = format!("{encoded_header}.{encoded_payload}").into_bytes();

        Ok(Self {
            header,
            statement,
            certificate_chain,
            signing_input,
            signature,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// DER certificates from the `x5c` header, leaf first. Never empty.
    pub fn certificate_chain(&self) -> &[Vec<u8>] {
        &self.certificate_chain
    }

    /// The bytes the signature covers (`header.payload` segments).
    pub fn signing_input(&self) -> &[u8] {
        &self.signing_input
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn statement(&self) -> &AttestationStatement {
        &self.statement
    }

    /// Consume the container, keeping only the (now verified) statement.
    pub fn into_statement(self) -> AttestationStatement {
        self.statement
    }
}
