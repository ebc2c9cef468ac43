//! Nonce recalculation for payload/salt binding.
//!
//! The device computes a nonce over the exact payload it donates plus the
//! per-request salt and has the platform integrity service attest to it. The
//! server recomputes the same digest and compares; a captured statement can
//! therefore not be replayed against a different payload.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::errors::{AttestationError, Result};

// Clients encode the salt with whichever base64 alphabet their platform
// library emits, not always padded and not always with a canonical final
// chunk. The reference decoder is lenient in the same ways: both alphabets
// are accepted, padding is optional, and trailing bits are discarded.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_allow_trailing_bits(true)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Recomputes the nonce for one donated payload.
#[derive(Debug, Clone, Copy)]
pub struct NonceCalculator<'a> {
    payload: &'a [u8],
}

impl<'a> NonceCalculator<'a> {
    /// Create a calculator over the attested payload bytes.
    pub fn new(payload: &'a [u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(AttestationError::NonceCalculation(
                "payload bytes are missing or empty".to_string(),
            ));
        }
        Ok(Self { payload })
    }

    /// Compute `Base64( SHA-256( decoded_salt || payload ) )`.
    ///
    /// Deterministic for fixed payload and salt.
    pub fn calculate(&self, salt: &str) -> Result<String> {
        let decoded_salt = decode_salt(salt)?;

        let mut hasher = Sha256::new();
        hasher.update(&decoded_salt);
        hasher.update(self.payload);

        Ok(base64::engine::general_purpose::STANDARD.encode(hasher.finalize()))
    }

    /// Recompute the nonce and compare it against the statement-carried one.
    pub fn verify(&self, received: &str, salt: &str) -> Result<()> {
        let recalculated = self.calculate(salt)?;
        if recalculated != received {
            return Err(AttestationError::NonceMismatch {
                recalculated,
                received: received.to_string(),
            });
        }
        Ok(())
    }
}

fn decode_salt(salt: &str) -> Result<Vec<u8>> {
    if salt.is_empty() {
        return Err(AttestationError::NonceCalculation(
            "salt is missing or empty".to_string(),
        ));
    }

    STANDARD_LENIENT
        .decode(salt)
        .or_else(|_| URL_SAFE_LENIENT.decode(salt))
        .map_err(|err| AttestationError::NonceCalculation(format!("salt is not decodable: {err}")))
}
