//! SafetyNet attestation verification for data-donation requests
//!
//! Each Android device participating in data donation sends a signed
//! attestation statement (JWS) issued by its platform integrity service.
//! Before any analytics payload is accepted, this crate verifies the
//! statement: salt-based replay protection, cryptographic signature and
//! certificate chain verification, issuer hostname pinning, nonce binding to
//! the donated payload, and policy checks against allow-listed client
//! identities. Every violation fails closed with a distinct, auditable error.
//!
//! # Example
//!
//! ```rust,ignore
//! use ppac_attestation::{
//!     AttestationRequest, DefaultVerificationStrategy, DeviceAttestationVerifier,
//!     InMemorySaltStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(request: AttestationRequest<'_>) -> anyhow::Result<()> {
//! let config = ppac_config::app::load_from_env()?;
//! let verifier = DeviceAttestationVerifier::new(
//!     Arc::new(InMemorySaltStore::new()),
//!     Arc::new(DefaultVerificationStrategy::new(trust_roots)),
//!     config.snapshot(),
//! );
//!
//! let verified = verifier.verify(&request).await?;
//! println!("accepted donation from {}", verified.statement.apk_package_name);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod hostname;
pub mod nonce;
pub mod policy;
pub mod salt;
pub mod statement;
pub mod strategy;
pub mod verifier;

pub use errors::{AttestationError, RejectionKind, Result, StoreError};
pub use nonce::NonceCalculator;
pub use policy::{CheckOutcome, CheckStatus};
pub use salt::{InMemorySaltStore, SaltAdmission, SaltRecord, SaltRegistry, SaltStore};
pub use statement::{AttestationStatement, SignedStatement};
pub use strategy::{
    CryptoError, DefaultVerificationStrategy, LeafCertificate, SignatureVerificationStrategy,
};
pub use verifier::{AttestationRequest, DeviceAttestationVerifier, VerifiedStatement};
