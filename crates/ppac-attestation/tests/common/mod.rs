//! Shared helpers for pipeline integration tests.
//!
//! Statements are signed at runtime with the fixture leaf key so that
//! timestamp-window checks run against the real clock. The fixture chain is
//! a test CA plus two leaves: one issued to the pinned attestation hostname
//! and one issued to an unrelated hostname.
#![allow(dead_code)]

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde_json::{json, Value};
use std::sync::Arc;

use ppac_attestation::{
    DefaultVerificationStrategy, DeviceAttestationVerifier, InMemorySaltStore, NonceCalculator,
};
use ppac_config::{AndroidAttestationConfig, PolicySnapshot};

pub const CA_DER: &[u8] = include_bytes!("../fixtures/ca.der");
pub const LEAF_DER: &[u8] = include_bytes!("../fixtures/leaf.der");
pub const LEAF_KEY_PKCS8: &[u8] = include_bytes!("../fixtures/leaf_key_pkcs8.der");
pub const WRONG_HOST_DER: &[u8] = include_bytes!("../fixtures/wrong.der");
pub const WRONG_HOST_KEY_PKCS8: &[u8] = include_bytes!("../fixtures/wrong_key_pkcs8.der");

pub const ALLOWED_PACKAGE: &str = "de.rki.coronadatadonation";
pub const ALLOWED_DIGEST: &str = "JEmDCAO1NHo2pepDDRJyTkBE4qhtTsBvbqB9A1M4sOg=";

/// Route pipeline tracing through the test harness so rejection logs show
/// up in failing test output. Idempotent across tests in one binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Sign a statement payload as an RS256 JWS carrying the given chain.
pub fn sign_statement(payload: &Value, key_pkcs8: &[u8], chain: &[&[u8]]) -> String {
    let x5c: Vec<String> = chain.iter().map(|der| STANDARD.encode(der)).collect();
    let header = json!({ "alg": "RS256", "x5c": x5c });

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(payload.to_string())
    );

    let key = RsaKeyPair::from_pkcs8(key_pkcs8).expect("fixture key parses");
    let mut signature = vec![0u8; key.public().modulus_len()];
    key.sign(
        &RSA_PKCS1_SHA256,
        &SystemRandom::new(),
        signing_input.as_bytes(),
        &mut signature,
    )
    .expect("signing succeeds");

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

/// A conforming statement body for the given payload and salt, issued now.
pub fn statement_json(payload: &[u8], salt: &str) -> Value {
    json!({
        "nonce": nonce_for(payload, salt),
        "timestampMs": Utc::now().timestamp_millis(),
        "apkPackageName": ALLOWED_PACKAGE,
        "apkCertificateDigestSha256": [ALLOWED_DIGEST],
        "ctsProfileMatch": true,
        "basicIntegrity": true,
        "evaluationType": "BASIC,HARDWARE_BACKED"
    })
}

pub fn nonce_for(payload: &[u8], salt: &str) -> String {
    NonceCalculator::new(payload)
        .expect("payload is non-empty")
        .calculate(salt)
        .expect("salt decodes")
}

pub fn policy() -> PolicySnapshot {
    let mut config = AndroidAttestationConfig::default();
    config.attestation_validity_seconds = 7200;
    config.allowed_apk_package_names = vec![ALLOWED_PACKAGE.to_string()];
    config.allowed_apk_certificate_digests = vec![ALLOWED_DIGEST.to_string()];
    config.require_cts_profile_match = true;
    config.require_basic_integrity = true;
    PolicySnapshot::from(&config)
}

/// Verifier over a fresh in-memory salt store, trusting the fixture CA.
pub fn verifier(policy: PolicySnapshot) -> (Arc<InMemorySaltStore>, DeviceAttestationVerifier) {
    init_tracing();
    let store = Arc::new(InMemorySaltStore::new());
    let strategy = Arc::new(DefaultVerificationStrategy::new(vec![CA_DER.to_vec()]));
    let verifier = DeviceAttestationVerifier::new(store.clone(), strategy, policy);
    (store, verifier)
}
