//! Hostname pinning against the fixture certificates.

mod common;

use common::{LEAF_DER, WRONG_HOST_DER};
use ppac_attestation::{hostname::verify_hostname, AttestationError, LeafCertificate};

#[test]
fn pinned_hostname_matches_the_attestation_leaf() {
    let leaf = LeafCertificate::new(LEAF_DER.to_vec());
    assert!(verify_hostname("attest.android.com", &leaf).is_ok());
}

#[test]
fn unrelated_certificate_is_rejected() {
    let leaf = LeafCertificate::new(WRONG_HOST_DER.to_vec());
    let err = verify_hostname("attest.android.com", &leaf).unwrap_err();
    match err {
        AttestationError::HostnameValidation { hostname } => {
            assert_eq!(hostname, "attest.android.com");
        }
        other => panic!("expected HostnameValidation, got {other:?}"),
    }
}

#[test]
fn pinning_is_exact_not_suffix_based() {
    let leaf = LeafCertificate::new(LEAF_DER.to_vec());
    assert!(verify_hostname("android.com", &leaf).is_err());
    assert!(verify_hostname("sub.attest.android.com", &leaf).is_err());
}
