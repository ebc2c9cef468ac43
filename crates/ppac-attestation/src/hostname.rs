//! Hostname pinning for the attestation leaf certificate.
//!
//! A statement with a valid signature from the wrong issuer must still be
//! rejected; pinning the leaf certificate's subject to one expected hostname
//! defeats validly-signed-but-wrong-issuer substitution.

use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

use crate::errors::{AttestationError, Result};
use crate::strategy::LeafCertificate;

/// Verify that the leaf certificate was issued to the pinned hostname.
///
/// Standard TLS hostname matching: SAN dNSName entries are authoritative,
/// the subject CN is a fallback when the SAN carries no DNS names, and a
/// wildcard is honored in the leftmost label only. Any parse failure is a
/// validation failure; this check fails closed.
pub fn verify_hostname(hostname: &str, leaf: &LeafCertificate) -> Result<()> {
    let matched = certificate_names(leaf)
        .map_err(|reason| {
            tracing::debug!(reason, "Attestation leaf certificate could not be inspected");
            AttestationError::HostnameValidation {
                hostname: hostname.to_string(),
            }
        })?
        .iter()
        .any(|name| matches_hostname(name, hostname));

    if matched {
        Ok(())
    } else {
        Err(AttestationError::HostnameValidation {
            hostname: hostname.to_string(),
        })
    }
}

fn certificate_names(leaf: &LeafCertificate) -> std::result::Result<Vec<String>, String> {
    let (rest, cert) =
        X509Certificate::from_der(leaf.as_der()).map_err(|err| err.to_string())?;
    if !rest.is_empty() {
        return Err("trailing bytes after certificate".to_string());
    }

    let san_names: Vec<String> = match cert.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some((*dns).to_string()),
                _ => None,
            })
            .collect(),
        Ok(None) => Vec::new(),
        Err(err) => return Err(err.to_string()),
    };

    if !san_names.is_empty() {
        return Ok(san_names);
    }

    // No DNS SAN entries; fall back to the subject common name.
    Ok(cert
        .subject()
        .iter_common_name()
        .filter_map(|cn| cn.as_str().ok())
        .map(str::to_string)
        .collect())
}

/// RFC 6125-style matching: case-insensitive, with `*` accepted as the whole
/// leftmost label and matching exactly one non-empty label.
fn matches_hostname(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.trim_end_matches('.');
    let hostname = hostname.trim_end_matches('.');

    if let Some(suffix) = pattern.strip_prefix("*.") {
        return match hostname.split_once('.') {
            Some((first_label, rest)) => {
                !first_label.is_empty() && rest.eq_ignore_ascii_case(suffix)
            }
            None => false,
        };
    }

    pattern.eq_ignore_ascii_case(hostname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_case_insensitive() {
        assert!(matches_hostname("attest.android.com", "attest.android.com"));
        assert!(matches_hostname("Attest.Android.Com", "attest.android.com"));
        assert!(!matches_hostname("attest.android.com", "attest.android.org"));
    }

    #[test]
    fn wildcard_matches_exactly_one_label() {
        assert!(matches_hostname("*.android.com", "attest.android.com"));
        assert!(!matches_hostname("*.android.com", "android.com"));
        assert!(!matches_hostname("*.android.com", "a.b.android.com"));
        assert!(!matches_hostname("*.android.com", "attest.android.org"));
    }

    #[test]
    fn trailing_dots_are_ignored() {
        assert!(matches_hostname("attest.android.com.", "attest.android.com"));
        assert!(matches_hostname("attest.android.com", "attest.android.com."));
    }

    #[test]
    fn garbage_certificate_fails_closed() {
        let err = verify_hostname(
            "attest.android.com",
            &LeafCertificate::new(b"not-a-certificate".to_vec()),
        )
        .unwrap_err();
        assert!(matches!(err, AttestationError::HostnameValidation { .. }));
    }
}
