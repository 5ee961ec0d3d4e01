use sequoia_openpgp as openpgp;

use openpgp::KeyID;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::provider;
use crate::types::{DetachedSignature, ValidatedKeySet};

/// Checks a detached signature over `artifact` against validated keys.
///
/// Signature packets are scanned in file order and the first one naming a
/// validated key as its issuer is selected. Only that packet is verified:
/// later packets are never consulted, even when the selected one fails.
///
/// Returns the key ID of the key that made the signature.
pub fn verify_detached(
    signature: &DetachedSignature,
    keys: &ValidatedKeySet,
    artifact: &[u8],
) -> Result<KeyID> {
    provider::ensure_initialized();

    let selected = signature.signatures().iter().enumerate().find_map(|(i, sig)| {
        sig.get_issuers()
            .iter()
            .find_map(|issuer| keys.lookup(issuer))
            .map(|(keyid, key)| (i, sig, keyid, key))
    });

    let Some((index, sig, keyid, key)) = selected else {
        return Err(Error::NoMatchingSigningKey {
            issuers: signature.issuer_key_ids().join(", "),
        });
    };

    debug!(
        keyid = %format!("{:x}", keyid),
        packet = index,
        "selected signature packet"
    );

    sig.verify_message(key, artifact).map_err(|e| {
        warn!(keyid = %format!("{:x}", keyid), error = %e, "signature does not verify");
        Error::BadSignature {
            keyid: format!("{:x}", keyid),
            reason: e.to_string(),
        }
    })?;

    Ok(keyid.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certification::validate_subkeys;
    use crate::parse::{parse_detached_signature, parse_key_ring};
    use crate::test_support::*;

    use openpgp::cert::Cert;

    fn validated(cert: &Cert) -> ValidatedKeySet {
        let ring = parse_key_ring(&armored_public(cert), &expected(cert)).unwrap();
        validate_subkeys(&ring).unwrap()
    }

    #[test]
    fn test_subkey_signature_verifies() {
        let cert = generate("Signer <signer@example.org>");
        let keys = validated(&cert);
        let sig = parse_detached_signature(&detached(&mut subkey_signer(&cert), ARTIFACT)).unwrap();

        let keyid = verify_detached(&sig, &keys, ARTIFACT).unwrap();
        assert_eq!(keyid, cert.keys().subkeys().next().unwrap().key().keyid());
    }

    #[test]
    fn test_master_signature_verifies() {
        let cert = generate("Master <master@example.org>");
        let keys = validated(&cert);
        let sig = parse_detached_signature(&detached(&mut master_signer(&cert), ARTIFACT)).unwrap();

        assert_eq!(verify_detached(&sig, &keys, ARTIFACT).unwrap(), cert.keyid());
    }

    #[test]
    fn test_modified_artifact_fails() {
        let cert = generate("Signer <signer@example.org>");
        let keys = validated(&cert);
        let sig = parse_detached_signature(&detached(&mut subkey_signer(&cert), ARTIFACT)).unwrap();

        let mut tampered = ARTIFACT.to_vec();
        tampered[0] ^= 0x01;

        let err = verify_detached(&sig, &keys, &tampered).unwrap_err();
        assert!(matches!(err, Error::BadSignature { .. }));
    }

    #[test]
    fn test_unknown_signer() {
        let cert = generate("Trusted <trusted@example.org>");
        let stranger = generate("Stranger <stranger@example.org>");
        let keys = validated(&cert);
        let sig =
            parse_detached_signature(&detached(&mut subkey_signer(&stranger), ARTIFACT)).unwrap();

        let err = verify_detached(&sig, &keys, ARTIFACT).unwrap_err();
        match err {
            Error::NoMatchingSigningKey { issuers } => {
                let stranger_subkey =
                    format!("{:x}", stranger.keys().subkeys().next().unwrap().key().keyid());
                assert!(issuers.contains(&stranger_subkey));
            }
            other => panic!("expected NoMatchingSigningKey, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_packets_skipped_until_match() {
        let cert = generate("Trusted <trusted@example.org>");
        let stranger = generate("Stranger <stranger@example.org>");
        let keys = validated(&cert);
        let sigs = vec![
            sign(&mut subkey_signer(&stranger), ARTIFACT),
            sign(&mut subkey_signer(&cert), ARTIFACT),
        ];
        let sig = parse_detached_signature(&armor_signatures(sigs)).unwrap();

        assert!(verify_detached(&sig, &keys, ARTIFACT).is_ok());
    }

    #[test]
    fn test_first_match_is_final() {
        let cert = generate("Trusted <trusted@example.org>");
        let keys = validated(&cert);
        // The first matching packet signs other bytes; the second is valid
        // but must not be consulted.
        let sigs = vec![
            sign(&mut subkey_signer(&cert), b"something else"),
            sign(&mut master_signer(&cert), ARTIFACT),
        ];
        let sig = parse_detached_signature(&armor_signatures(sigs)).unwrap();

        let err = verify_detached(&sig, &keys, ARTIFACT).unwrap_err();
        assert!(matches!(err, Error::BadSignature { .. }));
    }

    #[test]
    fn test_key_signature_before_document_signature() {
        let cert = generate("Trusted <trusted@example.org>");
        let keys = validated(&cert);
        // A master-key certification precedes the real signature; it is not
        // a document signature and must not be selected.
        let sigs = vec![key_signature(&cert), sign(&mut subkey_signer(&cert), ARTIFACT)];
        let sig = parse_detached_signature(&armor_signatures(sigs)).unwrap();

        let keyid = verify_detached(&sig, &keys, ARTIFACT).unwrap();
        assert_eq!(keyid, cert.keys().subkeys().next().unwrap().key().keyid());
    }
}
