use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::provider;
use crate::types::{KeyRing, MasterKey, Subkey, ValidatedKeySet};

/// Proves every subkey of `ring` was certified by its master key.
///
/// The master key is trusted because its fingerprint was pinned when the
/// ring was parsed. A subkey is admitted when at least one of its signature
/// packets is a valid subkey binding made by the master key. A single subkey
/// without one fails the whole ring; it is never dropped silently.
pub fn validate_subkeys(ring: &KeyRing) -> Result<ValidatedKeySet> {
    provider::ensure_initialized();

    let master = ring.master_key();

    ring.subkeys()
        .iter()
        .try_fold(ValidatedKeySet::with_master(master), |mut validated, subkey| {
            if !is_certified_by(master, subkey) {
                let keyid = format!("{:x}", subkey.keyid());
                warn!(keyid = %keyid, "subkey has no valid binding signature from the master key");
                return Err(Error::UncertifiedSubkey { keyid });
            }
            validated.admit(subkey.key());
            Ok(validated)
        })
}

fn is_certified_by(master: &MasterKey, subkey: &Subkey) -> bool {
    let keyid = format!("{:x}", subkey.keyid());

    subkey.signatures().iter().any(|sig| {
        match sig.verify_subkey_binding(master, master, subkey.key()) {
            Ok(()) => {
                debug!(keyid = %keyid, "subkey binding verified");
                true
            }
            Err(e) => {
                debug!(
                    keyid = %keyid,
                    sig_type = %sig.typ(),
                    error = %e,
                    "signature is not a valid subkey binding"
                );
                false
            }
        }
    })
}
