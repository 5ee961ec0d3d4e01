use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use sequoia_openpgp as openpgp;

use openpgp::packet::{Key, Signature, key};
use openpgp::{KeyHandle, KeyID};

use crate::error::{Error, ErrorKind};

/// A public key admitted to a [`ValidatedKeySet`], independent of its role.
pub type ValidatedKey = Key<key::PublicParts, key::UnspecifiedRole>;

/// Public part of a master key.
pub type MasterKey = Key<key::PublicParts, key::PrimaryRole>;

/// Public part of a subkey.
pub type SubordinateKey = Key<key::PublicParts, key::SubordinateRole>;

/// Display information about one key of a [`KeyRing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Lowercase hex fingerprint.
    pub fingerprint: String,
    /// Lowercase hex 64-bit key ID.
    pub keyid: String,
    pub created: Option<NaiveDate>,
    pub algorithm: String,
    pub is_master: bool,
    /// First user ID of the ring; empty for subkeys.
    pub user_id: String,
}

impl KeyInfo {
    fn from_key<R: key::KeyRole>(key: &Key<key::PublicParts, R>, is_master: bool) -> Self {
        Self {
            fingerprint: format!("{:x}", key.fingerprint()),
            keyid: format!("{:x}", key.keyid()),
            created: Some(DateTime::<Utc>::from(key.creation_time()).date_naive()),
            algorithm: key.pk_algo().to_string(),
            is_master,
            user_id: String::new(),
        }
    }
}

impl fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_master { "pub" } else { "sub" };
        write!(f, "{} {} {}", marker, self.fingerprint, self.algorithm)?;
        if let Some(created) = self.created {
            write!(f, " created {}", created)?;
        }
        if !self.user_id.is_empty() {
            write!(f, " {}", self.user_id)?;
        }
        Ok(())
    }
}

/// A subkey together with every signature packet attached to it.
#[derive(Debug, Clone)]
pub struct Subkey {
    pub(crate) key: SubordinateKey,
    pub(crate) signatures: Vec<Signature>,
}

impl Subkey {
    pub fn key(&self) -> &SubordinateKey {
        &self.key
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn keyid(&self) -> KeyID {
        self.key.keyid()
    }
}

/// A decoded key block: exactly one master key and its subkeys.
///
/// Only the parser constructs a `KeyRing`, so a value of this type always
/// carries a master key whose fingerprint matched the pinned one.
#[derive(Debug, Clone)]
pub struct KeyRing {
    pub(crate) master: MasterKey,
    pub(crate) master_signatures: Vec<Signature>,
    pub(crate) user_ids: Vec<String>,
    pub(crate) subkeys: Vec<Subkey>,
}

impl KeyRing {
    pub fn master_key(&self) -> &MasterKey {
        &self.master
    }

    /// Signatures over the master key and its user IDs.
    pub fn master_signatures(&self) -> &[Signature] {
        &self.master_signatures
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    pub fn subkeys(&self) -> &[Subkey] {
        &self.subkeys
    }

    /// Lowercase hex fingerprint of the master key.
    pub fn master_fingerprint(&self) -> String {
        format!("{:x}", self.master.fingerprint())
    }

    /// Lists the master key followed by every subkey, in block order.
    pub fn keys(&self) -> Vec<KeyInfo> {
        let mut master = KeyInfo::from_key(&self.master, true);
        master.user_id = self.user_ids.first().cloned().unwrap_or_default();

        std::iter::once(master)
            .chain(self.subkeys.iter().map(|s| KeyInfo::from_key(&s.key, false)))
            .collect()
    }
}

/// Keys whose place in the trust chain has been proven.
///
/// Holds the pinned master key plus every subkey carrying a valid binding
/// signature from it. Nothing else can be inserted from outside the crate.
#[derive(Debug, Clone)]
pub struct ValidatedKeySet {
    keys: HashMap<KeyID, ValidatedKey>,
}

impl ValidatedKeySet {
    pub(crate) fn with_master(master: &MasterKey) -> Self {
        let mut keys = HashMap::new();
        keys.insert(master.keyid(), master.clone().role_into_unspecified());
        Self { keys }
    }

    pub(crate) fn admit(&mut self, subkey: &SubordinateKey) {
        self.keys
            .insert(subkey.keyid(), subkey.clone().role_into_unspecified());
    }

    pub fn get(&self, keyid: &KeyID) -> Option<&ValidatedKey> {
        self.keys.get(keyid)
    }

    /// Resolves a signature issuer to a validated key.
    ///
    /// A fingerprint issuer must match the key's full fingerprint, not just
    /// the key ID derived from it.
    pub fn lookup(&self, issuer: &KeyHandle) -> Option<(&KeyID, &ValidatedKey)> {
        self.keys
            .get_key_value(&KeyID::from(issuer))
            .filter(|(_, key)| key.key_handle().aliases(issuer))
    }

    pub fn contains(&self, keyid: &KeyID) -> bool {
        self.keys.contains_key(keyid)
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &KeyID> {
        self.keys.keys()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The signature packets of a detached signature file, in file order.
#[derive(Debug, Clone)]
pub struct DetachedSignature {
    pub(crate) signatures: Vec<Signature>,
}

impl DetachedSignature {
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Every issuer named by every packet, lowercase hex key IDs.
    pub fn issuer_key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for issuer in self.signatures.iter().flat_map(|sig| sig.get_issuers()) {
            let id = format!("{:x}", KeyID::from(&issuer));
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Why a verification run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureReason {
    InvalidConfiguration,
    KeySourceUnavailable,
    MalformedKeyBlock,
    MalformedSignature,
    FingerprintMismatch,
    MultipleMasterKeys,
    NoMasterKey,
    UncertifiedSubkey,
    NoMatchingSigningKey,
    BadSignature,
    Timeout,
    Internal,
}

impl FailureReason {
    /// Stable identifier used in persisted records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "invalid-configuration",
            Self::KeySourceUnavailable => "key-source-unavailable",
            Self::MalformedKeyBlock => "malformed-key-block",
            Self::MalformedSignature => "malformed-signature",
            Self::FingerprintMismatch => "fingerprint-mismatch",
            Self::MultipleMasterKeys => "multiple-master-keys",
            Self::NoMasterKey => "no-master-key",
            Self::UncertifiedSubkey => "uncertified-subkey",
            Self::NoMatchingSigningKey => "no-matching-signing-key",
            Self::BadSignature => "bad-signature",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "invalid-configuration" => Self::InvalidConfiguration,
            "key-source-unavailable" => Self::KeySourceUnavailable,
            "malformed-key-block" => Self::MalformedKeyBlock,
            "malformed-signature" => Self::MalformedSignature,
            "fingerprint-mismatch" => Self::FingerprintMismatch,
            "multiple-master-keys" => Self::MultipleMasterKeys,
            "no-master-key" => Self::NoMasterKey,
            "uncertified-subkey" => Self::UncertifiedSubkey,
            "no-matching-signing-key" => Self::NoMatchingSigningKey,
            "bad-signature" => Self::BadSignature,
            "timeout" => Self::Timeout,
            "internal" => Self::Internal,
            _ => return None,
        })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration => ErrorKind::Configuration,
            Self::KeySourceUnavailable => ErrorKind::Io,
            Self::MalformedKeyBlock | Self::MalformedSignature => ErrorKind::Parse,
            Self::FingerprintMismatch
            | Self::MultipleMasterKeys
            | Self::NoMasterKey
            | Self::UncertifiedSubkey
            | Self::NoMatchingSigningKey => ErrorKind::Trust,
            Self::BadSignature => ErrorKind::Cryptographic,
            Self::Timeout | Self::Internal => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Error> for FailureReason {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidFingerprint { .. }
            | Error::NoTrustAnchors
            | Error::UnsupportedPlatform(_) => Self::InvalidConfiguration,
            Error::KeySource { .. } => Self::KeySourceUnavailable,
            Error::MalformedKeyBlock(_) => Self::MalformedKeyBlock,
            Error::MalformedSignature(_) => Self::MalformedSignature,
            Error::FingerprintMismatch { .. } => Self::FingerprintMismatch,
            Error::MultipleMasterKeys { .. } => Self::MultipleMasterKeys,
            Error::NoMasterKey => Self::NoMasterKey,
            Error::UncertifiedSubkey { .. } => Self::UncertifiedSubkey,
            Error::NoMatchingSigningKey { .. } => Self::NoMatchingSigningKey,
            Error::BadSignature { .. } => Self::BadSignature,
            Error::Timeout(_) => Self::Timeout,
            Error::Io(_) | Error::Task(_) => Self::Internal,
        }
    }
}

/// Result of one verification run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    success: bool,
    failing_anchor: Option<String>,
    reason: Option<FailureReason>,
    detail: Option<String>,
}

impl VerificationOutcome {
    pub(crate) fn verified() -> Self {
        Self {
            success: true,
            failing_anchor: None,
            reason: None,
            detail: None,
        }
    }

    pub(crate) fn failed(anchor: Option<&str>, err: &Error) -> Self {
        Self {
            success: false,
            failing_anchor: anchor.map(str::to_string),
            reason: Some(FailureReason::from(err)),
            detail: Some(err.to_string()),
        }
    }

    pub(crate) fn from_parts(
        success: bool,
        failing_anchor: Option<String>,
        reason: Option<FailureReason>,
        detail: Option<String>,
    ) -> Self {
        Self {
            success,
            failing_anchor,
            reason,
            detail,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Label of the anchor that failed, if the failure belongs to one.
    pub fn failing_anchor(&self) -> Option<&str> {
        self.failing_anchor.as_deref()
    }

    pub fn reason(&self) -> Option<FailureReason> {
        self.reason
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// `"true"` or `"false"`, the value downstream build steps gate on.
    pub fn as_record_value(&self) -> &'static str {
        if self.success { "true" } else { "false" }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            return f.write_str("verified");
        }
        write!(f, "verification failed")?;
        if let Some(anchor) = &self.failing_anchor {
            write!(f, " for anchor {}", anchor)?;
        }
        if let Some(reason) = self.reason {
            write!(f, " ({})", reason)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Progress updates during a verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerifyProgress {
    Starting {
        total_anchors: usize,
    },
    AnchorVerified {
        anchor: String,
    },
    AnchorFailed {
        anchor: String,
        reason: FailureReason,
    },
    Completed {
        success: bool,
    },
}

/// Options for a verification run.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Timeout for the entire run, in seconds.
    /// If None, no timeout is applied.
    pub timeout_secs: Option<u64>,
}

impl VerifyOptions {
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}
