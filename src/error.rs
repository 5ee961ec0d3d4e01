use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid fingerprint '{fingerprint}': {reason}")]
    InvalidFingerprint { fingerprint: String, reason: String },

    #[error("no trust anchors configured")]
    NoTrustAnchors,

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to read key block from {}: {source}", path.display())]
    KeySource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed key block: {0}")]
    MalformedKeyBlock(String),

    #[error("malformed signature file: {0}")]
    MalformedSignature(String),

    #[error("fingerprint mismatch: expected {expected}, found {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("multiple master keys in key block ({first} and {second})")]
    MultipleMasterKeys { first: String, second: String },

    #[error("no master key in key block")]
    NoMasterKey,

    #[error("uncertified subkey {keyid}: no valid binding signature from the master key")]
    UncertifiedSubkey { keyid: String },

    #[error("no matching signing key (signature issuers: {issuers})")]
    NoMatchingSigningKey { issuers: String },

    #[error("bad signature from key {keyid}: {reason}")]
    BadSignature { keyid: String, reason: String },

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("verification task failed: {0}")]
    Task(String),
}

/// Coarse classification of an [`Error`].
///
/// Every kind maps to a failed verification; the kind only tells the
/// operator where to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Bad operator input: fingerprints, anchor sets, platform selection.
    Configuration,
    /// Key material could not be read.
    Io,
    /// A key block or signature file could not be decoded.
    Parse,
    /// The chain from pinned fingerprint to signing key is broken.
    Trust,
    /// The signature does not validate over the artifact bytes.
    Cryptographic,
    /// The verification run itself failed (timeout, aborted task).
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFingerprint { .. }
            | Self::NoTrustAnchors
            | Self::UnsupportedPlatform(_) => ErrorKind::Configuration,
            Self::KeySource { .. } | Self::Io(_) => ErrorKind::Io,
            Self::MalformedKeyBlock(_) | Self::MalformedSignature(_) => ErrorKind::Parse,
            Self::FingerprintMismatch { .. }
            | Self::MultipleMasterKeys { .. }
            | Self::NoMasterKey
            | Self::UncertifiedSubkey { .. }
            | Self::NoMatchingSigningKey { .. } => ErrorKind::Trust,
            Self::BadSignature { .. } => ErrorKind::Cryptographic,
            Self::Timeout(_) | Self::Task(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
