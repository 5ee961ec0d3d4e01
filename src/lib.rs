//! Verifies downloaded artifacts against pinned OpenPGP keys.
//!
//! Each trust anchor pins a master-key fingerprint and names where its
//! public key block comes from. Verification walks the whole chain for every
//! anchor: the key block must hold exactly one master key with the pinned
//! fingerprint, every subkey must carry a valid binding signature from that
//! master key, and the detached signature must verify under one of the
//! validated keys. The artifact is trusted only if every anchor agrees.
//!
//! # Example
//!
//! ```no_run
//! use artifact_verify::{KeySource, TrustAnchor, Verifier, write_record};
//!
//! #[tokio::main]
//! async fn main() -> artifact_verify::Result<()> {
//!     let anchor = TrustAnchor::new(
//!         "B493 3191 06CC 3D1F 252E  19CB F806 F422 E222 AA02",
//!         KeySource::file("keys/release.asc"),
//!     )?
//!     .with_label("release");
//!
//!     let verifier = Verifier::new([anchor])?;
//!     let artifact = tokio::fs::read("app-1.2.0.tar.gz").await?;
//!     let signature = tokio::fs::read("app-1.2.0.tar.gz.asc").await?;
//!
//!     let outcome = verifier.verify(artifact, signature).await;
//!     write_record("build/verified", &outcome).await?;
//!     println!("{outcome}");
//!
//!     Ok(())
//! }
//! ```
//!
//! Lower-level steps ([`parse_key_ring`], [`validate_subkeys`],
//! [`verify_detached`], [`verify_anchor`]) are synchronous and need no
//! runtime.

mod anchor;
mod certification;
mod error;
mod fingerprint;
mod parse;
mod provider;
mod record;
mod types;
mod verifier;
mod verify;

#[cfg(test)]
mod test_support;

pub use anchor::{
    ArtifactLocation, KeySource, Platform, PlatformSources, TrustAnchor, signature_location,
    signature_path,
};
pub use certification::validate_subkeys;
pub use error::{Error, ErrorKind, Result};
pub use fingerprint::{ExpectedFingerprint, normalize_fingerprint};
pub use parse::{parse_detached_signature, parse_key_ring};
pub use provider::ensure_initialized;
pub use record::{format_record, parse_record, read_record, write_record};
pub use types::{
    DetachedSignature, FailureReason, KeyInfo, KeyRing, MasterKey, Subkey, SubordinateKey,
    ValidatedKey, ValidatedKeySet, VerificationOutcome, VerifyOptions, VerifyProgress,
};
pub use verifier::{Verifier, verify_anchor};
pub use verify::verify_detached;
