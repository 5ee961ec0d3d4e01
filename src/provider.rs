//! One-time selection of the cryptographic backend.

use std::sync::OnceLock;

use sequoia_openpgp as openpgp;
use tracing::debug;

static BACKEND: OnceLock<String> = OnceLock::new();

/// Initializes the cryptographic backend and returns its name.
///
/// Safe to call from any number of threads; only the first call does work.
/// Every caller observes the same backend.
pub fn ensure_initialized() -> &'static str {
    BACKEND.get_or_init(|| {
        let backend = openpgp::crypto::backend();
        debug!(backend = %backend, "cryptographic backend initialized");
        backend
    })
}
