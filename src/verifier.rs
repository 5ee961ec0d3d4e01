use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sequoia_openpgp::KeyID;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{info, warn};

use crate::anchor::TrustAnchor;
use crate::certification::validate_subkeys;
use crate::error::{Error, Result};
use crate::fingerprint::ExpectedFingerprint;
use crate::parse::{parse_detached_signature, parse_key_ring};
use crate::types::{FailureReason, VerificationOutcome, VerifyOptions, VerifyProgress};
use crate::verify::verify_detached;

/// Verifies artifacts against a fixed set of trust anchors.
///
/// An artifact is trusted only if its detached signature verifies under
/// every anchor. Anchors are checked concurrently, one task each; the first
/// failure observed cancels the rest and becomes the outcome.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> artifact_verify::Result<()> {
/// use artifact_verify::{KeySource, TrustAnchor, Verifier};
///
/// let anchor = TrustAnchor::new(
///     "B4933191 06CC3D1F 252E19CB F806F422 E222AA02",
///     KeySource::file("/usr/share/keys/release.asc"),
/// )?;
/// let verifier = Verifier::new([anchor])?;
///
/// let artifact = tokio::fs::read("app.tar.gz").await?;
/// let signature = tokio::fs::read("app.tar.gz.asc").await?;
/// let outcome = verifier.verify(artifact, signature).await;
/// if !outcome.is_success() {
///     eprintln!("{outcome}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Verifier {
    anchors: Vec<TrustAnchor>,
    options: VerifyOptions,
}

impl Verifier {
    /// Creates a verifier. At least one anchor is required.
    ///
    /// Nothing is read until [`Verifier::verify`] runs.
    pub fn new(anchors: impl IntoIterator<Item = TrustAnchor>) -> Result<Self> {
        let anchors: Vec<TrustAnchor> = anchors.into_iter().collect();
        if anchors.is_empty() {
            return Err(Error::NoTrustAnchors);
        }
        Ok(Self {
            anchors,
            options: VerifyOptions::default(),
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn anchors(&self) -> &[TrustAnchor] {
        &self.anchors
    }

    /// Verifies `signature` over `artifact` under every anchor.
    pub async fn verify(
        &self,
        artifact: impl Into<Arc<[u8]>>,
        signature: impl Into<Arc<[u8]>>,
    ) -> VerificationOutcome {
        self.verify_with_progress(artifact, signature, |_| {}).await
    }

    /// Same as [`Verifier::verify`], reporting progress to `callback`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(verifier: artifact_verify::Verifier) {
    /// let outcome = verifier
    ///     .verify_with_progress(b"artifact".to_vec(), b"signature".to_vec(), |p| {
    ///         println!("{p:?}")
    ///     })
    ///     .await;
    /// # }
    /// ```
    pub async fn verify_with_progress<F>(
        &self,
        artifact: impl Into<Arc<[u8]>>,
        signature: impl Into<Arc<[u8]>>,
        callback: F,
    ) -> VerificationOutcome
    where
        F: Fn(VerifyProgress),
    {
        callback(VerifyProgress::Starting {
            total_anchors: self.anchors.len(),
        });

        let run = self.run(artifact.into(), signature.into(), &callback);
        let outcome = bounded(self.options.timeout_secs, run).await;

        if outcome.is_success() {
            info!(anchors = self.anchors.len(), "artifact verified");
        } else {
            warn!(%outcome, "artifact verification failed");
        }
        callback(VerifyProgress::Completed {
            success: outcome.is_success(),
        });
        outcome
    }

    async fn run<F>(
        &self,
        artifact: Arc<[u8]>,
        signature: Arc<[u8]>,
        callback: &F,
    ) -> VerificationOutcome
    where
        F: Fn(VerifyProgress),
    {
        let mut tasks = JoinSet::new();
        let mut labels = HashMap::new();
        for anchor in &self.anchors {
            let anchor = anchor.clone();
            let artifact = Arc::clone(&artifact);
            let signature = Arc::clone(&signature);
            let label = anchor.label().to_string();
            let handle = tasks.spawn(async move {
                let result = check_anchor(&anchor, artifact, signature).await;
                (anchor.label().to_string(), result)
            });
            labels.insert(handle.id(), label);
        }

        while let Some(joined) = tasks.join_next().await {
            let (label, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tasks.abort_all();
                    return task_failure(&labels, e);
                }
            };

            match result {
                Ok(keyid) => {
                    info!(anchor = %label, keyid = %format!("{:x}", keyid), "anchor verified");
                    callback(VerifyProgress::AnchorVerified { anchor: label });
                }
                Err(err) => {
                    tasks.abort_all();
                    warn!(anchor = %label, error = %err, "anchor failed");
                    callback(VerifyProgress::AnchorFailed {
                        anchor: label.clone(),
                        reason: FailureReason::from(&err),
                    });
                    return VerificationOutcome::failed(Some(&label), &err);
                }
            }
        }

        VerificationOutcome::verified()
    }
}

/// Outcome for an anchor task that panicked or was cancelled.
fn task_failure(labels: &HashMap<Id, String>, err: JoinError) -> VerificationOutcome {
    let label = labels.get(&err.id()).map(String::as_str);
    warn!(anchor = label.unwrap_or("unknown"), error = %err, "anchor task failed");
    VerificationOutcome::failed(label, &Error::Task(err.to_string()))
}

async fn bounded<Fut>(timeout_secs: Option<u64>, run: Fut) -> VerificationOutcome
where
    Fut: Future<Output = VerificationOutcome>,
{
    match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
            .await
            .unwrap_or_else(|_| VerificationOutcome::failed(None, &Error::Timeout(secs))),
        None => run.await,
    }
}

async fn check_anchor(
    anchor: &TrustAnchor,
    artifact: Arc<[u8]>,
    signature: Arc<[u8]>,
) -> Result<KeyID> {
    let key_block = anchor.load_key_block().await?;
    let fingerprint = anchor.fingerprint().clone();

    tokio::task::spawn_blocking(move || {
        verify_anchor(&key_block, &fingerprint, &artifact, &signature)
    })
    .await
    .map_err(|e| Error::Task(e.to_string()))?
}

/// Runs the whole chain for one anchor: parse and pin the key block,
/// validate its subkeys, then check the detached signature.
///
/// Pure and synchronous; usable without a runtime. Returns the key ID that
/// made the signature.
pub fn verify_anchor(
    key_block: &[u8],
    fingerprint: &ExpectedFingerprint,
    artifact: &[u8],
    signature: &[u8],
) -> Result<KeyID> {
    let ring = parse_key_ring(key_block, fingerprint)?;
    let keys = validate_subkeys(&ring)?;
    let signature = parse_detached_signature(signature)?;
    verify_detached(&signature, &keys, artifact)
}
