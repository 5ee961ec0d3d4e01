use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::fingerprint::ExpectedFingerprint;

/// Where an anchor's key block comes from.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Key material already fetched by the caller.
    Bytes(Arc<[u8]>),
    /// A file read when the anchor is verified.
    File(PathBuf),
}

impl KeySource {
    pub fn bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(data.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

/// An expected master-key fingerprint paired with the key block that must
/// carry it.
///
/// # Example
///
/// ```
/// use artifact_verify::{KeySource, TrustAnchor};
///
/// let anchor = TrustAnchor::new(
///     "B493 3191 06CC 3D1F 252E  19CB F806 F422 E222 AA02",
///     KeySource::file("/usr/share/keys/release.asc"),
/// )?
/// .with_label("release");
/// assert_eq!(anchor.label(), "release");
/// # Ok::<(), artifact_verify::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    label: String,
    fingerprint: ExpectedFingerprint,
    source: KeySource,
}

impl TrustAnchor {
    /// Creates an anchor, validating the fingerprint.
    ///
    /// The label defaults to the normalized fingerprint.
    pub fn new(fingerprint: &str, source: KeySource) -> Result<Self> {
        let fingerprint = ExpectedFingerprint::parse(fingerprint)?;
        Ok(Self {
            label: fingerprint.as_str().to_string(),
            fingerprint,
            source,
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn fingerprint(&self) -> &ExpectedFingerprint {
        &self.fingerprint
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    pub(crate) async fn load_key_block(&self) -> Result<Arc<[u8]>> {
        match &self.source {
            KeySource::Bytes(data) => Ok(Arc::clone(data)),
            KeySource::File(path) => {
                debug!(anchor = %self.label, path = %path.display(), "reading key block");
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|source| Error::KeySource {
                        path: path.clone(),
                        source,
                    })?;
                Ok(data.into())
            }
        }
    }
}

/// Operating systems artifacts are published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    /// The platform this crate was compiled for.
    pub fn current() -> Result<Self> {
        if cfg!(target_os = "linux") {
            Ok(Self::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Self::Mac)
        } else if cfg!(target_os = "windows") {
            Ok(Self::Windows)
        } else {
            Err(Error::UnsupportedPlatform(std::env::consts::OS.to_string()))
        }
    }
}

/// One value per supported platform.
///
/// Selection is exhaustive over [`Platform`], so adding a platform forces
/// every table to name its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSources<T> {
    pub linux: T,
    pub mac: T,
    pub windows: T,
}

impl<T> PlatformSources<T> {
    pub fn for_platform(&self, platform: Platform) -> &T {
        match platform {
            Platform::Linux => &self.linux,
            Platform::Mac => &self.mac,
            Platform::Windows => &self.windows,
        }
    }

    /// The entry for [`Platform::current`].
    pub fn for_current(&self) -> Result<&T> {
        Ok(self.for_platform(Platform::current()?))
    }
}

/// Location of a published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    artifact: String,
}

impl ArtifactLocation {
    pub fn new(artifact: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
        }
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Where the detached signature for this artifact is published.
    pub fn signature(&self) -> String {
        signature_location(&self.artifact)
    }
}

/// Appends `.asc` to an artifact location.
pub fn signature_location(artifact: &str) -> String {
    format!("{artifact}.asc")
}

/// Same as [`signature_location`] for filesystem paths.
pub fn signature_path(artifact: &Path) -> PathBuf {
    let mut path = artifact.as_os_str().to_owned();
    path.push(".asc");
    PathBuf::from(path)
}
