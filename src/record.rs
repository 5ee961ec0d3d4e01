//! Persisted verification records.
//!
//! A record is a small text file downstream build steps gate on. Its first
//! line is `true` or `false`; failed records carry `key=value` lines with
//! the reason code, the failing anchor and a one-line detail.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{FailureReason, VerificationOutcome};

/// Renders `outcome` in the record format.
pub fn format_record(outcome: &VerificationOutcome) -> String {
    let mut out = format!("{}\n", outcome.as_record_value());
    if outcome.is_success() {
        return out;
    }
    if let Some(reason) = outcome.reason() {
        out.push_str(&format!("reason={}\n", reason));
    }
    if let Some(anchor) = outcome.failing_anchor() {
        out.push_str(&format!("anchor={}\n", single_line(anchor)));
    }
    if let Some(detail) = outcome.detail() {
        out.push_str(&format!("detail={}\n", single_line(detail)));
    }
    out
}

/// Reads a record back.
///
/// Only a first line of exactly `true` is a success. Anything else,
/// including an empty or unrecognized record, is a failure.
pub fn parse_record(text: &str) -> VerificationOutcome {
    let mut lines = text.lines();
    if lines.next() == Some("true") {
        return VerificationOutcome::verified();
    }

    let mut anchor = None;
    let mut reason = None;
    let mut detail = None;
    for line in lines {
        match line.split_once('=') {
            Some(("reason", code)) => reason = FailureReason::from_code(code),
            Some(("anchor", label)) => anchor = Some(label.to_string()),
            Some(("detail", text)) => detail = Some(text.to_string()),
            _ => debug!(line, "ignoring unrecognized record line"),
        }
    }

    VerificationOutcome::from_parts(false, anchor, reason, detail)
}

/// Writes `outcome` to `path`.
///
/// The record is written to `<path>.tmp` first and renamed into place, so a
/// reader never sees a partial `true`.
pub async fn write_record(path: impl AsRef<Path>, outcome: &VerificationOutcome) -> Result<()> {
    let path = path.as_ref();
    let tmp = tmp_path(path);

    tokio::fs::write(&tmp, format_record(outcome)).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::Io(e));
    }

    debug!(path = %path.display(), success = outcome.is_success(), "verification record written");
    Ok(())
}

/// Loads a record written by [`write_record`].
///
/// A missing or unreadable file is an error; the caller must treat it as a
/// failed verification.
pub async fn read_record(path: impl AsRef<Path>) -> Result<VerificationOutcome> {
    let path = path.as_ref();
    let raw = tokio::fs::read(path).await?;

    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => {
            warn!(path = %path.display(), "verification record is not UTF-8");
            return Ok(VerificationOutcome::from_parts(false, None, None, None));
        }
    };
    Ok(parse_record(&text))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
