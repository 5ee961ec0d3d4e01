use std::fmt;

use crate::error::{Error, Result};

/// Canonicalizes a human-entered fingerprint for comparison.
///
/// Removes all whitespace and lowercases ASCII letters. The result is not
/// validated; use [`ExpectedFingerprint::parse`] for operator input.
///
/// ```
/// use artifact_verify::normalize_fingerprint;
///
/// assert_eq!(normalize_fingerprint("AB CD\tEF"), "abcdef");
/// ```
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A pinned master-key fingerprint, normalized and validated.
///
/// Accepted formats:
/// - 40 hex characters (v4 fingerprint)
/// - 64 hex characters (v6 fingerprint)
/// - Either of the above with "0x" prefix, arbitrary whitespace and mixed case
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpectedFingerprint(String);

impl ExpectedFingerprint {
    pub fn parse(fingerprint: &str) -> Result<Self> {
        let normalized = normalize_fingerprint(fingerprint);
        let hex = strip_hex_prefix(&normalized);

        if hex.is_empty() {
            return Err(Error::InvalidFingerprint {
                fingerprint: fingerprint.to_string(),
                reason: "fingerprint cannot be empty".to_string(),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidFingerprint {
                fingerprint: fingerprint.to_string(),
                reason: "fingerprint must contain only hexadecimal characters".to_string(),
            });
        }

        match hex.len() {
            40 | 64 => Ok(Self(hex.to_string())),
            len => Err(Error::InvalidFingerprint {
                fingerprint: fingerprint.to_string(),
                reason: format!("fingerprint must be 40 or 64 hex characters (got {})", len),
            }),
        }
    }

    /// Parses a fingerprint delivered as raw bytes, e.g. read from a file.
    pub fn from_utf8(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| Error::InvalidFingerprint {
            fingerprint: String::from_utf8_lossy(raw).into_owned(),
            reason: format!("fingerprint is not text: {}", e),
        })?;
        Self::parse(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares against another fingerprint in any accepted format.
    pub fn matches(&self, fingerprint: &str) -> bool {
        self.0 == strip_hex_prefix(&normalize_fingerprint(fingerprint))
    }
}

fn strip_hex_prefix(normalized: &str) -> &str {
    normalized.strip_prefix("0x").unwrap_or(normalized)
}

impl fmt::Display for ExpectedFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ExpectedFingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACED: &str = "ABAF 11C6 5A29 70B1 30AB  E3C4 79BE 3E43 0041 1886";
    const PLAIN: &str = "abaf11c65a2970b130abe3c479be3e4300411886";

    #[test]
    fn test_normalize_strips_whitespace_and_case() {
        assert_eq!(normalize_fingerprint(SPACED), PLAIN);
        assert_eq!(normalize_fingerprint("AB CD"), normalize_fingerprint("abcd"));
        assert_eq!(normalize_fingerprint(" \n\tAb\u{a0}Cd "), "abcd");
    }

    #[test]
    fn test_normalize_idempotent() {
        for input in [SPACED, PLAIN, "", "  ", "0xDEAD beef", "Zz Yy"] {
            let once = normalize_fingerprint(input);
            assert_eq!(normalize_fingerprint(&once), once);
        }
    }

    #[test]
    fn test_parse_v4_fingerprint() {
        let fp = ExpectedFingerprint::parse(SPACED).unwrap();
        assert_eq!(fp.as_str(), PLAIN);
        assert_eq!(fp.to_string(), PLAIN);
    }

    #[test]
    fn test_parse_with_0x_prefix() {
        let fp = ExpectedFingerprint::parse("0XABAF11C65A2970B130ABE3C479BE3E4300411886").unwrap();
        assert_eq!(fp.as_str(), PLAIN);
    }

    #[test]
    fn test_parse_v6_fingerprint() {
        let v6 = "CB186C4F0609A697E4D52DFA6C722B0C1F1E27C18A56708F6525EC27BAD9ACC9";
        let fp = ExpectedFingerprint::parse(v6).unwrap();
        assert_eq!(fp.as_str().len(), 64);
    }

    #[test]
    fn test_invalid_empty() {
        let err = ExpectedFingerprint::parse("   ").unwrap_err();
        assert!(matches!(err, Error::InvalidFingerprint { .. }));
    }

    #[test]
    fn test_invalid_non_hex() {
        let err = ExpectedFingerprint::parse("ABAF11C65A2970B130ABE3C479BE3E430041188G").unwrap_err();
        assert!(matches!(err, Error::InvalidFingerprint { .. }));
    }

    #[test]
    fn test_invalid_key_id_length() {
        let err = ExpectedFingerprint::parse("786C63F330D7CB92").unwrap_err();
        assert!(matches!(err, Error::InvalidFingerprint { .. }));
    }

    #[test]
    fn test_from_utf8_rejects_binary() {
        let err = ExpectedFingerprint::from_utf8(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, Error::InvalidFingerprint { .. }));

        let fp = ExpectedFingerprint::from_utf8(SPACED.as_bytes()).unwrap();
        assert_eq!(fp.as_str(), PLAIN);
    }

    #[test]
    fn test_matches_is_whitespace_and_case_insensitive() {
        let fp = ExpectedFingerprint::parse(PLAIN).unwrap();
        assert!(fp.matches(SPACED));
        assert!(!fp.matches("abaf11c65a2970b130abe3c479be3e4300411887"));
    }

    #[test]
    fn test_matches_accepts_0x_prefix() {
        let fp = ExpectedFingerprint::parse(SPACED).unwrap();
        assert!(fp.matches("0xABAF11C65A2970B130ABE3C479BE3E4300411886"));
        assert!(fp.matches("0X abaf 11c6 5a29 70b1 30ab e3c4 79be 3e43 0041 1886"));
    }
}
