//! Embedding a fresh challenge into a captured license request body.
//!
//! License servers wrap the Widevine challenge in provider specific
//! envelopes. Instead of understanding them, the previous challenge is found
//! by its well known base64 prefix and swapped for the new one. Matching works
//! on raw bytes so everything around the challenge is sent back untouched.

use std::sync::LazyLock;

use kagi_widevine::base64_encode;
use regex::bytes::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChallengeEncoding {
    Base64,
    /// Base64, percent-encoded for a query string.
    UrlEncodedBase64,
}

impl ChallengeEncoding {
    fn encode(self, challenge: &[u8]) -> String {
        let encoded = base64_encode(challenge);
        match self {
            ChallengeEncoding::Base64 => encoded,
            ChallengeEncoding::UrlEncodedBase64 => urlencoding::encode(&encoded).into_owned(),
        }
    }
}

struct ChallengePattern {
    name: &'static str,
    /// Group 1 is the previous challenge.
    regex: Regex,
    encoding: ChallengeEncoding,
}

impl ChallengePattern {
    fn new(name: &'static str, pattern: &str, encoding: ChallengeEncoding) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            encoding,
        }
    }
}

/// Tried in order, the first match wins. `(?-u)` lets `.` match any byte
/// but `\n`.
static PATTERNS: LazyLock<Vec<ChallengePattern>> = LazyLock::new(|| {
    vec![
        ChallengePattern::new("json-caq", r#"(?-u)"(CAQ=.*?)""#, ChallengeEncoding::Base64),
        ChallengePattern::new("json-caes", r#"(?-u)"(CAES.*?)""#, ChallengeEncoding::Base64),
        ChallengePattern::new(
            "query-caes",
            r"(?-u)=(CAES.*?)(&|$)",
            ChallengeEncoding::UrlEncodedBase64,
        ),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedPayload {
    pub body: Vec<u8>,
    /// Name of the envelope that matched, `None` when the raw challenge is sent.
    pub pattern: Option<&'static str>,
}

impl PatchedPayload {
    pub fn is_raw_challenge(&self) -> bool {
        self.pattern.is_none()
    }
}

/// Replaces the first challenge-looking value of `template` with `challenge`.
///
/// Templates without a recognizable challenge are dropped and the raw
/// challenge becomes the whole body. Length fields inside the template are
/// not adjusted.
pub fn patch(template: &[u8], challenge: &[u8]) -> PatchedPayload {
    let matched = PATTERNS.iter().find_map(|pattern| {
        pattern
            .regex
            .captures(template)
            .and_then(|captures| captures.get(1))
            .map(|found| (pattern, found.range()))
    });

    match matched {
        Some((pattern, range)) => {
            log::debug!("Challenge envelope found: {}", pattern.name);
            let replacement = pattern.encoding.encode(challenge);

            let mut body = Vec::with_capacity(template.len() - range.len() + replacement.len());
            body.extend_from_slice(&template[..range.start]);
            body.extend_from_slice(replacement.as_bytes());
            body.extend_from_slice(&template[range.end..]);

            PatchedPayload {
                body,
                pattern: Some(pattern.name),
            }
        }
        None => {
            log::debug!("No challenge envelope found. Sending raw challenge.");
            PatchedPayload {
                body: challenge.to_vec(),
                pattern: None,
            }
        }
    }
}
