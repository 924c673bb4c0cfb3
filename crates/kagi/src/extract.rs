use std::sync::LazyLock;

use kagi_widevine::base64_decode_any;
use regex::Regex;

/// A JSON string holding a base64 encoded license message.
static LICENSE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(CAIS.*?)""#).unwrap());

/// License bytes for the CDM out of a license server response.
///
/// A license wrapped in a JSON envelope is decoded, any other body is
/// returned as is.
pub fn extract(response: &[u8], response_text: &str) -> Vec<u8> {
    let Some(captures) = LICENSE_PATTERN.captures(response_text) else {
        return response.to_vec();
    };

    match base64_decode_any(&captures[1]) {
        Ok(license) => {
            log::debug!("License extracted from JSON field ({} bytes)", license.len());
            license
        }
        Err(e) => {
            log::warn!("License field is not valid base64 ({e}), using raw response");
            response.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use kagi_widevine::{base64_decode, base64_encode};

    use super::*;

    #[test]
    fn test_json_envelope() {
        let license = [0x08, 0x02, 0x12, 0x20, 0xff];
        let body = format!(r#"{{"status":"ok","license":"{}"}}"#, base64_encode(license));
        assert!(body.contains("\"CAIS"));
        assert_eq!(extract(body.as_bytes(), &body), license);
    }

    #[test]
    fn test_url_safe_value() {
        let body = r#"{"license":"CAIS_enc"}"#;
        let license = extract(body.as_bytes(), body);
        assert_ne!(license, body.as_bytes());
        assert_eq!(license.len(), 6);
        assert_eq!(&license[..3], &base64_decode("CAIS").unwrap()[..]);
    }

    #[test]
    fn test_raw_passthrough() {
        let raw = [0x08, 0x02, 0x12, 0x00, 0x80, 0xfe];
        let text = String::from_utf8_lossy(&raw);
        assert_eq!(extract(&raw, &text), raw);

        // a challenge echoed back is not a license
        let body = r#"{"challenge":"CAES_abc"}"#;
        assert_eq!(extract(body.as_bytes(), body), body.as_bytes());

        let body = r#"{"license":"CAIS!!"}"#;
        assert_eq!(extract(body.as_bytes(), body), body.as_bytes());
    }
}
