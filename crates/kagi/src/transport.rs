use std::str::FromStr;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, HOST};

use crate::{
    error::{KagiError, KagiResult},
    job::LicenseHeaders,
    util::http::HttpClient,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maximum number of characters of an error body kept in [`KagiError::HttpError`].
const ERROR_BODY_EXCERPT: usize = 200;

pub struct LicenseResponse {
    pub status: reqwest::StatusCode,
    pub body: Vec<u8>,
}

impl LicenseResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Posts license requests. Each request is sent exactly once: license
/// endpoints usually reject a replayed nonce, so nothing is retried.
#[derive(Clone)]
pub struct LicenseTransport {
    client: HttpClient,
}

impl LicenseTransport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub async fn send(
        &self,
        url: &str,
        headers: &LicenseHeaders,
        payload: Vec<u8>,
    ) -> KagiResult<LicenseResponse> {
        log::debug!("Sending license request to {url} ({} bytes)", payload.len());
        let response = self
            .client
            .post(url)
            .headers(normalize_headers(headers))
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        log::debug!("License response status: {status}");
        if !(status.is_success() || status.is_redirection()) {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(ERROR_BODY_EXCERPT)
                .collect();
            log::warn!("Error body: {body}");
            return Err(KagiError::HttpError { status, body });
        }

        let body = response.bytes().await?.to_vec();
        Ok(LicenseResponse { status, body })
    }
}

/// Captured headers ready to be replayed.
///
/// `Content-Length` and `Host` are dropped since the payload and connection
/// are new, and `Content-Type` defaults to `application/octet-stream`.
pub fn normalize_headers(headers: &LicenseHeaders) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len() + 1);
    for (name, value) in headers.iter() {
        let name = match HeaderName::from_str(name.trim()) {
            Ok(name) => name,
            Err(_) => {
                log::warn!("Ignored invalid header name: {name}");
                continue;
            }
        };
        if name == CONTENT_LENGTH || name == HOST {
            continue;
        }
        match HeaderValue::from_str(value.trim()) {
            Ok(value) => {
                map.append(name, value);
            }
            Err(_) => log::warn!("Ignored invalid value of header {name}"),
        }
    }

    if !map.contains_key(CONTENT_TYPE) {
        map.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    }
    map
}
