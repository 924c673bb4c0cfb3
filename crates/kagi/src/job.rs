use std::{fmt, path::Path, sync::LazyLock};

use kagi_widevine::base64_decode;
use regex::Regex;
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::error::{KagiError, KagiResult};

/// A captured license request, as exported by the browser extension.
///
/// ```json
/// {
///   "manifestUrl": "https://example.com/manifest.mpd",
///   "licenseUrl": "https://example.com/license",
///   "headers": { "Authorization": "Bearer …" },
///   "bodyBase64": "CAQ=",
///   "title": "video",
///   "deleteMe": false
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub manifest_url: String,
    pub license_url: String,
    #[serde(default)]
    pub headers: LicenseHeaders,
    /// Original POST body of the license request.
    #[serde(rename = "bodyBase64", deserialize_with = "deserialize_body")]
    pub body: Vec<u8>,
    #[serde(default = "default_title")]
    pub title: String,
    /// Remove the job file once keys have been acquired.
    #[serde(default)]
    pub delete_me: bool,
}

impl Job {
    pub fn from_path<P>(path: P) -> KagiResult<Self>
    where
        P: AsRef<Path>,
    {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(input: &str) -> KagiResult<Self> {
        let job: Job = serde_json::from_str(input)?;
        if job.manifest_url.is_empty() {
            return Err(KagiError::InvalidJob("manifestUrl is empty".to_string()));
        }
        if job.license_url.is_empty() {
            return Err(KagiError::InvalidJob("licenseUrl is empty".to_string()));
        }
        Ok(job)
    }
}

fn default_title() -> String {
    "video".to_string()
}

fn deserialize_body<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let body = String::deserialize(deserializer)?;
    base64_decode(body.trim()).map_err(serde::de::Error::custom)
}

/// Request headers in capture order, names kept as captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseHeaders(Vec<(String, String)>);

impl LicenseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the legacy `Name: value; Other: value` form.
    pub fn parse_legacy(input: &str) -> Self {
        static LEGACY_HEADER: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"([^:]+):\s*([^;]+)").unwrap());

        let mut headers = Self::new();
        for captures in LEGACY_HEADER.captures_iter(input) {
            let name = captures[1].trim_matches(|c: char| c == ';' || c.is_whitespace());
            if name.is_empty() {
                continue;
            }
            headers.insert(name, captures[2].trim());
        }
        headers
    }

    /// Replaces every header named `name`, ignoring case, or appends it.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .0
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(index) => {
                self.remove(&name);
                self.0.insert(index.min(self.0.len()), (name, value));
            }
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N, V> FromIterator<(N, V)> for LicenseHeaders
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for LicenseHeaders {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = LicenseHeaders;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a header object or a `Name: value; …` string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(LicenseHeaders::parse_legacy(v))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(LicenseHeaders::new())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut headers = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, value)) = map.next_entry::<String, serde_json::Value>()? {
                    let value = match value {
                        serde_json::Value::String(value) => value,
                        serde_json::Value::Null => continue,
                        other => other.to_string(),
                    };
                    headers.push((name, value));
                }
                Ok(LicenseHeaders(headers))
            }
        }

        deserializer.deserialize_any(HeadersVisitor)
    }
}
