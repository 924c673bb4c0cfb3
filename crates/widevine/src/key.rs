use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::CdmError;

/// 16-byte key id. Parses from plain or hyphenated (UUID style) hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId(pub [u8; 16]);

impl KeyId {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl FromStr for KeyId {
    type Err = CdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str: String = s.trim().chars().filter(|c| *c != '-').collect();
        let bytes = hex::decode(&hex_str)?;
        let kid = bytes
            .try_into()
            .map_err(|_| CdmError::InvalidKeyId(s.to_string()))?;
        Ok(Self(kid))
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Signing,
    Content,
    KeyControl,
    OperatorSession,
    Entitlement,
    OemContent,
    Unknown,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Signing => "SIGNING",
            KeyType::Content => "CONTENT",
            KeyType::KeyControl => "KEY_CONTROL",
            KeyType::OperatorSession => "OPERATOR_SESSION",
            KeyType::Entitlement => "ENTITLEMENT",
            KeyType::OemContent => "OEM_CONTENT",
            KeyType::Unknown => "UNKNOWN",
        }
    }
}

impl From<&str> for KeyType {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "SIGNING" => KeyType::Signing,
            "CONTENT" => KeyType::Content,
            "KEY_CONTROL" => KeyType::KeyControl,
            "OPERATOR_SESSION" => KeyType::OperatorSession,
            "ENTITLEMENT" => KeyType::Entitlement,
            "OEM_CONTENT" => KeyType::OemContent,
            _ => KeyType::Unknown,
        }
    }
}

/// A key returned by the CDM after a license was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey {
    pub r#type: KeyType,
    pub kid: KeyId,
    pub key: Vec<u8>,
}

impl ContentKey {
    pub fn is_content(&self) -> bool {
        self.r#type == KeyType::Content
    }
}

/// Renders as `kid:key` in lowercase hex, the form external decryptors accept.
impl Display for ContentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kid, hex::encode(&self.key))
    }
}
