use std::path::Path;

use serde::Deserialize;

use crate::error::{CdmError, CdmResult};

/// Identity of the CDM device used for license exchanges.
///
/// The device itself lives behind a remote CDM service; the profile names
/// the service, the device on it and the secret used to access it.
///
/// ```json
/// { "host": "https://cdm.example.com", "secret": "…", "device_name": "android" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceProfile {
    pub host: String,
    pub secret: String,
    pub device_name: String,
}

impl DeviceProfile {
    pub fn load<P>(path: P) -> CdmResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            CdmError::InvalidDevice(format!("can not read {}: {e}", path.display()))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(input: &str) -> CdmResult<Self> {
        let profile: Self = serde_json::from_str(input)
            .map_err(|e| CdmError::InvalidDevice(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> CdmResult<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(CdmError::InvalidDevice(format!(
                "host must be an http(s) url, got {:?}",
                self.host
            )));
        }
        if self.device_name.trim().is_empty() {
            return Err(CdmError::InvalidDevice("device_name is empty".to_string()));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}",
            self.host.trim_end_matches('/'),
            self.device_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_profile() {
        let profile = DeviceProfile::from_json(
            r#"{"host":"https://cdm.example.com/","secret":"s3cr3t","device_name":"android"}"#,
        )
        .unwrap();
        assert_eq!(
            profile.endpoint("open"),
            "https://cdm.example.com/android/open"
        );
    }

    #[test]
    fn test_invalid_profiles() {
        assert!(DeviceProfile::from_json("{}").is_err());
        assert!(DeviceProfile::from_json(
            r#"{"host":"cdm.example.com","secret":"","device_name":"android"}"#
        )
        .is_err());
        assert!(DeviceProfile::from_json(
            r#"{"host":"http://localhost","secret":"","device_name":" "}"#
        )
        .is_err());
        assert!(matches!(
            DeviceProfile::load("/nonexistent/device.json"),
            Err(CdmError::InvalidDevice(_))
        ));
    }
}
