use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::base64::{base64_decode, base64_encode};
use crate::device::DeviceProfile;
use crate::error::{CdmError, CdmResult};
use crate::key::{ContentKey, KeyType};
use crate::traits::Cdm;

/// Client of a pywidevine compatible `serve` API.
pub struct RemoteCdm {
    client: Client,
    profile: DeviceProfile,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct OpenData {
    session_id: String,
}

#[derive(Serialize)]
struct ChallengeRequest<'a> {
    session_id: &'a str,
    init_data: &'a str,
    privacy_mode: bool,
}

#[derive(Deserialize)]
struct ChallengeData {
    challenge_b64: String,
}

#[derive(Serialize)]
struct LicenseRequest<'a> {
    session_id: &'a str,
    license_message: String,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    session_id: &'a str,
}

#[derive(Deserialize)]
struct KeysData {
    keys: Vec<RemoteKey>,
}

#[derive(Deserialize)]
struct RemoteKey {
    key_id: String,
    key: String,
    r#type: String,
}

impl RemoteCdm {
    pub fn new(profile: DeviceProfile) -> Self {
        Self::with_client(Client::new(), profile)
    }

    pub fn with_client(client: Client, profile: DeviceProfile) -> Self {
        Self { client, profile }
    }

    async fn call<T>(&self, request: RequestBuilder) -> CdmResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = request
            .header("X-Secret-Key", &self.profile.secret)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .map(|r| r.message)
                .unwrap_or(text);
            return Err(CdmError::RemoteCdm { status, message });
        }

        let response: ApiResponse<T> = serde_json::from_str(&text)?;
        Ok(response.data)
    }

    async fn call_data<T>(&self, request: RequestBuilder) -> CdmResult<T>
    where
        T: DeserializeOwned,
    {
        self.call(request)
            .await?
            .ok_or_else(|| CdmError::RemoteCdm {
                status: reqwest::StatusCode::OK,
                message: "response carries no data".to_string(),
            })
    }
}

impl Cdm for RemoteCdm {
    async fn open(&self) -> CdmResult<String> {
        let request = self.client.get(self.profile.endpoint("open"));
        let data: OpenData = self.call_data(request).await?;
        Ok(data.session_id)
    }

    async fn get_license_challenge(&self, session_id: &str, pssh: &str) -> CdmResult<Vec<u8>> {
        let request = self
            .client
            .post(self.profile.endpoint("get_license_challenge/STREAMING"))
            .json(&ChallengeRequest {
                session_id,
                init_data: pssh,
                privacy_mode: false,
            });
        let data: ChallengeData = self.call_data(request).await?;
        Ok(base64_decode(data.challenge_b64)?)
    }

    async fn parse_license(&self, session_id: &str, license: &[u8]) -> CdmResult<()> {
        let request = self
            .client
            .post(self.profile.endpoint("parse_license"))
            .json(&LicenseRequest {
                session_id,
                license_message: base64_encode(license),
            });
        match self.call::<serde_json::Value>(request).await {
            Ok(_) => Ok(()),
            Err(CdmError::RemoteCdm { message, .. }) => Err(CdmError::LicenseRejected(message)),
            Err(e) => Err(e),
        }
    }

    async fn get_keys(&self, session_id: &str) -> CdmResult<Vec<ContentKey>> {
        let request = self
            .client
            .post(self.profile.endpoint("get_keys/ALL"))
            .json(&SessionRequest { session_id });
        let data: KeysData = self.call_data(request).await?;

        data.keys
            .into_iter()
            .map(|key| -> CdmResult<ContentKey> {
                Ok(ContentKey {
                    r#type: KeyType::from(key.r#type.as_str()),
                    kid: key.key_id.parse()?,
                    key: hex::decode(key.key)?,
                })
            })
            .collect()
    }

    async fn close(&self, session_id: &str) -> CdmResult<()> {
        let request = self
            .client
            .get(self.profile.endpoint(&format!("close/{session_id}")));
        self.call::<serde_json::Value>(request).await?;
        Ok(())
    }
}
