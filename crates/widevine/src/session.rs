use crate::error::{CdmError, CdmResult};
use crate::key::ContentKey;
use crate::traits::Cdm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Opened,
    ChallengeGenerated,
    LicenseParsed,
}

/// A single-use CDM session: one challenge, one license, then [`Session::close`].
///
/// Dropping a session without closing it leaks the CDM side of the session.
pub struct Session<'cdm, C: Cdm> {
    cdm: &'cdm C,
    id: String,
    state: SessionState,
    closed: bool,
}

impl<'cdm, C: Cdm> Session<'cdm, C> {
    pub async fn open(cdm: &'cdm C) -> CdmResult<Self> {
        let id = cdm.open().await?;
        log::debug!("Opened CDM session {id}");

        Ok(Self {
            cdm,
            id,
            state: SessionState::Opened,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn generate_challenge(&mut self, pssh: &str) -> CdmResult<Vec<u8>> {
        if self.state != SessionState::Opened {
            return Err(CdmError::ChallengeAlreadyGenerated);
        }
        // a failed attempt still consumes the session
        self.state = SessionState::ChallengeGenerated;

        let challenge = self.cdm.get_license_challenge(&self.id, pssh).await?;
        log::debug!("Challenge generated ({} bytes)", challenge.len());
        Ok(challenge)
    }

    /// Loads the license and returns its CONTENT keys in CDM order.
    pub async fn parse_license_and_extract_keys(
        &mut self,
        license: &[u8],
    ) -> CdmResult<Vec<ContentKey>> {
        match self.state {
            SessionState::Opened => return Err(CdmError::ChallengeNotGenerated),
            SessionState::LicenseParsed => return Err(CdmError::LicenseAlreadyParsed),
            SessionState::ChallengeGenerated => {}
        }
        self.state = SessionState::LicenseParsed;

        self.cdm.parse_license(&self.id, license).await?;
        let keys = self.cdm.get_keys(&self.id).await?;
        log::debug!("CDM returned {} keys", keys.len());

        Ok(keys
            .into_iter()
            .filter(|key| {
                if !key.is_content() {
                    log::debug!("Skipping {} key {}", key.r#type.as_str(), key.kid);
                }
                key.is_content()
            })
            .collect())
    }

    pub async fn close(mut self) -> CdmResult<()> {
        self.closed = true;
        self.cdm.close(&self.id).await?;
        log::debug!("Closed CDM session {}", self.id);
        Ok(())
    }
}

impl<C: Cdm> Drop for Session<'_, C> {
    fn drop(&mut self) {
        if !self.closed {
            log::warn!("CDM session {} dropped without being closed", self.id);
        }
    }
}
