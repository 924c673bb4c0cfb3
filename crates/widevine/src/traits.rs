use std::future::Future;

use crate::error::CdmResult;
use crate::key::ContentKey;

/// Content Decryption Module able to run license exchanges.
///
/// Every session id returned by [`Cdm::open`] is used for at most one
/// challenge and one license, see [`crate::session::Session`].
pub trait Cdm: Send + Sync {
    fn open(&self) -> impl Future<Output = CdmResult<String>> + Send;

    /// Builds a license request for the base64 encoded `pssh` box.
    fn get_license_challenge(
        &self,
        session_id: &str,
        pssh: &str,
    ) -> impl Future<Output = CdmResult<Vec<u8>>> + Send;

    fn parse_license(
        &self,
        session_id: &str,
        license: &[u8],
    ) -> impl Future<Output = CdmResult<()>> + Send;

    /// Keys of every type, in the order the CDM enumerates them.
    fn get_keys(&self, session_id: &str) -> impl Future<Output = CdmResult<Vec<ContentKey>>> + Send;

    fn close(&self, session_id: &str) -> impl Future<Output = CdmResult<()>> + Send;
}
