//! The license round-trip of a single job.
//!
//! ```text
//! manifest ─▶ PSSH ─▶ challenge ─▶ patched template ─▶ license server
//!                                                           │
//!            content keys ◀─ CDM ◀─ license ◀─ response ◀───┘
//! ```

use std::fmt::{Display, Formatter};

use kagi_widevine::{Cdm, ContentKey, Session};

use crate::{
    error::{KagiError, KagiResult},
    extract::extract,
    job::Job,
    patch::patch,
    resolve::{PsshResolver, ResolvedPssh},
    transport::LicenseTransport,
    util::http::HttpClient,
};

#[derive(Debug, Clone)]
pub struct AcquiredKeys {
    pub pssh: ResolvedPssh,
    /// CONTENT keys in the order the CDM listed them.
    pub keys: Vec<ContentKey>,
}

/// One `kid:key` per line.
impl Display for AcquiredKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for key in &self.keys {
            writeln!(f, "{key}")?;
        }
        Ok(())
    }
}

pub struct LicenseRelay<C: Cdm> {
    client: HttpClient,
    transport: LicenseTransport,
    resolver: PsshResolver,
    cdm: C,
}

impl<C: Cdm> LicenseRelay<C> {
    pub fn new(client: HttpClient, cdm: C) -> Self {
        Self {
            transport: LicenseTransport::new(client.clone()),
            client,
            resolver: PsshResolver::new(),
            cdm,
        }
    }

    pub fn with_resolver(mut self, resolver: PsshResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn cdm(&self) -> &C {
        &self.cdm
    }

    pub async fn resolve_pssh(&self, manifest_url: &str) -> KagiResult<ResolvedPssh> {
        let manifest = self.client.fetch_text(manifest_url).await?;
        let resolved = self.resolver.resolve(manifest_url, &manifest).await?;
        log::info!("PSSH resolved from {}: {}", resolved.source, resolved.pssh);
        Ok(resolved)
    }

    /// Runs the whole round-trip for `job` in a fresh CDM session.
    ///
    /// The session is closed on every path once opened. A failed close is
    /// logged and does not override the result of the exchange.
    pub async fn acquire(&self, job: &Job) -> KagiResult<AcquiredKeys> {
        let pssh = self.resolve_pssh(&job.manifest_url).await?;

        let mut session = Session::open(&self.cdm)
            .await
            .map_err(KagiError::SessionError)?;
        let result = self.exchange(&mut session, job, &pssh.pssh).await;

        let session_id = session.id().to_string();
        if let Err(e) = session.close().await {
            log::warn!("Failed to close CDM session {session_id}: {e}");
        }

        let keys = result?;
        log::info!("Got {} content keys", keys.len());
        Ok(AcquiredKeys { pssh, keys })
    }

    async fn exchange(
        &self,
        session: &mut Session<'_, C>,
        job: &Job,
        pssh: &str,
    ) -> KagiResult<Vec<ContentKey>> {
        let challenge = session
            .generate_challenge(pssh)
            .await
            .map_err(KagiError::SessionError)?;

        let payload = patch(&job.body, &challenge);

        let response = self
            .transport
            .send(&job.license_url, &job.headers, payload.body)
            .await?;
        log::debug!(
            "License received: {} ({} bytes)",
            response.status,
            response.body.len()
        );

        let license = extract(&response.body, &response.text());
        session
            .parse_license_and_extract_keys(&license)
            .await
            .map_err(KagiError::LicenseParseError)
    }
}
