//! Locating the Widevine PSSH of a manifest.
//!
//! Three strategies are tried in order, the first hit wins:
//!
//! 1. [`resolve_explicit`]: the `cenc:pssh` of a Widevine `ContentProtection`.
//! 2. [`resolve_from_key_id`]: a box synthesized from `cenc:default_KID`.
//! 3. [`FragmentProbe`]: boxes found in a downloaded initialization fragment.
//!
//! A failing strategy only moves on to the next one.

mod manifest;
mod probe;

use std::fmt::{Display, Formatter};

pub use manifest::{resolve_explicit, resolve_from_key_id};
pub use probe::{select_candidate, FragmentProbe};

use crate::error::{KagiError, KagiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsshSource {
    Manifest,
    DefaultKeyId,
    Fragment,
}

impl Display for PsshSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PsshSource::Manifest => "manifest",
            PsshSource::DefaultKeyId => "default_KID",
            PsshSource::Fragment => "initialization fragment",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPssh {
    /// Base64 encoded `pssh` box.
    pub pssh: String,
    pub source: PsshSource,
}

#[derive(Default)]
pub struct PsshResolver {
    probe: Option<FragmentProbe>,
}

impl PsshResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the fragment probe as the last resort.
    pub fn with_probe(mut self, probe: FragmentProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub async fn resolve(&self, manifest_url: &str, manifest: &str) -> KagiResult<ResolvedPssh> {
        if let Some(pssh) = resolve_explicit(manifest) {
            return Ok(ResolvedPssh {
                pssh,
                source: PsshSource::Manifest,
            });
        }

        if let Some(pssh) = resolve_from_key_id(manifest) {
            return Ok(ResolvedPssh {
                pssh,
                source: PsshSource::DefaultKeyId,
            });
        }

        if let Some(probe) = &self.probe {
            match probe.resolve(manifest_url).await {
                Ok(Some(pssh)) => {
                    return Ok(ResolvedPssh {
                        pssh,
                        source: PsshSource::Fragment,
                    })
                }
                Ok(None) => log::debug!("No usable PSSH in initialization fragment"),
                Err(e) => log::warn!("Fragment probe failed: {e}"),
            }
        }

        Err(KagiError::PsshNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KID_ONLY: &str = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" xmlns:cenc="urn:mpeg:cenc:2013" type="static">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc" cenc:default_KID="11111111-2222-3333-4444-555555555555"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[tokio::test]
    async fn test_key_id_strategy() -> KagiResult<()> {
        let resolved = PsshResolver::new()
            .resolve("https://example.com/manifest.mpd", KID_ONLY)
            .await?;
        assert_eq!(resolved.source, PsshSource::DefaultKeyId);
        assert_eq!(resolved.pssh, resolve_from_key_id(KID_ONLY).unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted() {
        let result = PsshResolver::new()
            .resolve("https://example.com/manifest.mpd", "<MPD></MPD>")
            .await;
        assert!(matches!(result, Err(KagiError::PsshNotFound)));
    }

    #[tokio::test]
    async fn test_inline_pssh_wins_over_key_id() -> KagiResult<()> {
        let manifest = KID_ONLY.replace(
            "</AdaptationSet>",
            r#"  <ContentProtection schemeIdUri="urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed">
        <cenc:pssh>AAAAMnBzc2g=</cenc:pssh>
      </ContentProtection>
    </AdaptationSet>"#,
        );
        assert!(resolve_from_key_id(&manifest).is_some());

        let resolved = PsshResolver::new()
            .resolve("https://example.com/manifest.mpd", &manifest)
            .await?;
        assert_eq!(resolved.source, PsshSource::Manifest);
        assert_eq!(resolved.pssh, "AAAAMnBzc2g=");
        Ok(())
    }

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join(name);
        std::fs::write(&script, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fragment_used_last() -> KagiResult<()> {
        use kagi_widevine::{base64_encode, KeyId, PsshBox};

        let dir = tempfile::tempdir()?;
        let widevine = PsshBox::from_key_id(&KeyId([5; 16])).to_bytes();
        let fixture = dir.path().join("fragment.bin");
        std::fs::write(&fixture, &widevine)?;
        let downloader = write_script(
            dir.path(),
            "fake-downloader",
            &format!(
                "while [ \"$1\" != \"-o\" ]; do shift; done\ncp '{}' \"$2\"\n",
                fixture.display()
            ),
        );

        let resolved = PsshResolver::new()
            .with_probe(FragmentProbe::new(downloader))
            .resolve("https://example.com/manifest.mpd", "<MPD></MPD>")
            .await?;
        assert_eq!(resolved.source, PsshSource::Fragment);
        assert_eq!(resolved.pssh, base64_encode(&widevine));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fragment_not_downloaded_when_manifest_resolves() -> KagiResult<()> {
        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("invoked");
        let downloader = write_script(
            dir.path(),
            "marking-downloader",
            &format!("touch '{}'\nexit 1\n", marker.display()),
        );

        let resolved = PsshResolver::new()
            .with_probe(FragmentProbe::new(downloader))
            .resolve("https://example.com/manifest.mpd", KID_ONLY)
            .await?;
        assert_eq!(resolved.source, PsshSource::DefaultKeyId);
        assert!(!marker.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_probe_is_absorbed() {
        let resolver = PsshResolver::new().with_probe(FragmentProbe::new("false"));
        let result = resolver
            .resolve("https://example.com/manifest.mpd", "not xml at all")
            .await;
        assert!(matches!(result, Err(KagiError::PsshNotFound)));
    }
}
