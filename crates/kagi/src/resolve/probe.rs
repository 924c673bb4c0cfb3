use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use kagi_widevine::{base64_encode, pssh::scan_pssh_boxes};
use tokio::process::Command;

use crate::error::{KagiError, KagiResult};

/// Base64 lengths outside this range are not plausible Widevine boxes.
const CANDIDATE_LENGTH: std::ops::RangeInclusive<usize> = 20..=220;

const FRAGMENT_FILE_NAME: &str = "init.m4f";

/// Downloads the initialization fragment of a manifest with `yt-dlp` and
/// looks for `pssh` boxes inside it.
///
/// Every probe writes into its own temporary directory, so concurrent jobs
/// never share the fragment file.
pub struct FragmentProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FragmentProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Looks up `yt-dlp` in `PATH`.
    pub fn yt_dlp() -> KagiResult<Self> {
        Ok(Self::new(which::which("yt-dlp")?))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve(&self, manifest_url: &str) -> KagiResult<Option<String>> {
        log::debug!("Attempting to extract PSSH via fragment ({})", self.program.display());

        let temp_dir = tempfile::tempdir()?;
        let fragment_path = temp_dir.path().join(FRAGMENT_FILE_NAME);
        self.download(manifest_url, &fragment_path).await?;

        let fragment = match tokio::fs::read(&fragment_path).await {
            Ok(fragment) => fragment,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Downloader produced no fragment");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(select_candidate(&fragment))
    }

    async fn download(&self, manifest_url: &str, output: &Path) -> KagiResult<()> {
        let mut command = Command::new(&self.program);
        command
            .arg("-q")
            .arg("--no-warnings")
            .arg("--test")
            .arg("--allow-unplayable-formats")
            .arg("-f")
            .arg("bestvideo[ext=mp4]/bestaudio[ext=m4a]/best")
            .arg("-o")
            .arg(output)
            .arg(manifest_url)
            .kill_on_drop(true);

        let status = tokio::time::timeout(self.timeout, command.status())
            .await
            .map_err(|_| KagiError::ProbeTimeout(self.timeout))??;
        if !status.success() {
            return Err(KagiError::ProbeFailed(status));
        }
        Ok(())
    }
}

/// First `pssh` box of `fragment` whose base64 form has a plausible length.
pub fn select_candidate(fragment: &[u8]) -> Option<String> {
    scan_pssh_boxes(fragment)
        .into_iter()
        .map(base64_encode)
        .find(|candidate| CANDIDATE_LENGTH.contains(&candidate.len()))
}

#[cfg(test)]
mod tests {
    use kagi_widevine::{KeyId, PsshBox};

    use super::*;

    fn pssh_with_data(len: usize) -> Vec<u8> {
        PsshBox {
            version: 0,
            flags: [0; 3],
            system_id: [0x11; 16],
            kids: Vec::new(),
            data: vec![0xab; len],
        }
        .to_bytes()
    }

    #[test]
    fn test_select_skips_implausible_lengths() {
        // 12 bytes encode to 16 characters
        let mut tiny = vec![0, 0, 0, 12];
        tiny.extend_from_slice(b"pssh\0\0\0\0");
        // 32 + 200 bytes encode to 312 characters
        let huge = pssh_with_data(200);
        let widevine = PsshBox::from_key_id(&KeyId([3; 16])).to_bytes();

        let mut fragment = Vec::new();
        fragment.extend_from_slice(&tiny);
        fragment.extend_from_slice(&huge);
        fragment.extend_from_slice(&widevine);

        assert_eq!(select_candidate(&fragment), Some(base64_encode(&widevine)));
    }

    #[test]
    fn test_select_band_edges() {
        // 32 + 130 bytes encode to 216 characters, 32 + 136 to 224
        let inside = pssh_with_data(130);
        assert_eq!(base64_encode(&inside).len(), 216);
        assert_eq!(select_candidate(&inside), Some(base64_encode(&inside)));

        let outside = pssh_with_data(136);
        assert_eq!(base64_encode(&outside).len(), 224);
        assert_eq!(select_candidate(&outside), None);

        assert_eq!(select_candidate(b"no boxes here"), None);
    }

    #[test]
    fn test_select_exact_band_edges() {
        fn raw_box(len: usize) -> Vec<u8> {
            let mut bytes = (len as u32).to_be_bytes().to_vec();
            bytes.extend_from_slice(b"pssh");
            bytes.resize(len, 0xab);
            bytes
        }

        // 15 bytes encode to 20 characters, 165 to 220
        for (len, encoded_len) in [(15, 20), (165, 220)] {
            let candidate = raw_box(len);
            assert_eq!(base64_encode(&candidate).len(), encoded_len);
            assert_eq!(select_candidate(&candidate), Some(base64_encode(&candidate)));
        }

        // 12 bytes encode to 16 characters, 166 to 224
        for (len, encoded_len) in [(12, 16), (166, 224)] {
            let candidate = raw_box(len);
            assert_eq!(base64_encode(&candidate).len(), encoded_len);
            assert_eq!(select_candidate(&candidate), None);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_reads_fragment_written_by_downloader() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let widevine = PsshBox::from_key_id(&KeyId([9; 16])).to_bytes();
        let scripts = tempfile::tempdir()?;
        let fixture = scripts.path().join("fragment.bin");
        let mut fragment = b"\0\0\0\x10ftypiso6\0\0\0\0".to_vec();
        fragment.extend_from_slice(&widevine);
        std::fs::write(&fixture, fragment)?;

        // the output path follows `-o`
        let script = scripts.path().join("fake-downloader");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nwhile [ \"$1\" != \"-o\" ]; do shift; done\ncp '{}' \"$2\"\n",
                fixture.display()
            ),
        )?;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

        let pssh = FragmentProbe::new(&script)
            .resolve("https://example.com/manifest.mpd")
            .await?;
        assert_eq!(pssh, Some(base64_encode(&widevine)));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_timeout() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let scripts = tempfile::tempdir()?;
        let script = scripts.path().join("slow-downloader");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n")?;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

        let result = FragmentProbe::new(&script)
            .timeout(Duration::from_millis(100))
            .resolve("https://example.com/manifest.mpd")
            .await;
        assert!(matches!(result, Err(KagiError::ProbeTimeout(_))));
        Ok(())
    }
}
