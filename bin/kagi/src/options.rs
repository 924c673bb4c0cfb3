use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Args;
use kagi::{
    widevine::{ContentKey, DeviceProfile, RemoteCdm},
    DownloadCommand, FragmentProbe, HttpClient, Job, LicenseRelay, PsshResolver,
};

#[derive(Args, Debug, Clone)]
pub struct RelayOptions {
    /// Device profile of the remote CDM
    ///
    /// JSON file with `host`, `secret` and `device_name` of a pywidevine serve API.
    #[clap(long, env = "KAGI_DEVICE", global = true)]
    pub device: Option<PathBuf>,

    /// Timeout of manifest, license and CDM requests, in seconds
    #[clap(long, default_value = "30", global = true)]
    pub timeout: u64,

    /// Timeout of the initialization fragment download, in seconds
    #[clap(long, default_value = "60", global = true)]
    pub probe_timeout: u64,

    /// yt-dlp executable used to probe initialization fragments. Looked up in PATH by default.
    #[clap(long, env = "KAGI_YT_DLP", global = true)]
    pub yt_dlp: Option<PathBuf>,

    /// Never download initialization fragments
    #[clap(long, global = true)]
    pub no_probe: bool,
}

impl RelayOptions {
    pub fn client(&self) -> anyhow::Result<HttpClient> {
        Ok(HttpClient::with_timeout(Duration::from_secs(self.timeout))?)
    }

    pub fn resolver(&self) -> PsshResolver {
        if self.no_probe {
            return PsshResolver::new();
        }

        let probe = match &self.yt_dlp {
            Some(program) => FragmentProbe::new(program),
            None => match FragmentProbe::yt_dlp() {
                Ok(probe) => probe,
                Err(e) => {
                    log::debug!("Fragment probe disabled: {e}");
                    return PsshResolver::new();
                }
            },
        };
        PsshResolver::new().with_probe(probe.timeout(Duration::from_secs(self.probe_timeout)))
    }

    pub fn relay(&self) -> anyhow::Result<LicenseRelay<RemoteCdm>> {
        let device = self
            .device
            .as_ref()
            .context("A device profile is required, pass --device or set KAGI_DEVICE")?;
        let profile = DeviceProfile::load(device)
            .with_context(|| format!("Failed to load device profile {}", device.display()))?;
        log::debug!("Using remote CDM device {}", profile.device_name);

        let client = self.client()?;
        let cdm = RemoteCdm::with_client((*client).clone(), profile);
        Ok(LicenseRelay::new(client, cdm).with_resolver(self.resolver()))
    }
}

#[derive(Args, Debug, Clone)]
pub struct DownloadOptions {
    /// Run the downloader once keys are acquired
    #[clap(long)]
    pub run: bool,

    /// Downloader executable
    #[clap(long, env = "KAGI_DOWNLOADER", default_value = "N_m3u8DL-RE")]
    pub downloader: PathBuf,

    /// Directory the downloader saves into
    #[clap(long, default_value = "downloads")]
    pub save_dir: PathBuf,
}

impl DownloadOptions {
    pub fn command(&self, job: &Job, keys: &[ContentKey]) -> DownloadCommand {
        DownloadCommand::new(&job.manifest_url, &job.title)
            .program(&self.downloader)
            .save_dir(&self.save_dir)
            .keys(keys)
    }
}
