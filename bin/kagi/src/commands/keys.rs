use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use kagi::{widevine::RemoteCdm, Job, LicenseRelay};

use crate::options::{DownloadOptions, RelayOptions};

/// Acquire the content keys of a captured job
#[derive(Parser, Debug, Clone)]
#[clap(name = "keys", short_flag = 'K')]
pub struct KeysCommand {
    #[clap(flatten)]
    pub download: DownloadOptions,

    /// Job descriptor exported by the browser extension
    pub job: PathBuf,
}

impl KeysCommand {
    pub async fn run(self, options: &RelayOptions) -> anyhow::Result<()> {
        let relay = options.relay()?;
        process_job(&relay, &self.job, &self.download).await
    }
}

/// Acquires keys for the job at `path`, prints them with the downloader
/// command, and optionally runs it.
pub(crate) async fn process_job(
    relay: &LicenseRelay<RemoteCdm>,
    path: &Path,
    download: &DownloadOptions,
) -> anyhow::Result<()> {
    let job = Job::from_path(path)
        .with_context(|| format!("Failed to load job {}", path.display()))?;
    log::info!("Processing {} ({})", job.title, path.display());

    let acquired = relay.acquire(&job).await?;
    let command = download.command(&job, &acquired.keys);

    // printed at once so concurrent jobs do not interleave
    let mut output = String::new();
    writeln!(output, "[{}]", job.title)?;
    writeln!(output, "PSSH: {}", acquired.pssh.pssh)?;
    write!(output, "{acquired}")?;
    writeln!(output, "{}", command.display())?;
    print!("{output}");

    if download.run {
        command
            .run()
            .await
            .with_context(|| format!("Downloader failed for {}", job.title))?;
    }

    if job.delete_me {
        tokio::fs::remove_file(path).await?;
        log::info!("Removed job file {}", path.display());
    }

    Ok(())
}
