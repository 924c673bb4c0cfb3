use std::{num::NonZeroU32, path::PathBuf, sync::Arc};

use anyhow::bail;
use clap::Parser;
use tokio::{sync::Semaphore, task::JoinSet};

use super::keys::process_job;
use crate::options::{DownloadOptions, RelayOptions};

/// Process every job in a directory
#[derive(Parser, Debug, Clone)]
#[clap(name = "batch", short_flag = 'B')]
pub struct BatchCommand {
    /// Jobs processed at the same time
    #[clap(short, long, default_value = "4")]
    pub concurrency: NonZeroU32,

    #[clap(flatten)]
    pub download: DownloadOptions,

    /// Directory holding `*.json` job descriptors
    #[clap(default_value = "pending")]
    pub dir: PathBuf,
}

impl BatchCommand {
    pub async fn run(self, options: &RelayOptions) -> anyhow::Result<()> {
        let mut jobs = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
                jobs.push(path);
            }
        }
        jobs.sort();

        if jobs.is_empty() {
            log::info!("No jobs found in {}", self.dir.display());
            return Ok(());
        }
        log::info!(
            "Processing {} jobs with {} worker(s).",
            jobs.len(),
            self.concurrency
        );

        let relay = Arc::new(options.relay()?);
        let download = Arc::new(self.download);
        let permits = Arc::new(Semaphore::new(self.concurrency.get() as usize));

        let total = jobs.len();
        let mut tasks = JoinSet::new();
        for path in jobs {
            let permit = permits.clone().acquire_owned().await?;
            let relay = relay.clone();
            let download = download.clone();
            tasks.spawn(async move {
                let result = process_job(&relay, &path, &download).await;
                drop(permit);
                (path, result)
            });
        }

        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            let (path, result) = joined?;
            if let Err(e) = result {
                failed += 1;
                log::error!("{}: {e:#}", path.display());
            }
        }

        if failed > 0 {
            bail!("{failed} of {total} jobs failed");
        }
        log::info!("All {total} jobs done.");
        Ok(())
    }
}
