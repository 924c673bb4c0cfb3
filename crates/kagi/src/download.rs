use std::{ffi::OsString, path::PathBuf};

use kagi_widevine::ContentKey;
use tokio::process::Command;

use crate::error::{KagiError, KagiResult};

const DEFAULT_DOWNLOADER: &str = "N_m3u8DL-RE";
const DEFAULT_SAVE_DIR: &str = "downloads";

/// Invocation of the external downloader that fetches, decrypts and muxes
/// the stream once keys are known.
#[derive(Debug, Clone)]
pub struct DownloadCommand {
    program: PathBuf,
    manifest_url: String,
    keys: Vec<String>,
    save_name: String,
    save_dir: PathBuf,
}

impl DownloadCommand {
    pub fn new(manifest_url: impl Into<String>, save_name: impl Into<String>) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_DOWNLOADER),
            manifest_url: manifest_url.into(),
            keys: Vec::new(),
            save_name: save_name.into(),
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
        }
    }

    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self
    }

    pub fn keys<'a>(mut self, keys: impl IntoIterator<Item = &'a ContentKey>) -> Self {
        self.keys.extend(keys.into_iter().map(ToString::to_string));
        self
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.manifest_url.clone().into()];
        for key in &self.keys {
            args.push("--key".into());
            args.push(key.into());
        }
        args.push("--save-name".into());
        args.push(self.save_name.clone().into());
        args.push("--save-dir".into());
        args.push(self.save_dir.clone().into());
        args.push("-M".into());
        args.push("format=mkv:muxer=mkvmerge".into());
        args.push("--auto-select".into());
        args
    }

    /// Shell-quoted command line, for copying into a terminal.
    pub fn display(&self) -> String {
        let program = self.program.to_string_lossy();
        let args: Vec<String> = self
            .args()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let words = std::iter::once(program.as_ref()).chain(args.iter().map(String::as_str));
        shlex::try_join(words).unwrap_or_else(|_| {
            // nul bytes cannot be quoted
            std::iter::once(program.to_string())
                .chain(args.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    pub async fn run(&self) -> KagiResult<()> {
        tokio::fs::create_dir_all(&self.save_dir).await?;

        log::info!("Running {}", self.display());
        let status = Command::new(&self.program)
            .args(self.args())
            .status()
            .await?;
        if !status.success() {
            return Err(KagiError::DownloaderFailed(status));
        }
        Ok(())
    }
}
