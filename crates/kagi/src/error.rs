use kagi_widevine::CdmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KagiError {
    #[error("Could not find PSSH or default_KID in manifest")]
    PsshNotFound,

    #[error("CDM session error: {0}")]
    SessionError(#[source] CdmError),

    #[error("HTTP error: {status}")]
    HttpError {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("License parse error: {0}")]
    LicenseParseError(#[source] CdmError),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Fragment probe exited with {0}")]
    ProbeFailed(std::process::ExitStatus),

    #[error("Fragment probe timed out after {0:?}")]
    ProbeTimeout(std::time::Duration),

    #[error("Downloader exited with {0}")]
    DownloaderFailed(std::process::ExitStatus),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    MpdParseError(#[from] dash_mpd::DashMpdError),

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),
}

impl KagiError {
    /// Network failures and non-success responses of the manifest fetch or the
    /// license request.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, KagiError::HttpError { .. } | KagiError::RequestError(_))
    }
}

pub type KagiResult<T> = Result<T, KagiError>;
