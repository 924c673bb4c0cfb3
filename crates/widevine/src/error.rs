use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdmError {
    #[error("Malformed PSSH box: {0}")]
    MalformedPssh(String),

    #[error("Invalid key id: {0}")]
    InvalidKeyId(String),

    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Invalid device profile: {0}")]
    InvalidDevice(String),

    #[error("Remote CDM returned {status}: {message}")]
    RemoteCdm {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("A license challenge has already been generated for this session")]
    ChallengeAlreadyGenerated,

    #[error("No license challenge was generated for this session")]
    ChallengeNotGenerated,

    #[error("The license of this session has already been parsed")]
    LicenseAlreadyParsed,

    #[error("License rejected: {0}")]
    LicenseRejected(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    HexDecodeError(#[from] hex::FromHexError),
}

pub type CdmResult<T> = Result<T, CdmError>;
