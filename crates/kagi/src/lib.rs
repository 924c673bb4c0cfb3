pub mod download;
pub mod error;
pub mod extract;
pub mod job;
pub mod patch;
pub mod relay;
pub mod resolve;
pub mod transport;
pub mod util;

pub use download::DownloadCommand;
pub use error::{KagiError, KagiResult};
pub use job::{Job, LicenseHeaders};
pub use relay::{AcquiredKeys, LicenseRelay};
pub use resolve::{FragmentProbe, PsshResolver, PsshSource, ResolvedPssh};
pub use transport::LicenseTransport;
pub use util::HttpClient;

pub use kagi_widevine as widevine;
