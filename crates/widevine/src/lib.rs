pub mod constants;
pub mod device;
pub mod error;
pub mod key;
pub mod pssh;
pub mod remote;
pub mod session;
pub mod traits;

mod base64;

pub use crate::base64::{base64_decode, base64_decode_any, base64_encode};
pub use device::DeviceProfile;
pub use error::{CdmError, CdmResult};
pub use key::{ContentKey, KeyId, KeyType};
pub use pssh::PsshBox;
pub use remote::RemoteCdm;
pub use session::Session;
pub use traits::Cdm;
