use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::base64::{base64_decode, base64_encode};
use crate::constants::{PSSH_DATA_CENC_TRAILER, PLAYREADY_SYSTEM_ID, WIDEVINE_SYSTEM_ID};
use crate::error::{CdmError, CdmResult};
use crate::key::KeyId;

const PSSH_TAG: &[u8; 4] = b"pssh";

/// ISOBMFF `pssh` box.
///
/// ```text
/// [0..4]    size, u32 big-endian, whole box
/// [4..8]    "pssh"
/// [8]       version (0 or 1)
/// [9..12]   flags
/// [12..28]  system id
/// v1 only:  key id count (u32) + key ids
///           data size (u32) + data
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub system_id: [u8; 16],
    pub kids: Vec<KeyId>,
    pub data: Vec<u8>,
}

impl TryFrom<&[u8]> for PsshBox {
    type Error = CdmError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() < 32 {
            return Err(malformed("box is shorter than 32 bytes"));
        }
        if &value[4..8] != PSSH_TAG {
            return Err(malformed("invalid pssh header"));
        }

        let mut buf = Cursor::new(value);
        let size = buf.read_u32::<BigEndian>()? as usize;
        if size > value.len() {
            return Err(malformed("box size exceeds input length"));
        }
        buf.set_position(8);

        let version = buf.read_u8()?;
        if version > 1 {
            return Err(malformed(&format!("unsupported version {version}")));
        }
        let mut flags = [0u8; 3];
        buf.read_exact(&mut flags)?;
        let mut system_id = [0u8; 16];
        buf.read_exact(&mut system_id)?;

        let mut kids = Vec::new();
        if version == 1 {
            let kid_count = buf.read_u32::<BigEndian>()?;
            for _ in 0..kid_count {
                let mut kid = [0u8; 16];
                buf.read_exact(&mut kid)?;
                kids.push(KeyId(kid));
            }
        }

        let data_length = buf.read_u32::<BigEndian>()? as usize;
        let start = buf.position() as usize;
        if start + data_length > size {
            return Err(malformed("data exceeds box size"));
        }
        let data = value[start..start + data_length].to_vec();

        Ok(Self {
            version,
            flags,
            system_id,
            kids,
            data,
        })
    }
}

impl PsshBox {
    pub fn from_base64(input: &str) -> CdmResult<Self> {
        let bytes = base64_decode(input.trim())?;
        Self::try_from(bytes.as_slice())
    }

    /// Minimal version 0 Widevine box announcing a single key id.
    ///
    /// The data is a hand-encoded `WidevinePsshData` holding `key_id` and a
    /// `cenc` protection scheme, so the key id starts at byte 34 of the box.
    pub fn from_key_id(kid: &KeyId) -> Self {
        let mut data = Vec::with_capacity(2 + 16 + PSSH_DATA_CENC_TRAILER.len());
        // field 2 (key_id), length-delimited, 16 bytes
        data.extend_from_slice(&[0x12, 0x10]);
        data.extend_from_slice(kid.as_bytes());
        data.extend_from_slice(PSSH_DATA_CENC_TRAILER);

        Self {
            version: 0,
            flags: [0; 3],
            system_id: *WIDEVINE_SYSTEM_ID,
            kids: Vec::new(),
            data,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut size = 32 + self.data.len();
        if self.version == 1 {
            size += 4 + self.kids.len() * 16;
        }

        let mut buf = Vec::with_capacity(size);
        buf.extend_from_slice(&(size as u32).to_be_bytes());
        buf.extend_from_slice(PSSH_TAG);
        buf.push(self.version);
        buf.extend_from_slice(&self.flags);
        buf.extend_from_slice(&self.system_id);
        if self.version == 1 {
            buf.extend_from_slice(&(self.kids.len() as u32).to_be_bytes());
            for kid in &self.kids {
                buf.extend_from_slice(kid.as_bytes());
            }
        }
        buf.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn to_base64(&self) -> String {
        base64_encode(self.to_bytes())
    }

    pub fn is_widevine(&self) -> bool {
        &self.system_id == WIDEVINE_SYSTEM_ID
    }

    pub fn system_name(&self) -> &'static str {
        if &self.system_id == WIDEVINE_SYSTEM_ID {
            "Widevine"
        } else if &self.system_id == PLAYREADY_SYSTEM_ID {
            "PlayReady"
        } else {
            "Unknown"
        }
    }
}

/// Finds every `pssh` box inside raw media bytes, such as an initialization
/// fragment, without walking the box tree.
///
/// Each occurrence of the `pssh` tag is taken as a box whose size is the
/// big-endian u32 right before it. Boxes running past the end of the input
/// are truncated, not dropped.
pub fn scan_pssh_boxes(input: &[u8]) -> Vec<&[u8]> {
    let mut boxes = Vec::new();
    let mut offset = 0;

    while let Some(found) = find_tag(&input[offset..]) {
        let tag = offset + found;
        if tag < 4 {
            offset = tag + PSSH_TAG.len();
            continue;
        }

        let start = tag - 4;
        let size = u32::from_be_bytes([
            input[start],
            input[start + 1],
            input[start + 2],
            input[start + 3],
        ]) as usize;
        if size < 8 {
            offset = tag + PSSH_TAG.len();
            continue;
        }

        let end = start.saturating_add(size).min(input.len());
        boxes.push(&input[start..end]);
        offset = tag + size;
        if offset >= input.len() {
            break;
        }
    }

    boxes
}

fn find_tag(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(PSSH_TAG.len())
        .position(|window| window == PSSH_TAG)
}

fn malformed(message: &str) -> CdmError {
    CdmError::MalformedPssh(message.to_string())
}
