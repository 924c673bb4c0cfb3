/// Widevine DRM system id, `edef8ba9-79d6-4ace-a3c8-27dcd51d21ed`.
pub const WIDEVINE_SYSTEM_ID: &[u8; 16] = &[
    0xed, 0xef, 0x8b, 0xa9, 0x79, 0xd6, 0x4a, 0xce, 0xa3, 0xc8, 0x27, 0xdc, 0xd5, 0x1d, 0x21, 0xed,
];

/// `schemeIdUri` of Widevine `ContentProtection` descriptors, lowercased.
pub const WIDEVINE_SCHEME_ID_URI: &str = "urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";

/// PlayReady DRM system id, `9a04f079-9840-4286-ab92-e65be0885f95`.
pub const PLAYREADY_SYSTEM_ID: &[u8; 16] = &[
    0x9a, 0x04, 0xf0, 0x79, 0x98, 0x40, 0x42, 0x86, 0xab, 0x92, 0xe6, 0x5b, 0xe0, 0x88, 0x5f, 0x95,
];

/// Tail of the `WidevinePsshData` written after a synthesized key id:
/// field 9 (`protection_scheme`) set to `cenc`.
pub(crate) const PSSH_DATA_CENC_TRAILER: &[u8] = &[0x48, 0xe3, 0xdc, 0x95, 0x9b, 0x06];
