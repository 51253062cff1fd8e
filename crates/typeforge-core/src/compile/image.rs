//! Module image encoding.
//!
//! ```text
//! ┌────────────┬───────────┬─────────────┬────────────────────────────┐
//! │ "TFMOD\0"  │ version   │ checksum    │ bincode payload            │
//! │ 6 bytes    │ u16 LE    │ u64 LE      │ (ModuleImage, serde mode)  │
//! └────────────┴───────────┴─────────────┴────────────────────────────┘
//! ```
//!
//! The checksum is XXH3-64 (seed 0) of the payload bytes. It is part of the
//! file format and does not depend on the build that wrote the image.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::TypeDefinition;

/// Leading bytes of every module image.
pub const MAGIC: &[u8; 6] = b"TFMOD\0";

/// Current image format version.
pub const FORMAT_VERSION: u16 = 2;

const HEADER_LEN: usize = MAGIC.len() + 2 + 8;

/// Decoded contents of a module image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleImage {
    pub name: String,
    pub file_name: String,
    pub types: Vec<TypeDefinition>,
    /// Identities of the references the module was compiled against.
    pub references: Vec<String>,
}

impl ModuleImage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&checksum(&payload).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::InvalidImage(format!(
                "{} byte(s) is shorter than the image header",
                bytes.len()
            )));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidImage("bad magic".to_string()));
        }

        let (version, rest) = bytes[MAGIC.len()..].split_at(2);
        let version = u16::from_le_bytes([version[0], version[1]]);
        if version != FORMAT_VERSION {
            return Err(Error::InvalidImage(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }

        let (sum, payload) = rest.split_at(8);
        let mut expected = [0u8; 8];
        expected.copy_from_slice(sum);
        if u64::from_le_bytes(expected) != checksum(payload) {
            return Err(Error::InvalidImage("checksum mismatch".to_string()));
        }

        let (image, read) =
            bincode::serde::decode_from_slice::<Self, _>(payload, bincode::config::standard())
                .map_err(|e| Error::InvalidImage(e.to_string()))?;
        if read != payload.len() {
            return Err(Error::InvalidImage("trailing bytes after payload".to_string()));
        }
        Ok(image)
    }
}

/// XXH3-64 checksum of an image payload.
pub fn checksum(payload: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(payload)
}
