use crate::core::PersistenceError;

use super::{SaveFile, SAVE_FORMAT_VERSION};

const MAGIC: &[u8; 4] = b"R18X";
const HEADER_LEN: usize = 8;

/// Byte format of a save file.
pub trait ActionLogCodec {
    fn serialize(&self, save: &SaveFile) -> Result<Vec<u8>, PersistenceError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<SaveFile, PersistenceError>;
}

fn check_version(found: u32) -> Result<(), PersistenceError> {
    if found > SAVE_FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found,
            supported: SAVE_FORMAT_VERSION,
        });
    }
    Ok(())
}

/// `R18X`, format version as little-endian u32, bincode body.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl ActionLogCodec for BincodeCodec {
    fn serialize(&self, save: &SaveFile) -> Result<Vec<u8>, PersistenceError> {
        let body = bincode::serialize(save).map_err(|e| PersistenceError::Encode(e.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&save.format_version.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<SaveFile, PersistenceError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(PersistenceError::BadMagic);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        check_version(version)?;

        let mut save: SaveFile = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| PersistenceError::Decode(e.to_string()))?;
        save.format_version = version;
        Ok(save)
    }
}

/// Pretty-printed JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl ActionLogCodec for JsonCodec {
    fn serialize(&self, save: &SaveFile) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec_pretty(save).map_err(|e| PersistenceError::Encode(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<SaveFile, PersistenceError> {
        let save: SaveFile =
            serde_json::from_slice(bytes).map_err(|e| PersistenceError::Decode(e.to_string()))?;
        check_version(save.format_version)?;
        Ok(save)
    }
}
