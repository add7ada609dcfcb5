use serde::{Serialize, de::DeserializeOwned};

use super::errors::{CodecError, Result};

/// Maximum allowed frame size (1MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Serializes a message into one JSON text frame.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    let frame = serde_json::to_string(value).map_err(CodecError::Encode)?;
    if frame.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            actual: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(frame)
}

/// Parses one JSON text frame. Oversized frames are rejected before parsing.
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            actual: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    serde_json::from_str(frame).map_err(CodecError::Decode)
}
