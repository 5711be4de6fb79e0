//! Body codec seam. The router decodes request bodies and encodes replies
//! only through `Codec`, so the JSON library stays swappable.

use serde_json::Value;

use crate::error::CodecError;

pub trait Codec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Human-readable rendering, used for debug API descriptors.
    fn encode_pretty(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        self.encode(value)
    }
}

/// `serde_json` backed codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn encode_pretty(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(value).map_err(|e| CodecError::Encode(e.to_string()))
    }
}
