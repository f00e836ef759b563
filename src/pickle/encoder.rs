//! Encoder: base64 stage of the pickle pipeline.

use crate::error::DriverError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub trait Encoder {
    fn encode(&self, bytes: &[u8]) -> Vec<u8>;
    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError>;
}

/// The only concrete `Encoder`: standard base64.
pub struct Base64Encoder;

impl Encoder for Base64Encoder {
    fn encode(&self, bytes: &[u8]) -> Vec<u8> {
        STANDARD.encode(bytes).into_bytes()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError> {
        STANDARD
            .decode(bytes)
            .map_err(|e| DriverError::DeviceNotFound(format!("base64 decode failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let enc = Base64Encoder;
        let data = b"arbitrary bytes \x00\x01\x02".to_vec();
        let encoded = enc.encode(&data);
        assert_eq!(enc.decode(&encoded).unwrap(), data);
    }
}
