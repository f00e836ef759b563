//! Packer: JSON serialize/deserialize stage of the pickle pipeline.

use crate::error::DriverError;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait Packer {
    fn pack<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, DriverError>;
    fn unpack<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DriverError>;
}

/// The only concrete `Packer`: `serde_json`.
pub struct JsonPacker;

impl Packer for JsonPacker {
    fn pack<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, DriverError> {
        serde_json::to_vec(value).map_err(|e| DriverError::DeviceNotFound(format!("json pack failed: {e}")))
    }

    fn unpack<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DriverError> {
        serde_json::from_slice(bytes).map_err(|e| DriverError::DeviceNotFound(format!("json unpack failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        k: i32,
    }

    #[test]
    fn round_trip() {
        let packer = JsonPacker;
        let bytes = packer.pack(&Sample { k: 1 }).unwrap();
        let back: Sample = packer.unpack(&bytes).unwrap();
        assert_eq!(back, Sample { k: 1 });
    }
}
