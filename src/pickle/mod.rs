//! The pickle pipeline: pack (JSON) → compress (zlib) → encode (base64), and back.
//!
//! Packer, Compressor and Encoder form a capability triple, each a narrow
//! trait with one concrete implementation, composed here rather than through
//! inheritance — see spec.md §9's polymorphism note.

pub mod compressor;
pub mod encoder;
pub mod packer;

pub use compressor::{Compressor, NullCompressor, ZlibCompressor};
pub use encoder::{Base64Encoder, Encoder};
pub use packer::{JsonPacker, Packer};

use crate::error::DriverError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Bundles one concrete instance of each pipeline stage.
pub struct Pickler {
    packer: JsonPacker,
    compressor: Box<dyn Compressor + Send + Sync>,
    encoder: Base64Encoder,
}

impl Pickler {
    pub fn new(compression: bool) -> Self {
        let compressor: Box<dyn Compressor + Send + Sync> = if compression {
            Box::new(ZlibCompressor)
        } else {
            Box::new(NullCompressor)
        };
        Pickler {
            packer: JsonPacker,
            compressor,
            encoder: Base64Encoder,
        }
    }

    /// `pickle(data) = base64(zlib_compress(json_serialize(data)))`.
    pub fn pickle<T: Serialize>(&self, data: &T) -> Result<Vec<u8>, DriverError> {
        let packed = self.packer.pack(data)?;
        let compressed = self.compressor.compress(&packed)?;
        Ok(self.encoder.encode(&compressed))
    }

    /// Inverts `pickle`.
    pub fn unpickle<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DriverError> {
        let decoded = self.encoder.decode(bytes)?;
        let decompressed = self.compressor.decompress(&decoded)?;
        self.packer.unpack(&decompressed)
    }
}
