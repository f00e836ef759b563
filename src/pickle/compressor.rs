//! Compressor: zlib stage of the pickle pipeline, skippable via `compression: false`.

use crate::error::DriverError;
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

pub trait Compressor {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError>;
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError>;
}

/// zlib via `flate2`, the concrete `Compressor` used when `compression: true`.
pub struct ZlibCompressor;

impl Compressor for ZlibCompressor {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError> {
        let mut encoder = ZlibEncoder::new(bytes, Compression::default());
        let mut out = Vec::new();
        encoder
            .read_to_end(&mut out)
            .map_err(|e| DriverError::DeviceNotFound(format!("zlib compress failed: {e}")))?;
        Ok(out)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError> {
        let mut decoder = ZlibDecoder::new(bytes);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| DriverError::DeviceNotFound(format!("zlib decompress failed: {e}")))?;
        Ok(out)
    }
}

/// Pass-through, used when `compression: false` — the envelope shape is
/// otherwise unchanged, only this stage is skipped.
pub struct NullCompressor;

impl Compressor for NullCompressor {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError> {
        Ok(bytes.to_vec())
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, DriverError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_round_trip() {
        let c = ZlibCompressor;
        let data = b"hello hello hello hello hello world".to_vec();
        let compressed = c.compress(&data).unwrap();
        let back = c.decompress(&compressed).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn null_compressor_is_identity() {
        let c = NullCompressor;
        let data = b"raw bytes".to_vec();
        assert_eq!(c.compress(&data).unwrap(), data);
        assert_eq!(c.decompress(&data).unwrap(), data);
    }
}
