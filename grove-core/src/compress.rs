//! Blob compression
//!
//! Blob payloads are stored zstd-compressed; the codec is injected so the
//! repository never depends on a concrete format.

use std::io::{self, Read};
use zstd::stream::{decode_all as zstd_decode, encode_all as zstd_encode};

/// Default zstd compression level
pub const DEFAULT_LEVEL: i32 = 3;

/// Compression codec for blob payloads
pub trait Codec {
    /// Compress a stream until EOF
    fn compress(&self, source: &mut dyn Read) -> io::Result<Vec<u8>>;

    /// Compress an in-memory buffer
    fn compress_bytes(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        self.compress(&mut &data[..])
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// zstd codec
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl Codec for ZstdCodec {
    fn compress(&self, source: &mut dyn Read) -> io::Result<Vec<u8>> {
        zstd_encode(source, self.level)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        zstd_decode(data)
    }
}
