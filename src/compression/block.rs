use serde::{Serialize, Deserialize};

use crate::core::error::{Error, ErrorKind, Result};

/// Compressed block storage for general purpose data (document index
/// records, not posting integers).
#[derive(Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: BlockCompression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockCompression {
    None,
    LZ4,      // Fast compression, ratio 2-3x
    Zstd,     // Better ratio, slower
    Snappy,   // Balanced
}

impl CompressedBlock {
    /// Compress raw byte data (for text, binary)
    pub fn compress(data: &[u8], compression: BlockCompression) -> Result<Self> {
        let compressed = match compression {
            BlockCompression::None => data.to_vec(),

            BlockCompression::LZ4 => {
                lz4::block::compress(data, None, false)?
            }

            BlockCompression::Zstd => {
                zstd::encode_all(data, 3)?  // Level 3 is balanced
            }

            BlockCompression::Snappy => {
                use snap::raw::Encoder;
                let mut encoder = Encoder::new();
                encoder.compress_vec(data)
                    .map_err(|e| Error::new(ErrorKind::Io, e.to_string()))?
            }
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        match self.compression {
            BlockCompression::None => Ok(self.data.clone()),

            BlockCompression::LZ4 => {
                lz4::block::decompress(&self.data, Some(self.original_size as i32))
                    .map_err(|e| Error::new(ErrorKind::Io, e.to_string()))
            }

            BlockCompression::Zstd => {
                zstd::decode_all(&self.data[..])
                    .map_err(|e| Error::new(ErrorKind::Io, e.to_string()))
            }

            BlockCompression::Snappy => {
                use snap::raw::Decoder;
                let mut decoder = Decoder::new();
                decoder.decompress_vec(&self.data)
                    .map_err(|e| Error::new(ErrorKind::Io, e.to_string()))
            }
        }
    }
}
