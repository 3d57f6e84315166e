use serde::{Serialize, Deserialize};

use crate::compression::gamma::{BitReader, BitWriter};
use crate::core::error::{Error, Result};

/// Integer codec for one posting stream. Gamma and Unary are defined for
/// values >= 1; callers shift zero-capable streams up by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntCodec {
    VByte,
    Gamma,
    Unary,
}

impl IntCodec {
    pub fn encode(&self, writer: &mut BitWriter, value: u32) {
        match self {
            IntCodec::VByte => writer.write_vbyte(value),
            IntCodec::Gamma => writer.write_gamma(value),
            IntCodec::Unary => writer.write_unary(value),
        }
    }

    pub fn decode(&self, reader: &mut BitReader) -> Result<u32> {
        match self {
            IntCodec::VByte => reader.read_vbyte(),
            IntCodec::Gamma => reader.read_gamma(),
            IntCodec::Unary => reader.read_unary(),
        }
    }
}

/// Codec selection for the four posting streams, fixed for a whole index
/// generation and persisted in the descriptor so readers decode correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub doc_ids: IntCodec,
    pub term_freqs: IntCodec,
    pub field_freqs: IntCodec,
    pub positions: IntCodec,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig {
            doc_ids: IntCodec::VByte,
            term_freqs: IntCodec::VByte,
            field_freqs: IntCodec::VByte,
            positions: IntCodec::VByte,
        }
    }
}

impl CompressionConfig {
    /// Resolve a named configuration. The set of names is closed; an
    /// unknown name is a configuration error, not a lookup failure.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "vbyte" => Ok(CompressionConfig::default()),
            "gamma" => Ok(CompressionConfig {
                doc_ids: IntCodec::Gamma,
                term_freqs: IntCodec::Unary,
                field_freqs: IntCodec::Unary,
                positions: IntCodec::Gamma,
            }),
            other => Err(Error::config(format!(
                "unknown compression configuration '{}'", other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_configurations() {
        assert!(CompressionConfig::from_name("vbyte").is_ok());
        let gamma = CompressionConfig::from_name("gamma").unwrap();
        assert_eq!(gamma.doc_ids, IntCodec::Gamma);
        assert_eq!(gamma.term_freqs, IntCodec::Unary);
        assert!(CompressionConfig::from_name("snappy-deluxe").is_err());
    }

    #[test]
    fn codecs_are_lossless() {
        for codec in [IntCodec::VByte, IntCodec::Gamma, IntCodec::Unary] {
            let values = [1u32, 2, 7, 19, 63];
            let mut writer = BitWriter::new();
            for &v in &values {
                codec.encode(&mut writer, v);
            }
            let bytes = writer.into_bytes();
            let mut reader = BitReader::new(&bytes);
            for &v in &values {
                assert_eq!(codec.decode(&mut reader).unwrap(), v);
            }
        }
    }
}
