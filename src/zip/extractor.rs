use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::error::ZipError;
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on buffer preallocation from header-declared sizes.
const MAX_PREALLOCATION: usize = 64 << 20;

/// Reads member data out of a zip container
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all members in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>, ZipError> {
        self.parser.list_files().await
    }

    /// Extract a member's uncompressed bytes into memory.
    ///
    /// STORED and DEFLATE members are supported. The result is checked
    /// against the central directory CRC.
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>, ZipError> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        let end = data_offset.saturating_add(entry.compressed_size);
        if end > self.parser.reader().size() {
            return Err(ZipError::InvalidFormat("member data out of range"));
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let capacity = (entry.uncompressed_size as usize).min(MAX_PREALLOCATION);
                let mut out = Vec::with_capacity(capacity);
                DeflateDecoder::new(raw.as_slice())
                    .read_to_end(&mut out)
                    .map_err(ZipError::Inflate)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(ZipError::UnsupportedCompression(method));
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(ZipError::CrcMismatch {
                expected: entry.crc32,
                actual: crc.sum(),
            });
        }

        Ok(data)
    }
}
