use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::ZipError;

type Result<T> = std::result::Result<T, ZipError>;

/// Member compression as recorded in the central directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

/// Validate a record's signature and length, returning a cursor positioned
/// just past the signature.
fn record<'a>(
    data: &'a [u8],
    signature: &[u8],
    min_len: usize,
    what: &'static str,
) -> Result<Cursor<&'a [u8]>> {
    if data.len() < min_len || !data.starts_with(signature) {
        return Err(ZipError::InvalidFormat(what));
    }
    Ok(Cursor::new(&data[signature.len()..]))
}

/// End of central directory record. Multi-disk fields are skipped: split
/// archives are not supported.
///
/// Saturated fields are not interpreted here; whether the archive is ZIP64
/// is decided by the presence of a locator.
pub struct EndOfCentralDirectory {
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut r = record(data, Self::SIGNATURE, Self::SIZE, "end of central directory")?;
        // disk numbers, entries on this disk
        r.set_position(6);
        Ok(Self {
            total_entries: r.read_u16::<LittleEndian>()?,
            cd_size: r.read_u32::<LittleEndian>()?,
            cd_offset: r.read_u32::<LittleEndian>()?,
            comment_len: r.read_u16::<LittleEndian>()?,
        })
    }
}

/// ZIP64 end of central directory locator; only the record offset matters.
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut r = record(
            data,
            Self::SIGNATURE,
            Self::SIZE,
            "zip64 end of central directory locator",
        )?;
        r.set_position(4);
        Ok(Self {
            eocd64_offset: r.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 end of central directory record.
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut r = record(
            data,
            Self::SIGNATURE,
            Self::MIN_SIZE,
            "zip64 end of central directory",
        )?;
        // record size, versions, disk numbers, per-disk entry count
        r.set_position(28);
        Ok(Self {
            total_entries: r.read_u64::<LittleEndian>()?,
            cd_size: r.read_u64::<LittleEndian>()?,
            cd_offset: r.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// A member of the archive, as described by its central directory record.
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eocd_bytes(total_entries: u16, cd_size: u32, cd_offset: u32) -> Vec<u8> {
        let mut buf = EndOfCentralDirectory::SIGNATURE.to_vec();
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&total_entries.to_le_bytes());
        buf.extend_from_slice(&total_entries.to_le_bytes());
        buf.extend_from_slice(&cd_size.to_le_bytes());
        buf.extend_from_slice(&cd_offset.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf
    }

    #[test]
    fn test_eocd_parse() {
        let eocd = EndOfCentralDirectory::from_bytes(&eocd_bytes(3, 120, 4096)).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.cd_size, 120);
        assert_eq!(eocd.cd_offset, 4096);
        assert_eq!(eocd.comment_len, 0);
    }

    #[test]
    fn test_eocd_keeps_saturated_fields() {
        let eocd =
            EndOfCentralDirectory::from_bytes(&eocd_bytes(0xFFFF, 120, 0xFFFF_FFFF)).unwrap();
        assert_eq!(eocd.total_entries, u16::MAX);
        assert_eq!(eocd.cd_offset, u32::MAX);
    }

    #[test]
    fn test_eocd_rejects_bad_signature() {
        let mut bytes = eocd_bytes(1, 0, 0);
        bytes[0] = b'X';
        assert!(matches!(
            EndOfCentralDirectory::from_bytes(&bytes),
            Err(ZipError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_zip64_eocd_parse() {
        let mut bytes = Zip64EOCD::SIGNATURE.to_vec();
        bytes.extend_from_slice(&44u64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        bytes.extend_from_slice(&70_000u64.to_le_bytes());
        bytes.extend_from_slice(&70_000u64.to_le_bytes());
        bytes.extend_from_slice(&(1u64 << 33).to_le_bytes());
        bytes.extend_from_slice(&(5u64 << 32).to_le_bytes());
        assert_eq!(bytes.len(), Zip64EOCD::MIN_SIZE);

        let eocd64 = Zip64EOCD::from_bytes(&bytes).unwrap();
        assert_eq!(eocd64.total_entries, 70_000);
        assert_eq!(eocd64.cd_size, 1 << 33);
        assert_eq!(eocd64.cd_offset, 5 << 32);
    }

    #[test]
    fn test_compression_method_codes() {
        assert_eq!(CompressionMethod::from_u16(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8), CompressionMethod::Deflate);
        assert_eq!(
            CompressionMethod::from_u16(14),
            CompressionMethod::Unknown(14)
        );
    }
}
