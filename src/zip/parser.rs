//! Central directory parser.
//!
//! Archives are read from the tail: the End of Central Directory record (and
//! its ZIP64 counterpart when present) locates the central directory, which
//! lists every member with its sizes, CRC and local header offset. Member
//! data is only touched when a caller extracts it.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::error::ZipError;
use crate::io::ReadAt;

use super::structures::*;

type Result<T> = std::result::Result<T, ZipError>;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field id.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Parses zip structures from any [`ReadAt`] source.
///
/// Usually driven through [`ZipExtractor`](super::ZipExtractor).
pub struct ZipParser<R: ReadAt> {
    reader: Arc<R>,
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Locate the End of Central Directory record.
    ///
    /// Tries the comment-less position first, then scans backwards through
    /// the largest possible comment window.
    ///
    /// Returns the record and its offset in the archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(ZipError::InvalidFormat("file too small to be a zip archive"));
        }

        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;
        if buf.starts_with(EndOfCentralDirectory::SIGNATURE) {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            if eocd.comment_len == 0 {
                return Ok((eocd, offset));
            }
        }

        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
            // Only accept a candidate whose comment runs exactly to EOF.
            if usize::from(eocd.comment_len) == buf.len() - i - EndOfCentralDirectory::SIZE {
                return Ok((eocd, search_start + i as u64));
            }
        }

        Err(ZipError::InvalidFormat("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory through its locator, which
    /// sits immediately before the regular EOCD.
    ///
    /// Returns `None` when there is no locator. Saturated EOCD fields alone
    /// are not trusted: a plain archive may hold exactly 65535 members.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Option<Zip64EOCD>> {
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
            return Ok(None);
        };
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;
        if !locator_buf.starts_with(Zip64EOCDLocator::SIGNATURE) {
            return Ok(None);
        }
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .await?;
        Zip64EOCD::from_bytes(&eocd64_buf).map(Some)
    }

    /// Read every central directory record in the archive.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries) = match self.read_zip64_eocd(eocd_offset).await? {
            Some(eocd64) => (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries),
            None => (
                u64::from(eocd.cd_offset),
                u64::from(eocd.cd_size),
                u64::from(eocd.total_entries),
            ),
        };

        if cd_offset.saturating_add(cd_size) > self.size {
            return Err(ZipError::InvalidFormat("central directory out of range"));
        }

        // One read for the whole directory.
        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data).await?;

        // Each record is at least CDFH_MIN_SIZE bytes; don't trust the count
        // for the allocation.
        let capacity = (total_entries as usize).min(cd_data.len() / CDFH_MIN_SIZE);
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());
        for _ in 0..total_entries {
            entries.push(Self::parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse one Central Directory File Header, leaving the cursor at the
    /// start of the next record.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(ZipError::InvalidFormat("central directory file header"));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = u64::from(cursor.read_u32::<LittleEndian>()?);
        let mut uncompressed_size = u64::from(cursor.read_u32::<LittleEndian>()?);
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = u64::from(cursor.read_u32::<LittleEndian>()?);

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();
        let is_directory = file_name.ends_with('/');

        let extra_field_end = cursor.position() + u64::from(extra_field_length);
        while cursor.position() + 4 <= extra_field_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = u64::from(cursor.read_u16::<LittleEndian>()?);
            let field_end = cursor.position() + field_size;

            if header_id == ZIP64_EXTRA_ID {
                // Only the header fields saturated at 0xFFFFFFFF are present,
                // in this fixed order.
                if uncompressed_size == 0xFFFF_FFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFF_FFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFF_FFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }
            cursor.set_position(field_end);
        }

        cursor.set_position(extra_field_end + u64::from(file_comment_length));

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            is_directory,
        })
    }

    /// Offset of the member's data, past its Local File Header.
    ///
    /// The local header's name and extra lengths can differ from the central
    /// directory's, so they are read from the local header itself.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader.read_exact_at(entry.lfh_offset, &mut lfh_buf).await?;
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ZipError::InvalidFormat("local file header"));
        }

        let file_name_length = u64::from(u16::from_le_bytes([lfh_buf[26], lfh_buf[27]]));
        let extra_field_length = u64::from(u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]));

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;

    struct MemoryReader(Vec<u8>);

    #[async_trait]
    impl ReadAt for MemoryReader {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
            let start = (offset as usize).min(self.0.len());
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    /// Build a plain (non-ZIP64) archive of empty STORED members.
    fn empty_members_archive(count: usize, comment: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut directory = Vec::new();
        for i in 0..count {
            let name = format!("{i}.bin");
            let lfh_offset = data.len() as u32;

            data.extend_from_slice(LFH_SIGNATURE);
            data.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
            data.extend_from_slice(&[0u8; 12]); // crc, sizes
            data.extend_from_slice(&(name.len() as u16).to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(name.as_bytes());

            directory.extend_from_slice(CDFH_SIGNATURE);
            directory.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
            directory.extend_from_slice(&[0u8; 12]); // crc, sizes
            directory.extend_from_slice(&(name.len() as u16).to_le_bytes());
            directory.extend_from_slice(&[0u8; 12]); // extra, comment, disk, attrs
            directory.extend_from_slice(&lfh_offset.to_le_bytes());
            directory.extend_from_slice(name.as_bytes());
        }

        let cd_offset = data.len() as u32;
        let cd_size = directory.len() as u32;
        data.extend_from_slice(&directory);
        data.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&(count as u16).to_le_bytes());
        data.extend_from_slice(&(count as u16).to_le_bytes());
        data.extend_from_slice(&cd_size.to_le_bytes());
        data.extend_from_slice(&cd_offset.to_le_bytes());
        data.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);
        data
    }

    #[tokio::test]
    async fn test_full_u16_member_count_without_zip64() {
        let archive = empty_members_archive(usize::from(u16::MAX), b"");
        let parser = ZipParser::new(Arc::new(MemoryReader(archive)));

        let entries = parser.list_files().await.unwrap();
        assert_eq!(entries.len(), usize::from(u16::MAX));
        assert_eq!(entries[0].file_name, "0.bin");
        assert_eq!(entries[65534].file_name, "65534.bin");
    }

    #[tokio::test]
    async fn test_eocd_behind_comment() {
        let archive = empty_members_archive(2, b"packaged by a test");
        let parser = ZipParser::new(Arc::new(MemoryReader(archive)));

        let (eocd, _) = parser.find_eocd().await.unwrap();
        assert_eq!(eocd.comment_len, 18);
        let entries = parser.list_files().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(parser.get_data_offset(&entries[1]).await.unwrap(), 30 + 5 + 30 + 5);
    }

    #[tokio::test]
    async fn test_truncated_archive_is_invalid() {
        let parser = ZipParser::new(Arc::new(MemoryReader(b"PK\x05\x06".to_vec())));
        assert!(matches!(
            parser.list_files().await,
            Err(ZipError::InvalidFormat(_))
        ));
    }
}
