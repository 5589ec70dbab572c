//! Scoped, read-only access to one scene layer package.
//!
//! Every [`ArchiveHandle`] owns its own file handle and central directory
//! index, so handles for the same package never share state. Dropping the
//! handle closes the file.

use flate2::read::MultiGzDecoder;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::{EntryError, OpenError, ZipError};
use crate::io::LocalFileReader;
use crate::resource::{Delivery, GZIP_SUFFIX};
use crate::zip::{ZipExtractor, ZipFileEntry};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Opens packages for reading.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveReader;

impl ArchiveReader {
    /// Open the package at `path` and index its members.
    pub async fn open(path: &Path) -> Result<ArchiveHandle, OpenError> {
        let reader = LocalFileReader::new(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                OpenError::Missing {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                OpenError::Unreadable {
                    path: path.to_path_buf(),
                    source: ZipError::Io(source),
                }
            }
        })?;

        let extractor = ZipExtractor::new(Arc::new(reader));
        let entries = extractor
            .list_files()
            .await
            .map_err(|source| OpenError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let entries = entries
            .into_iter()
            .filter(|e| !e.is_directory)
            .map(|e| (e.file_name.clone(), e))
            .collect();

        Ok(ArchiveHandle {
            extractor,
            entries,
        })
    }
}

/// An open package.
pub struct ArchiveHandle {
    extractor: ZipExtractor<LocalFileReader>,
    entries: HashMap<String, ZipFileEntry>,
}

impl ArchiveHandle {
    /// Number of file members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains_key(&*normalize_entry_path(entry))
    }

    /// Read a member, gunzipping it when its name ends in `.gz`.
    ///
    /// Members without the suffix are returned exactly as stored.
    pub async fn read_entry(&self, entry: &str) -> Result<Vec<u8>, EntryError> {
        let name = normalize_entry_path(entry);
        let raw = self.read_member(&name).await?;
        if !name.ends_with(GZIP_SUFFIX) {
            return Ok(raw);
        }

        let mut decoded = Vec::with_capacity(raw.len().saturating_mul(4));
        MultiGzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|source| EntryError::Gzip {
                entry: name.clone().into_owned(),
                source,
            })?;
        Ok(decoded)
    }

    /// Read a member exactly as stored in the container.
    pub async fn read_raw_entry(&self, entry: &str) -> Result<Vec<u8>, EntryError> {
        let name = normalize_entry_path(entry);
        self.read_member(&name).await
    }

    /// Read a member according to its delivery mode.
    ///
    /// Pre-compressed members go out with a gzip content encoding, so they
    /// must at least carry a gzip header.
    pub async fn read(&self, entry: &str, delivery: Delivery) -> Result<Vec<u8>, EntryError> {
        match delivery {
            Delivery::Decoded => self.read_entry(entry).await,
            Delivery::PreCompressed => {
                let raw = self.read_raw_entry(entry).await?;
                if !raw.starts_with(&GZIP_MAGIC) {
                    return Err(EntryError::Gzip {
                        entry: normalize_entry_path(entry).into_owned(),
                        source: io::Error::new(ErrorKind::InvalidData, "missing gzip header"),
                    });
                }
                Ok(raw)
            }
        }
    }

    async fn read_member(&self, name: &str) -> Result<Vec<u8>, EntryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| EntryError::NotFound(name.to_string()))?;

        self.extractor
            .extract_to_memory(entry)
            .await
            .map_err(|source| EntryError::Corrupt {
                entry: name.to_string(),
                source,
            })
    }
}

/// Map a requested member path onto the container's naming convention:
/// backslashes become forward slashes and one leading separator is dropped.
pub fn normalize_entry_path(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        let replaced = path.replace('\\', "/");
        match replaced.strip_prefix('/') {
            Some(stripped) => Cow::Owned(stripped.to_string()),
            None => Cow::Owned(replaced),
        }
    } else {
        Cow::Borrowed(path.strip_prefix('/').unwrap_or(path))
    }
}
