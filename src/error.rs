//! Error types for archive access and resource resolution.
//!
//! Low-level container failures ([`ZipError`]) and member reads
//! ([`EntryError`]) are folded into [`ResolveError`] at the resolver boundary,
//! which is the only error kind the request layer ever sees for a resource.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while parsing or extracting from a zip container.
#[derive(Debug, Error)]
pub enum ZipError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid zip structure: {0}")]
    InvalidFormat(&'static str),

    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),

    #[error("failed to inflate member: {0}")]
    Inflate(#[source] std::io::Error),

    #[error("CRC mismatch: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        /// CRC recorded in the central directory
        expected: u32,
        /// CRC of the extracted bytes
        actual: u32,
    },
}

/// Failures while reading a single member from an open archive.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("no member at {0}")]
    NotFound(String),

    #[error("member {entry} is corrupt: {source}")]
    Corrupt {
        entry: String,
        #[source]
        source: ZipError,
    },

    #[error("member {entry} declares gzip but failed to decompress: {source}")]
    Gzip {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while opening an archive container.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("archive file not found: {}", .path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive {} is unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

/// Outcome taxonomy surfaced to the request layer.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Archive is absent from the catalog, or vanished from disk since the
    /// last refresh.
    #[error("archive not found: {collection}/{archive}")]
    ArchiveNotFound { collection: String, archive: String },

    /// The archive has no member for a resource without a fallback.
    #[error("entry {entry} not found in {archive}")]
    EntryNotFound { archive: String, entry: String },

    /// The archive or one of its members is corrupt.
    #[error("failed to decode {archive}{}: {source}", .entry.as_deref().map(|e| format!(" ({e})")).unwrap_or_default())]
    Decode {
        archive: String,
        entry: Option<String>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ResolveError {
    /// Whether the request layer should report this as "not found".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ArchiveNotFound { .. } | Self::EntryNotFound { .. })
    }
}

/// Catalog scan errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_messages() {
        let err = ResolveError::ArchiveNotFound {
            collection: "default".to_string(),
            archive: "city.slpk".to_string(),
        };
        assert_eq!(err.to_string(), "archive not found: default/city.slpk");
        assert!(err.is_not_found());

        let err = ResolveError::Decode {
            archive: "city.slpk".to_string(),
            entry: Some("3dSceneLayer.json.gz".to_string()),
            source: Box::new(ZipError::InvalidFormat("bad header")),
        };
        assert_eq!(
            err.to_string(),
            "failed to decode city.slpk (3dSceneLayer.json.gz): invalid zip structure: bad header"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_zip_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        let err: ZipError = io.into();
        assert!(matches!(err, ZipError::Io(_)));
    }
}
