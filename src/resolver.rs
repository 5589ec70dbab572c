//! Resource resolution against cataloged packages.
//!
//! Per request: validate the archive against the catalog, open it, then walk
//! the resource's candidate chain in order. A missing member moves on to the
//! next candidate; a corrupt one ends the request. When the chain runs out
//! the resource either reports not found or resolves to no content,
//! depending on its kind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::ArchiveReader;
use crate::catalog::{ArchiveCatalog, DEFAULT_COLLECTION};
use crate::error::{EntryError, OpenError, ResolveError};
use crate::resource::{ContentType, Delivery, Exhausted, Resource};

/// Bytes resolved for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub content_type: ContentType,
    /// The bytes are still gzip and must be declared as such on the wire.
    pub pre_compressed: bool,
    /// Member the bytes came from.
    pub entry: String,
}

/// Terminal state of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Content(Payload),
    /// Every candidate was absent and the resource kind tolerates that.
    NoContent,
}

impl Resolution {
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Self::Content(payload) => Some(payload),
            Self::NoContent => None,
        }
    }
}

/// Resolves resources inside cataloged archives.
#[derive(Debug, Clone)]
pub struct SceneResolver {
    catalog: Arc<ArchiveCatalog>,
}

impl SceneResolver {
    pub fn new(catalog: Arc<ArchiveCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<ArchiveCatalog> {
        &self.catalog
    }

    /// Look an archive up in the current catalog without touching the disk.
    pub fn locate_archive(
        &self,
        collection: Option<&str>,
        archive: &str,
    ) -> Result<PathBuf, ResolveError> {
        let collection = collection.unwrap_or(DEFAULT_COLLECTION);
        self.catalog
            .locate(collection, archive)
            .ok_or_else(|| ResolveError::ArchiveNotFound {
                collection: collection.to_string(),
                archive: archive.to_string(),
            })
    }

    /// Resolve `resource` inside `archive` and read its bytes.
    ///
    /// `collection` defaults to [`DEFAULT_COLLECTION`]. The archive is opened,
    /// read and decoded on the blocking pool, so large members never hold up
    /// other requests on the same worker.
    pub async fn resolve_and_read(
        &self,
        collection: Option<&str>,
        archive: &str,
        resource: &Resource,
    ) -> Result<Resolution, ResolveError> {
        let path = self.locate_archive(collection, archive)?;

        let collection = collection.unwrap_or(DEFAULT_COLLECTION).to_string();
        let archive = archive.to_string();
        let resource = resource.clone();
        let runtime = tokio::runtime::Handle::current();
        let span = tracing::Span::current();

        let task = {
            let archive = archive.clone();
            tokio::task::spawn_blocking(move || {
                span.in_scope(|| {
                    runtime.block_on(read_resource(&path, &collection, &archive, &resource))
                })
            })
        };

        task.await.map_err(|e| ResolveError::Decode {
            archive,
            entry: None,
            source: Box::new(e),
        })?
    }
}

/// Open the archive at `path` and walk the resource's candidate chain.
async fn read_resource(
    path: &Path,
    collection: &str,
    archive: &str,
    resource: &Resource,
) -> Result<Resolution, ResolveError> {
    let handle = ArchiveReader::open(path).await.map_err(|e| match e {
        OpenError::Missing { .. } => {
            tracing::warn!(archive, path = %path.display(), "cataloged archive is gone from disk");
            ResolveError::ArchiveNotFound {
                collection: collection.to_string(),
                archive: archive.to_string(),
            }
        }
        OpenError::Unreadable { source, .. } => {
            tracing::error!(archive, error = %source, "archive cannot be opened");
            ResolveError::Decode {
                archive: archive.to_string(),
                entry: None,
                source: Box::new(source),
            }
        }
    })?;

    let chain = resource.candidates();
    let mut last_missing = None;

    for candidate in chain.candidates {
        match handle.read(&candidate.path, candidate.delivery).await {
            Ok(bytes) => {
                tracing::debug!(
                    archive,
                    kind = %resource.kind(),
                    entry = %candidate.path,
                    len = bytes.len(),
                    "resolved"
                );
                return Ok(Resolution::Content(Payload {
                    bytes,
                    content_type: candidate.content_type,
                    pre_compressed: candidate.delivery == Delivery::PreCompressed,
                    entry: candidate.path,
                }));
            }
            Err(EntryError::NotFound(entry)) => {
                tracing::debug!(archive, entry = %entry, "candidate missing");
                last_missing = Some(entry);
            }
            Err(e @ (EntryError::Corrupt { .. } | EntryError::Gzip { .. })) => {
                tracing::error!(archive, entry = %candidate.path, error = %e, "corrupt member");
                return Err(ResolveError::Decode {
                    archive: archive.to_string(),
                    entry: Some(candidate.path),
                    source: Box::new(e),
                });
            }
        }
    }

    match chain.on_exhausted {
        Exhausted::NoContent => {
            tracing::debug!(archive, kind = %resource.kind(), "no content");
            Ok(Resolution::NoContent)
        }
        Exhausted::NotFound => Err(ResolveError::EntryNotFound {
            archive: archive.to_string(),
            entry: last_missing.unwrap_or_default(),
        }),
    }
}
