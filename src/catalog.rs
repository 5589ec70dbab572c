//! Catalog of available scene layer packages.
//!
//! The catalog publishes an immutable [`CatalogSnapshot`] behind an `Arc`.
//! A refresh builds a complete new snapshot off to the side and swaps it in
//! with a single pointer store, so readers see either the old or the new
//! catalog and never a half-scanned one.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CatalogError;

/// Collection used when archives are not grouped, or when a request names
/// no collection.
pub const DEFAULT_COLLECTION: &str = "default";

/// Archive file extension, matched case-insensitively.
pub const ARCHIVE_EXTENSION: &str = "slpk";

/// Subdirectory holding a collection's archives in the collections layout.
const COLLECTION_ARCHIVE_DIR: &str = "slpk";

/// How archives are arranged under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Layout {
    /// `<root>/<collection>/slpk/*.slpk`
    Collections,
    /// `<root>/*.slpk`, all in the default collection
    Flat,
}

/// Immutable view of the archives known at one point in time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    collections: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl CatalogSnapshot {
    pub fn exists(&self, collection: &str, archive: &str) -> bool {
        self.locate(collection, archive).is_some()
    }

    /// File path of an archive, if cataloged.
    pub fn locate(&self, collection: &str, archive: &str) -> Option<&Path> {
        self.collections
            .get(collection)?
            .get(archive)
            .map(PathBuf::as_path)
    }

    /// All `(collection, archive)` pairs, sorted by collection then name.
    pub fn list(&self) -> Vec<(String, String)> {
        self.collections
            .iter()
            .flat_map(|(collection, archives)| {
                archives
                    .keys()
                    .map(move |archive| (collection.clone(), archive.clone()))
            })
            .collect()
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Total number of archives across collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A collection whose directory could not be scanned during a refresh.
#[derive(Debug)]
pub struct CollectionFailure {
    pub collection: String,
    pub error: CatalogError,
}

/// Result of a completed refresh.
#[derive(Debug)]
pub struct Refresh {
    /// The snapshot that was published.
    pub snapshot: Arc<CatalogSnapshot>,
    /// Collections left out of the snapshot because their scan failed.
    pub failed: Vec<CollectionFailure>,
}

/// Process-wide catalog of archives under one storage root.
#[derive(Debug)]
pub struct ArchiveCatalog {
    root: PathBuf,
    layout: Layout,
    current: RwLock<Arc<CatalogSnapshot>>,
    // Serializes directory scans; readers never take it.
    scan: Mutex<()>,
}

impl ArchiveCatalog {
    /// Create an empty catalog. Call [`refresh`](Self::refresh) to populate it.
    pub fn new(root: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            root: root.into(),
            layout,
            current: RwLock::new(Arc::new(CatalogSnapshot::default())),
            scan: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn exists(&self, collection: &str, archive: &str) -> bool {
        self.current.read().exists(collection, archive)
    }

    pub fn locate(&self, collection: &str, archive: &str) -> Option<PathBuf> {
        self.current
            .read()
            .locate(collection, archive)
            .map(Path::to_path_buf)
    }

    pub fn list(&self) -> Vec<(String, String)> {
        self.snapshot().list()
    }

    /// Rescan the storage root and publish a new snapshot.
    ///
    /// A missing root or collection directory counts as empty. In the
    /// collections layout, a collection that fails to scan for any other
    /// reason is reported in [`Refresh::failed`] and left out of the new
    /// snapshot; the remaining collections are still published.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Scan` when the root itself cannot be listed,
    /// in either layout. The previous snapshot stays published in that case.
    pub fn refresh(&self) -> Result<Refresh, CatalogError> {
        let _scan = self.scan.lock();

        let mut collections = BTreeMap::new();
        let mut failed = Vec::new();

        match self.layout {
            // The root is the only collection here, so its failure is fatal.
            Layout::Flat => {
                collections.insert(DEFAULT_COLLECTION.to_string(), scan_archives(&self.root)?);
            }
            Layout::Collections => {
                for collection in list_collections(&self.root)? {
                    let dir = self.root.join(&collection).join(COLLECTION_ARCHIVE_DIR);
                    match scan_archives(&dir) {
                        Ok(archives) => {
                            collections.insert(collection, archives);
                        }
                        Err(error) => failed.push(CollectionFailure { collection, error }),
                    }
                }
            }
        }

        for failure in &failed {
            tracing::warn!(
                collection = %failure.collection,
                error = %failure.error,
                "collection dropped from catalog"
            );
        }

        let snapshot = Arc::new(CatalogSnapshot { collections });
        *self.current.write() = Arc::clone(&snapshot);

        tracing::info!(
            root = %self.root.display(),
            archives = snapshot.len(),
            failed = failed.len(),
            "catalog refreshed"
        );

        Ok(Refresh { snapshot, failed })
    }
}

/// Names of the collection directories directly under `root`.
fn list_collections(root: &Path) -> Result<Vec<String>, CatalogError> {
    let scan_error = |source: io::Error| CatalogError::Scan {
        path: root.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(scan_error(e)),
    };

    let mut collections = Vec::new();
    for entry in entries {
        let path = entry.map_err(scan_error)?.path();
        if !path.is_dir() {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => collections.push(name.to_string()),
            None => tracing::warn!(path = %path.display(), "skipping non UTF-8 collection name"),
        }
    }
    Ok(collections)
}

/// Archive files directly inside `dir`, keyed by file name.
fn scan_archives(dir: &Path) -> Result<BTreeMap<String, PathBuf>, CatalogError> {
    let scan_error = |source: io::Error| CatalogError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(scan_error(e)),
    };

    let mut archives = BTreeMap::new();
    for entry in entries {
        let path = entry.map_err(scan_error)?.path();
        if !path.is_file() || !has_archive_extension(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            archives.insert(name.to_string(), path.clone());
        }
    }
    Ok(archives)
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}
