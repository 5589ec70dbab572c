//! # slpk-server
//!
//! Serves the contents of Scene Layer Packages (`.slpk`) as I3S
//! `SceneServer` resources.
//!
//! A package is a read-only zip whose members are mostly individually
//! gzipped JSON and binary blobs. A request names an archive (optionally
//! inside a collection) and a resource such as a node's geometry or texture;
//! the resolver maps the resource onto an ordered list of member paths, reads
//! the first one present and decodes it.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use slpk_server::{ArchiveCatalog, Layout, Resolution, Resource, SceneResolver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = Arc::new(ArchiveCatalog::new("./slpk", Layout::Flat));
//!     catalog.refresh()?;
//!
//!     let resolver = SceneResolver::new(catalog);
//!     let layer = resolver
//!         .resolve_and_read(None, "city.slpk", &Resource::LayerInfo)
//!         .await?;
//!     if let Resolution::Content(payload) = layer {
//!         println!("{}", String::from_utf8_lossy(&payload.bytes));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod error;
pub mod http;
pub mod io;
pub mod resolver;
pub mod resource;
pub mod zip;

pub use archive::{ArchiveHandle, ArchiveReader, normalize_entry_path};
pub use catalog::{ArchiveCatalog, CatalogSnapshot, DEFAULT_COLLECTION, Layout, Refresh};
pub use cli::Cli;
pub use error::{CatalogError, EntryError, OpenError, ResolveError, ZipError};
pub use http::AppState;
pub use io::{LocalFileReader, ReadAt};
pub use resolver::{Payload, Resolution, SceneResolver};
pub use resource::{Candidate, CandidateChain, ContentType, Delivery, Resource, ResourceKind};
pub use crate::zip::{ZipExtractor, ZipFileEntry};
