//! ZIP container parsing and member extraction.
//!
//! - [`structures`]: on-disk records (EOCD, ZIP64 EOCD, header constants)
//! - [`parser`]: reads the central directory from a [`ReadAt`](crate::io::ReadAt) source
//! - [`extractor`]: pulls member bytes out, inflating DEFLATE members
//!
//! Scene layer packages are plain zip files whose members are mostly STORED
//! (the payloads are individually gzipped already), but DEFLATE members and
//! ZIP64 archives show up in large exports and are handled too. Encryption
//! and multi-disk archives are not supported.

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
