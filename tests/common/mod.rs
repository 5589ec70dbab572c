//! Shared fixtures: scene layer packages written to temporary directories.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Gzip `data` the way packaging tools store `.gz` members.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Write a zip at `path` with STORED members.
pub fn write_archive(path: &Path, members: &[(&str, Vec<u8>)]) {
    write_archive_with(path, members, CompressionMethod::Stored);
}

pub fn write_archive_with(path: &Path, members: &[(&str, Vec<u8>)], method: CompressionMethod) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, data) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// The `city.slpk` package used across tests.
///
/// Node 0 has a `.jpg` default texture, node 1 only a `.bin` one and node 2
/// no texture at all. Node 5 has no shared resource.
pub fn city_members() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("3dSceneLayer.json.gz", gzip(br#"{"id":0}"#)),
        ("nodepages/0.json.gz", gzip(br#"{"nodes":[{"index":0}]}"#)),
        (
            "nodes/0/3dNodeIndexDocument.json.gz",
            gzip(br#"{"id":"0","level":1}"#),
        ),
        ("nodes/0/geometries/0.bin.gz", gzip(b"\x01\x02\x03geometry")),
        ("nodes/0/textures/0_0.jpg", b"\xff\xd8\xffJPEG-node-0".to_vec()),
        ("nodes/0/textures/0_0.bin", b"BIN-node-0".to_vec()),
        ("nodes/0/textures/0_0_1.bin.dds.gz", gzip(b"DDS texture")),
        ("nodes/0/features/0.json.gz", gzip(br#"{"featureData":[]}"#)),
        (
            "nodes/0/shared/sharedResource.json.gz",
            gzip(br#"{"materialDefinitions":{}}"#),
        ),
        ("nodes/0/attributes/f_0/0.bin.gz", gzip(b"attribute-bytes")),
        ("nodes/1/textures/0_0.bin", b"BIN-node-1".to_vec()),
        ("nodes/1/textures/1_0.bin", b"BIN-node-1-slot-1".to_vec()),
    ]
}

/// Flip the first byte of `needle` inside the file at `path`.
pub fn corrupt_bytes(path: &Path, needle: &[u8]) {
    let mut data = fs::read(path).unwrap();
    let at = data
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present in archive");
    data[at] ^= 0xFF;
    fs::write(path, data).unwrap();
}
