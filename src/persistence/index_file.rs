//! Index file: save/load a flat index to/from disk.
//!
//! Layout: [magic: 4 bytes][version: u32][crc32: u32][payload: bincode(IndexPayload)]
//! A `<file>.manifest.json` sidecar records the vector count and dimension.
//!
//! Loading also accepts FAISS flat L2 files, detected by their fourcc.

use crate::error::{Result, RecommendError};
use crate::flat_index::FlatIndex;
use crate::index::Index;
use crate::persistence::faiss;
use crate::persistence::serialization::{self, IndexManifest, IndexPayload};
use crate::vector::Vector;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MAGIC: &[u8; 4] = b"PRIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 12;

/// On-disk layout an index was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Native,
    FaissFlatL2,
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexFormat::Native => write!(f, "native v{}", FORMAT_VERSION),
            IndexFormat::FaissFlatL2 => write!(f, "FAISS IndexFlatL2"),
        }
    }
}

/// Path of the manifest sidecar for an index file.
pub fn manifest_path(index_path: &Path) -> PathBuf {
    let mut name = index_path.as_os_str().to_os_string();
    name.push(".manifest.json");
    PathBuf::from(name)
}

/// Encode an index into the on-disk byte layout.
pub fn encode(index: &FlatIndex) -> Result<Vec<u8>> {
    let payload = IndexPayload {
        dimension: index.dimension(),
        vectors: index.iter().map(|(_, v)| v.as_slice().to_vec()).collect(),
    };
    let body = serialization::to_bincode(&payload)?;
    let crc = crc32fast::hash(&body);

    let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode and verify an index in either supported layout.
pub fn decode(bytes: &[u8]) -> Result<FlatIndex> {
    decode_with_format(bytes).map(|(index, _)| index)
}

fn decode_with_format(bytes: &[u8]) -> Result<(FlatIndex, IndexFormat)> {
    if faiss::is_faiss_flat(bytes) {
        return Ok((faiss::decode(bytes)?, IndexFormat::FaissFlatL2));
    }
    Ok((decode_native(bytes)?, IndexFormat::Native))
}

fn decode_native(bytes: &[u8]) -> Result<FlatIndex> {
    if bytes.len() < HEADER_SIZE {
        return Err(RecommendError::CorruptIndex(
            "File too small for header".to_string(),
        ));
    }
    if &bytes[0..4] != MAGIC {
        return Err(RecommendError::CorruptIndex("Bad magic bytes".to_string()));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(RecommendError::CorruptIndex(format!(
            "Unsupported format version {}",
            version
        )));
    }

    let expected_crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let body = &bytes[HEADER_SIZE..];
    let actual_crc = crc32fast::hash(body);
    if actual_crc != expected_crc {
        return Err(RecommendError::CorruptIndex(format!(
            "CRC mismatch: expected {:08x}, got {:08x}",
            expected_crc, actual_crc
        )));
    }

    let payload: IndexPayload = serialization::from_bincode(body)
        .map_err(|e| RecommendError::CorruptIndex(e.to_string()))?;
    let vectors = payload.vectors.into_iter().map(Vector::new).collect();
    FlatIndex::from_vectors(payload.dimension, vectors)
        .map_err(|e| RecommendError::CorruptIndex(e.to_string()))
}

/// Write an index file and its manifest.
pub fn save(path: impl AsRef<Path>, index: &FlatIndex) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, encode(index)?)?;

    let manifest = IndexManifest {
        vector_count: index.len(),
        dimension: index.dimension(),
        format_version: FORMAT_VERSION,
    };
    fs::write(manifest_path(path), serialization::to_json(&manifest)?)?;
    Ok(())
}

/// Load and verify an index file.
pub fn load(path: impl AsRef<Path>) -> Result<FlatIndex> {
    load_with_format(path).map(|(index, _)| index)
}

/// Load an index file and report which layout it was stored in.
pub fn load_with_format(path: impl AsRef<Path>) -> Result<(FlatIndex, IndexFormat)> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let (index, format) = decode_with_format(&bytes)?;
    info!(
        path = %path.display(),
        %format,
        vectors = index.len(),
        dimension = index.dimension(),
        "index loaded"
    );
    Ok((index, format))
}

/// Read the manifest sidecar, or None if there is none.
pub fn read_manifest(index_path: impl AsRef<Path>) -> Result<Option<IndexManifest>> {
    let path = manifest_path(index_path.as_ref());
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    Ok(Some(serialization::from_json(&bytes)?))
}
