//! Reader and writer for FAISS flat-index files (`faiss.write_index`).
//!
//! Layout, all little-endian:
//! [fourcc "IxF2"][d: i32][ntotal: i64][dummy: i64][dummy: i64]
//! [is_trained: u8][metric_type: i32][metric_arg: f32 if metric_type > 1]
//! [count: u64][count x f32 codes, row-major]
//!
//! Only the stored vectors are used. Search always goes through
//! [`FlatIndex`], which reports Euclidean distance, so the squared L2
//! distances FAISS itself would return never reach the similarity formula.

use crate::error::{RecommendError, Result};
use crate::flat_index::FlatIndex;
use crate::index::Index;
use crate::vector::Vector;
use std::io::{Cursor, Read};

/// Fourcc of an `IndexFlatL2`.
pub const FLAT_L2_MAGIC: &[u8; 4] = b"IxF2";
/// Fourcc of a generic `IndexFlat`; the metric comes from the header.
pub const FLAT_MAGIC: &[u8; 4] = b"IxFl";

const METRIC_L2: i32 = 1;
const HEADER_DUMMY: i64 = 1 << 20;

/// Whether `bytes` start with a FAISS flat-index fourcc this reader handles.
pub fn is_faiss_flat(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && (&bytes[0..4] == FLAT_L2_MAGIC || &bytes[0..4] == FLAT_MAGIC)
}

/// Decode a FAISS `IndexFlatL2` (or L2 `IndexFlat`) into a [`FlatIndex`].
pub fn decode(bytes: &[u8]) -> Result<FlatIndex> {
    let mut cursor = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    read(&mut cursor, &mut magic)?;
    if &magic != FLAT_L2_MAGIC && &magic != FLAT_MAGIC {
        return Err(corrupt(format!(
            "Unsupported FAISS index type {:?}",
            String::from_utf8_lossy(&magic)
        )));
    }

    let dimension = read_i32(&mut cursor)?;
    let ntotal = read_i64(&mut cursor)?;
    read_i64(&mut cursor)?;
    read_i64(&mut cursor)?;
    let mut is_trained = [0u8; 1];
    read(&mut cursor, &mut is_trained)?;
    let metric_type = read_i32(&mut cursor)?;
    if metric_type > 1 {
        read(&mut cursor, &mut [0u8; 4])?;
    }

    if metric_type != METRIC_L2 {
        return Err(corrupt(format!(
            "FAISS index uses metric {}, only L2 is supported",
            metric_type
        )));
    }
    if dimension <= 0 || ntotal < 0 {
        return Err(corrupt(format!(
            "Invalid FAISS header: d={}, ntotal={}",
            dimension, ntotal
        )));
    }
    let dimension = dimension as usize;
    let ntotal = ntotal as usize;

    let count = read_u64(&mut cursor)? as usize;
    let expected = dimension
        .checked_mul(ntotal)
        .ok_or_else(|| corrupt("FAISS header overflows".to_string()))?;
    if count != expected {
        return Err(corrupt(format!(
            "FAISS code count {} does not match d={} x ntotal={}",
            count, dimension, ntotal
        )));
    }

    let remaining = bytes.len() - cursor.position() as usize;
    if remaining != count * 4 {
        return Err(corrupt(format!(
            "FAISS codes hold {} bytes, expected {}",
            remaining,
            count * 4
        )));
    }

    let mut vectors = Vec::with_capacity(ntotal);
    let mut buf = [0u8; 4];
    for _ in 0..ntotal {
        let mut data = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            read(&mut cursor, &mut buf)?;
            data.push(f32::from_le_bytes(buf));
        }
        vectors.push(Vector::new(data));
    }

    FlatIndex::from_vectors(dimension, vectors).map_err(|e| corrupt(e.to_string()))
}

/// Encode an index the way `faiss.write_index` writes an `IndexFlatL2`.
pub fn encode(index: &FlatIndex) -> Vec<u8> {
    let count = index.len() * index.dimension();
    let mut bytes = Vec::with_capacity(45 + count * 4);
    bytes.extend_from_slice(FLAT_L2_MAGIC);
    bytes.extend_from_slice(&(index.dimension() as i32).to_le_bytes());
    bytes.extend_from_slice(&(index.len() as i64).to_le_bytes());
    bytes.extend_from_slice(&HEADER_DUMMY.to_le_bytes());
    bytes.extend_from_slice(&HEADER_DUMMY.to_le_bytes());
    bytes.push(1);
    bytes.extend_from_slice(&METRIC_L2.to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for (_, vector) in index.iter() {
        for x in vector.as_slice() {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
    }
    bytes
}

fn corrupt(message: String) -> RecommendError {
    RecommendError::CorruptIndex(message)
}

fn read(cursor: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    cursor
        .read_exact(buf)
        .map_err(|_| corrupt("Truncated FAISS index".to_string()))
}

fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32> {
    let mut buf = [0u8; 4];
    read(cursor, &mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i64(cursor: &mut Cursor<&[u8]>) -> Result<i64> {
    let mut buf = [0u8; 8];
    read(cursor, &mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    let mut buf = [0u8; 8];
    read(cursor, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
