//! Persistence layer: the serialized index file, its manifest, and the
//! FAISS flat-index reader.

pub mod serialization;
pub mod faiss;
pub mod index_file;
