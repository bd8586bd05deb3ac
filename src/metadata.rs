//! Row-addressable place metadata, aligned with the index by row order

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// One reviewed place. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub name: String,
    pub address: String,
    pub review_text: String,
}

/// Read-only table of review records.
///
/// Row order is the authoritative row-to-record mapping: row `i` describes
/// the vector stored at row `i` of the index.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    records: Vec<ReviewRecord>,
}

impl MetadataStore {
    pub fn from_records(records: Vec<ReviewRecord>) -> Self {
        Self { records }
    }

    /// Load a CSV file with a header row containing at least `name`,
    /// `address` and `review_text`. Other columns are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path)?;
        let store = Self::read_records(reader)?;
        debug!(path = %path.display(), rows = store.len(), "metadata loaded");
        Ok(store)
    }

    /// Load CSV rows from any reader.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        Self::read_records(csv::Reader::from_reader(rdr))
    }

    fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let records = reader
            .deserialize::<ReviewRecord>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    /// Get a record by row
    pub fn get(&self, row: usize) -> Option<&ReviewRecord> {
        self.records.get(row)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReviewRecord> {
        self.records.iter()
    }
}
