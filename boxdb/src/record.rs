//! Record-level types exchanged between the host and the engine.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::point::{Point, Region};

/// Opaque record payload.
pub type Value = Vec<u8>;

/// Key used to disambiguate delete targets sharing a point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub Vec<u8>);

impl Identity {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Identity {
    fn from(bytes: Vec<u8>) -> Self {
        Identity(bytes)
    }
}

impl From<&[u8]> for Identity {
    fn from(bytes: &[u8]) -> Self {
        Identity(bytes.to_vec())
    }
}

/// Engine-issued reference to one stored record.
///
/// `node` is where the record lived when the location was issued, `seq` is the
/// record's engine-assigned sequence number. Callers treat both as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub node: u64,
    pub seq: u64,
}

impl Location {
    pub fn new(node: u64, seq: u64) -> Location {
        Location { node, seq }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node, self.seq)
    }
}

/// One query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub point: Point,
    pub value: Value,
    pub location: Location,
}

/// Diagnostic record of one engine node visited while answering a query.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub node_id: u64,
    pub file_path: String,
    pub bbox: Region,
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {} at {} {}", self.node_id, self.file_path, self.bbox)
    }
}
