//! Batch mutations.
//!
//! A batch is an ordered list of inserts and deletes applied as one unit.
//! Every point in the batch is validated before the engine sees any of it, so
//! a malformed operation rejects the whole batch without side effects.

use crate::errors::{BoxDbError, BoxDbResult, ErrorKind};
use crate::point::Point;
use crate::record::{Identity, Location, Value};

/// What a delete operation points at.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// The original point plus the record's identity
    Identity { point: Point, id: Identity },
    /// A location returned by an earlier query
    Location(Location),
}

/// One mutation within a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Insert { point: Point, value: Value },
    Delete { target: DeleteTarget },
}

impl BatchOperation {
    pub fn insert(point: Point, value: Value) -> BatchOperation {
        BatchOperation::Insert { point, value }
    }

    pub fn delete_by_id(point: Point, id: impl Into<Identity>) -> BatchOperation {
        BatchOperation::Delete {
            target: DeleteTarget::Identity {
                point,
                id: id.into(),
            },
        }
    }

    pub fn delete_at(location: Location) -> BatchOperation {
        BatchOperation::Delete {
            target: DeleteTarget::Location(location),
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, BatchOperation::Insert { .. })
    }

    /// The point this operation carries, if any.
    pub fn point(&self) -> Option<&Point> {
        match self {
            BatchOperation::Insert { point, .. } => Some(point),
            BatchOperation::Delete {
                target: DeleteTarget::Identity { point, .. },
            } => Some(point),
            BatchOperation::Delete {
                target: DeleteTarget::Location(_),
            } => None,
        }
    }
}

/// Options for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Fail the whole batch when a delete target does not exist
    pub error_if_missing: bool,
}

impl BatchOptions {
    pub fn new() -> BatchOptions {
        BatchOptions {
            error_if_missing: true,
        }
    }

    pub fn error_if_missing(mut self, error_if_missing: bool) -> BatchOptions {
        self.error_if_missing = error_if_missing;
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions::new()
    }
}

/// Checks every operation against the instance dimensionality.
pub fn validate_batch(operations: &[BatchOperation], dimensions: usize) -> BoxDbResult<()> {
    for (index, op) in operations.iter().enumerate() {
        if let Some(point) = op.point() {
            point.validate(dimensions).map_err(|e| {
                BoxDbError::new_with_cause(
                    &format!("operation {} of batch rejected: {}", index, e.message()),
                    ErrorKind::MalformedInput,
                    e,
                )
            })?;
        }
    }
    Ok(())
}
