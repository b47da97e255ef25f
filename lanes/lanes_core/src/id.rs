//! Strongly-typed identifiers.
//!
//! Each identifier type is a thin wrapper around a UUID with a phantom type
//! parameter, so a task id can never be passed where a worker id is expected.

use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Id<T> {
    uuid: Uuid,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            _marker: PhantomData,
        }
    }
}

// Manual impls: the marker types need not be `Copy`
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

/// Marker type for scheduled tasks.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TaskMarker;
/// Identifier for a scheduled task.
pub type TaskId = Id<TaskMarker>;

/// Marker type for workers.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct WorkerMarker;
/// Identifier for a worker.
pub type WorkerId = Id<WorkerMarker>;
