//! External collaborator contracts.
//!
//! # Responsibility
//! - Define the persistence gateway the core writes through.
//! - Define the hub suggestion service the layout engine consumes.
//! - Provide a SQLite-backed gateway over the `db` bootstrap layer.
//!
//! # Invariants
//! - Gateway failures never roll back in-memory state; callers log them.
//! - Writes referencing unknown ids are ignored, not reported as errors.

use crate::db::DbError;
use crate::model::entry::{Entry, EntryId, EntryPatch};
use crate::model::geometry::Point;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod hub;
pub mod sqlite;

/// Result type used by persistence gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Persistence gateway failure.
#[derive(Debug)]
pub enum GatewayError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted data cannot be converted into a valid entry.
    InvalidData(String),
    /// Remote or local backend refused the call.
    Unavailable(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
            Self::Unavailable(message) => write!(f, "persistence unavailable: {message}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for GatewayError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Position write for batched layout commits and debounced drag saves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: EntryId,
    pub position: Point,
}

/// Durable storage for workspace entries.
pub trait PersistenceGateway {
    /// Persists a newly created (or restored) entry.
    fn create(&self, entry: &Entry) -> GatewayResult<()>;
    /// Applies a partial change. Unknown ids are a no-op.
    fn update(&self, id: EntryId, patch: &EntryPatch) -> GatewayResult<()>;
    /// Removes one entry. Unknown ids are a no-op.
    fn delete(&self, id: EntryId) -> GatewayResult<()>;
    /// Loads every entry of the workspace in creation order.
    fn list_all(&self) -> GatewayResult<Vec<Entry>>;
    /// Writes many positions in one call.
    fn batch_update_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()>;
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for &G {
    fn create(&self, entry: &Entry) -> GatewayResult<()> {
        (**self).create(entry)
    }

    fn update(&self, id: EntryId, patch: &EntryPatch) -> GatewayResult<()> {
        (**self).update(id, patch)
    }

    fn delete(&self, id: EntryId) -> GatewayResult<()> {
        (**self).delete(id)
    }

    fn list_all(&self) -> GatewayResult<Vec<Entry>> {
        (**self).list_all()
    }

    fn batch_update_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()> {
        (**self).batch_update_positions(updates)
    }
}
