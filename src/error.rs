//! Error types (§7). Internal recursive DD operations never return `Result` — a cofactor
//! that turns out to reference a stale or out-of-range slot is a bug, not a runtime
//! condition, so it is caught with `debug_assert!` rather than propagated. `Result` is
//! reserved for the boundary operations where failure is an expected, recoverable
//! outcome: initialization, (de)serialization, and the table-full condition GC could not
//! relieve.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The unique table could not satisfy an insert even after a garbage collection
    /// (§4.2, §7). `fill_fraction` is the load factor observed right before giving up.
    #[error("unique table is full ({:.1}% occupied after GC)", .fill_fraction * 100.0)]
    TableFull { fill_fraction: f64 },

    /// An edge carried an index outside the table's current capacity, or a terminal edge
    /// was passed somewhere only a non-terminal edge is valid. Reachable only through
    /// `serialize`'s external input path; everywhere else this is a `debug_assert!`
    /// (§4.8, §7).
    #[error("edge {0:?} does not refer to a valid node")]
    InvalidEdge(crate::edge::Edge),

    /// `init` was called with parameters outside their documented ranges.
    #[error("invalid configuration: {0}")]
    InitError(String),

    /// The serialized edge stream or model file was malformed (§4.8, §6).
    #[error("failed to deserialize: {0}")]
    DeserializeError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
