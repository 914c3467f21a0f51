//! # arbor-partition-memory
//!
//! Map-backed implementation of the arbor partition boundary, plus an
//! in-memory changelog sink. Entries are stored in an ordered map keyed
//! by reversed normalized DN so subtree and one-level scans are range
//! walks.
//!
//! This crate exists so the pipeline contract can be exercised
//! end-to-end: by the integration tests under `tests/` and by embedders
//! that want a directory core without a storage engine. It is not a
//! production store.

pub mod changelog;
pub mod filter;
pub mod partition;

pub use changelog::MemoryChangelog;
pub use partition::MemoryPartition;
