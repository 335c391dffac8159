//! Persistence layer
//!
//! A single JSON snapshot holds the vouch ledger and the three ticket
//! domains. The file is rewritten wholesale after every mutating
//! operation; loading tolerates a missing or corrupt file and skips
//! malformed individual records so the system stays usable even when
//! historical state is lost.

mod file;
mod repository;

pub use file::FileStorage;
pub use repository::SnapshotRepository;
