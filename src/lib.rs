//! ticket-desk - a ticket lifecycle engine with crash-safe persistence
//!
//! This crate implements the state machine behind a staffed ticket desk:
//! - Three parallel domains (trade, support, index service) sharing one
//!   open/claimed/closed lifecycle
//! - Role-gated claim, unclaim, and transfer with compare-and-set
//!   semantics under a single lock
//! - Close with transcript archival and deferred channel teardown
//! - Whole-file JSON snapshots written atomically after every mutation

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
// Allow some pedantic lints that don't improve code quality
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]

//! # Concurrency
//!
//! Guard evaluation and state mutation happen inside one synchronous
//! critical section; no lock is ever held across an await point. The
//! collaborator traits split along that line: [`integration::Roster`] is
//! synchronous so it can be consulted under the lock, while
//! [`integration::ChannelHost`] is async and only ever called outside it.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticket_desk::config::DeskConfig;
//! use ticket_desk::engine::{LifecycleEngine, OpenRequest};
//! use ticket_desk::storage::FileStorage;
//!
//! let config = DeskConfig::load_or_default();
//! let storage = Arc::new(FileStorage::new(&config.snapshot_path));
//! let engine = LifecycleEngine::new(config, storage, host, roster)?;
//!
//! let channel = engine.open(OpenRequest { owner, owner_name, data }).await?;
//! engine.claim(channel, staff_member).await?;
//! ```

pub mod commands;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod integration;
pub mod storage;
pub mod store;
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use error::{DeskError, Result};
