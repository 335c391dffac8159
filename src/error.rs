//! Error types for ticket-desk
//!
//! Every guard failure maps to its own variant so the requesting actor
//! always receives the specific rejection kind, never a generic failure.

use thiserror::Error;

use crate::core::{ChannelId, Domain};

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, DeskError>;

/// All errors that can occur in ticket-desk
#[derive(Error, Debug)]
pub enum DeskError {
    /// The user already holds an open ticket in this domain
    #[error("you already have an open {domain} ticket")]
    DuplicateOwner {
        /// Domain in which the open ticket exists
        domain: Domain,
    },

    /// The ticket is already claimed by another staff member
    #[error("this ticket is already claimed")]
    AlreadyClaimed,

    /// The ticket owner tried to claim their own ticket
    #[error("you cannot claim your own ticket")]
    SelfClaim,

    /// The actor does not hold the role required for this ticket subtype
    #[error("you do not hold the role required to claim this ticket")]
    InsufficientRole,

    /// Unclaim was requested on a ticket that is not claimed
    #[error("this ticket is not claimed")]
    NotClaimed,

    /// Unclaim was requested by someone other than the claimer
    #[error("only the staff member who claimed this ticket can do that")]
    NotClaimer,

    /// The channel is not bound to a live ticket
    #[error("no ticket found for channel {channel}")]
    TicketNotFound {
        /// Channel that was looked up
        channel: ChannelId,
    },

    /// The user is blacklisted from opening trade tickets
    #[error("you are blacklisted from the trade service")]
    Blacklisted,

    /// A channel id collided with an existing ticket across domains
    ///
    /// Channel ids come from the platform and are assumed unique; hitting
    /// this means the collaborator handed out a duplicate.
    #[error("channel {channel} is already bound to a ticket")]
    ChannelCollision {
        /// The colliding channel id
        channel: ChannelId,
    },

    /// Transcript archival failed (history fetch or notification dispatch)
    #[error("transcript archival failed: {reason}")]
    Archival {
        /// Human-readable failure description
        reason: String,
    },

    /// IO error from the persistence layer or the platform
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization or deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading error
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Custom error for collaborator glue
    #[error("{0}")]
    Custom(String),
}

impl DeskError {
    /// Creates a custom error with the given message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Creates an archival error with the given reason
    pub fn archival(reason: impl Into<String>) -> Self {
        Self::Archival {
            reason: reason.into(),
        }
    }

    /// Returns a user-friendly message suitable for an acknowledgment reply
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Returns suggestions the actor can act on to self-correct
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::DuplicateOwner { .. } => {
                vec!["Close your existing ticket before opening a new one".to_string()]
            },
            Self::AlreadyClaimed => {
                vec!["Wait for the current claimer to unclaim or transfer".to_string()]
            },
            Self::NotClaimer => {
                vec!["Ask the claimer or a privileged staff member to do this".to_string()]
            },
            Self::TicketNotFound { .. } => {
                vec!["The ticket may have just been closed; re-check the channel".to_string()]
            },
            _ => Vec::new(),
        }
    }

    /// Whether the operation can be retried by the same actor later
    ///
    /// Guard rejections tied to transient state (claims, missing tickets)
    /// are recoverable; identity-based rejections are not.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AlreadyClaimed | Self::NotClaimed | Self::DuplicateOwner { .. } | Self::Io(_)
        )
    }

    /// Whether this is a persistence-layer failure
    #[must_use]
    pub const fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serialization(_))
    }
}
