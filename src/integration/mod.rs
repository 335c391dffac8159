//! Collaborator traits for the host platform
//!
//! The lifecycle engine consumes two external services: a channel host
//! (messaging infrastructure) and a roster (identity and permissions).
//! Both are injected as trait objects so tests can supply in-memory
//! implementations.
//!
//! `Roster` is deliberately synchronous: claim and unclaim guards are
//! evaluated inside the store's critical section, which must not contain
//! a suspension point between the read and the write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::{ChannelId, RoleId, UserId};
use crate::error::Result;

/// One message in a channel's history, oldest-first when fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Author identity
    pub author: UserId,
    /// Author display name at send time
    pub author_name: String,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
    /// Text content, possibly empty
    pub content: String,
    /// Attachment URLs
    pub attachments: Vec<String>,
    /// Number of embeds carried by the message
    pub embed_count: usize,
}

/// A file handed to the notification collaborator alongside a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Suggested file name
    pub filename: String,
    /// File body
    pub body: String,
}

/// Content to deliver to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message text
    pub content: String,
    /// Optional file attachment
    pub attachment: Option<Attachment>,
}

impl Notification {
    /// A plain-text notification
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment: None,
        }
    }

    /// Attach a file to this notification
    #[must_use]
    pub fn with_attachment(mut self, filename: impl Into<String>, body: impl Into<String>) -> Self {
        self.attachment = Some(Attachment {
            filename: filename.into(),
            body: body.into(),
        });
        self
    }
}

/// Parameters for creating a ticket channel
#[derive(Debug, Clone)]
pub struct ChannelRequest {
    /// Channel name
    pub name: String,
    /// Parent category, if any
    pub category: Option<u64>,
    /// Roles granted access at creation
    pub allow_roles: Vec<RoleId>,
    /// The ticket owner, always granted access
    pub owner: UserId,
}

/// Messaging infrastructure consumed by the engine
///
/// All operations are real I/O against the host platform and may suspend.
#[async_trait]
pub trait ChannelHost: Send + Sync {
    /// Creates a channel and returns its platform-assigned id
    async fn create_channel(&self, request: ChannelRequest) -> Result<ChannelId>;

    /// Deletes a channel
    async fn delete_channel(&self, channel: ChannelId) -> Result<()>;

    /// Renames a channel
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<()>;

    /// Grants a user access to a channel
    async fn grant_access(&self, channel: ChannelId, user: UserId) -> Result<()>;

    /// Fetches the full ordered message history of a channel, oldest first
    async fn fetch_history(&self, channel: ChannelId) -> Result<Vec<Message>>;

    /// Delivers a notification to a channel
    async fn send_notification(&self, channel: ChannelId, notification: Notification)
        -> Result<()>;
}

/// Identity and permission resolution consumed by the engine
///
/// Lookups are synchronous by contract: the host platform caches
/// membership, and guard evaluation must not suspend.
#[cfg_attr(test, mockall::automock)]
pub trait Roster: Send + Sync {
    /// Whether the user holds the given role
    fn has_role(&self, user: UserId, role: RoleId) -> bool;

    /// Whether the user is privileged (administrative override)
    fn is_privileged(&self, user: UserId) -> bool;

    /// Display name for transcripts and log lines, if resolvable
    fn display_name(&self, user: UserId) -> Option<String>;
}

/// Resolves a display name, falling back to the raw id
pub(crate) fn name_or_id(roster: &dyn Roster, user: UserId) -> String {
    roster
        .display_name(user)
        .unwrap_or_else(|| user.to_string())
}
