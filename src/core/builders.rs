use super::{ChannelId, DomainData, Status, Ticket, UserId};
use chrono::{DateTime, Utc};

/// Builder for creating Ticket instances
///
/// Channel, owner, and payload are fixed up front; everything else has a
/// sensible default. Used by the storage layer when rehydrating records
/// and by tests that need tickets in a specific state.
pub struct TicketBuilder {
    channel: ChannelId,
    owner: UserId,
    data: DomainData,
    claimed_by: Option<UserId>,
    status: Status,
    created_at: Option<DateTime<Utc>>,
}

impl TicketBuilder {
    /// Create a new ticket builder for the given channel, owner, and payload
    #[must_use]
    pub const fn new(channel: ChannelId, owner: UserId, data: DomainData) -> Self {
        Self {
            channel,
            owner,
            data,
            claimed_by: None,
            status: Status::Open,
            created_at: None,
        }
    }

    /// Set the claimer
    #[must_use]
    pub const fn claimed_by(mut self, claimer: UserId) -> Self {
        self.claimed_by = Some(claimer);
        self
    }

    /// Set the status
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the creation timestamp
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Build the ticket
    #[must_use]
    pub fn build(self) -> Ticket {
        Ticket {
            channel: self.channel,
            owner: self.owner,
            claimed_by: self.claimed_by,
            status: self.status,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            data: self.data,
        }
    }
}
