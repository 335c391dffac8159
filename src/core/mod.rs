//! Core domain types for ticket-desk
//!
//! A ticket is a unit of work bound 1:1 to a communication channel and
//! tracked through open/claimed/closed states. Three domains share the
//! lifecycle shape but differ in claim eligibility and close-time data.

mod builders;
mod vouch;

pub use builders::TicketBuilder;
pub use vouch::{VouchEntry, VouchLedger, VouchRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of the communication channel backing a ticket
///
/// Channel ids form a shared namespace across all domains. They serialize
/// as strings because the snapshot format keys records by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for ChannelId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse().map(Self)
    }
}

/// Identity of a user, as resolved by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse().map(Self)
    }
}

/// Identity of a platform role consumed through the roster collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoleId(pub u64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three parallel ticket domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Brokered trades, tiered by declared size
    Trade,
    /// General support requests
    Support,
    /// The specialized index service queue
    IndexService,
}

impl Domain {
    /// Lowercase label used in channel names and log lines
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Support => "support",
            Self::IndexService => "index",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade size tier, which selects the role required to claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeTier {
    /// Small combined value
    Small,
    /// Large combined value
    Big,
    /// Top-tier combined value
    Massive,
}

impl TradeTier {
    /// Human-readable tier label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "Small Trade",
            Self::Big => "Big Trade",
            Self::Massive => "Massive Trade",
        }
    }
}

/// Support issue category selected at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportCategory {
    GeneralQuestion,
    ScamReport,
    Appeal,
    StaffReport,
    TradeIssue,
    Other,
}

impl SupportCategory {
    /// Human-readable category label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::GeneralQuestion => "General Question",
            Self::ScamReport => "Report a Scammer",
            Self::Appeal => "Appeal / Unban",
            Self::StaffReport => "Staff Report",
            Self::TradeIssue => "Trade Issue",
            Self::Other => "Other",
        }
    }
}

/// Index service variant selected at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexVariant {
    Rainbow,
    Candy,
    Radioactive,
    Yinyang,
    Galaxy,
    Gold,
    Diamond,
}

impl IndexVariant {
    /// Human-readable variant label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rainbow => "Rainbow",
            Self::Candy => "Candy",
            Self::Radioactive => "Radioactive",
            Self::Yinyang => "Yinyang",
            Self::Galaxy => "Galaxy",
            Self::Gold => "Gold",
            Self::Diamond => "Diamond",
        }
    }
}

/// Domain-specific ticket payload, fixed at creation
///
/// A closed set of variants rather than an open bag of optional fields;
/// the variant also determines the ticket's domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainData {
    /// Trade brokering intake
    Trade {
        /// Size tier, selects the required claim role
        tier: TradeTier,
        /// Who the owner is trading with
        partner: String,
        /// Free-form trade description
        details: String,
        /// Declared trade value as entered by the owner
        declared_value: String,
        /// Whether both parties can join links
        can_join_links: String,
        /// Platform usernames when links are unavailable
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform_users: Option<String>,
    },
    /// General support intake
    Support {
        /// Issue category
        category: SupportCategory,
        /// Issue description
        description: String,
        /// Who is being reported, if applicable
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reporting: Option<String>,
        /// Evidence links, if provided
        #[serde(default, skip_serializing_if = "Option::is_none")]
        evidence: Option<String>,
    },
    /// Index service intake
    Index {
        /// Requested service variant
        variant: IndexVariant,
        /// Owner's platform username
        platform_user: String,
        /// Extra request details
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl DomainData {
    /// The domain this payload belongs to
    #[must_use]
    pub const fn domain(&self) -> Domain {
        match self {
            Self::Trade { .. } => Domain::Trade,
            Self::Support { .. } => Domain::Support,
            Self::Index { .. } => Domain::IndexService,
        }
    }

    /// Human-readable subtype label (tier, category, or variant)
    #[must_use]
    pub const fn subtype_label(&self) -> &'static str {
        match self {
            Self::Trade { tier, .. } => tier.label(),
            Self::Support { category, .. } => category.label(),
            Self::Index { variant, .. } => variant.label(),
        }
    }
}

/// Ticket lifecycle status
///
/// `Closed` is terminal and causes record deletion, so in practice only
/// `Open` records persist; the field is retained defensively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Live ticket, claimable
    #[default]
    Open,
    /// Terminal; the record is removed right after this is set
    Closed,
}

/// One live ticket, keyed by its backing channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Backing channel; primary key within the domain
    pub channel: ChannelId,
    /// User who opened the ticket; immutable
    pub owner: UserId,
    /// Staff member currently responsible, if any
    pub claimed_by: Option<UserId>,
    /// Lifecycle status
    pub status: Status,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Domain-specific payload; immutable
    pub data: DomainData,
}

impl Ticket {
    /// Creates a new open, unclaimed ticket
    #[must_use]
    pub fn new(channel: ChannelId, owner: UserId, data: DomainData) -> Self {
        Self {
            channel,
            owner,
            claimed_by: None,
            status: Status::Open,
            created_at: Utc::now(),
            data,
        }
    }

    /// The domain this ticket belongs to
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.data.domain()
    }

    /// Whether the ticket currently has a claimer
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}
