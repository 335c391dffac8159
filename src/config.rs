//! Configuration for ticket-desk
//!
//! Role ids, channel wiring, and lifecycle timing are deployment-specific
//! and come from an optional `ticket-desk.toml` plus `TICKET_DESK_*`
//! environment overrides. Every field has a default so the engine can run
//! (e.g. in tests) without any external configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::{ChannelId, Domain, DomainData, RoleId, TradeTier};
use crate::error::Result;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Role wiring for claim eligibility
    pub roles: RoleConfig,
    /// Channel wiring for categories, logs, and transcripts
    pub channels: ChannelConfig,
    /// Lifecycle timing knobs
    pub timing: TimingConfig,
    /// Path of the JSON snapshot file
    pub snapshot_path: PathBuf,
}

/// Roles required to claim tickets, per domain and subtype
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Role required to claim small-tier trade tickets
    pub small_trade_claim: RoleId,
    /// Role required to claim big-tier trade tickets
    pub big_trade_claim: RoleId,
    /// Role required to claim massive-tier trade tickets
    pub massive_trade_claim: RoleId,
    /// Roles counting as staff; any one of them may claim support tickets
    pub staff: Vec<RoleId>,
    /// The single elevated role required to claim index tickets
    pub index_claim: RoleId,
}

impl RoleConfig {
    /// The claim role required for a given trade tier
    #[must_use]
    pub const fn trade_claim_role(&self, tier: TradeTier) -> RoleId {
        match tier {
            TradeTier::Small => self.small_trade_claim,
            TradeTier::Big => self.big_trade_claim,
            TradeTier::Massive => self.massive_trade_claim,
        }
    }
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            small_trade_claim: RoleId(1),
            big_trade_claim: RoleId(2),
            massive_trade_claim: RoleId(3),
            staff: vec![RoleId(1), RoleId(2), RoleId(3), RoleId(4)],
            index_claim: RoleId(5),
        }
    }
}

/// Channel wiring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Category for small-tier trade channels
    pub trade_category: Option<u64>,
    /// Category for big-tier trade channels
    pub big_trade_category: Option<u64>,
    /// Category for massive-tier trade channels
    pub massive_trade_category: Option<u64>,
    /// Category for support channels
    pub support_category: Option<u64>,
    /// Category for index channels
    pub index_category: Option<u64>,
    /// Per-domain log channels
    pub trade_log: ChannelId,
    /// Support log channel
    pub support_log: ChannelId,
    /// Index log channel
    pub index_log: ChannelId,
    /// Channel receiving rendered transcripts
    pub transcript: ChannelId,
    /// Operator channel for surfaced failures
    pub operator: ChannelId,
}

impl ChannelConfig {
    /// Category a new ticket channel should be created under
    #[must_use]
    pub const fn category_for(&self, data: &DomainData) -> Option<u64> {
        match data {
            DomainData::Trade { tier, .. } => match tier {
                TradeTier::Small => self.trade_category,
                TradeTier::Big => self.big_trade_category,
                TradeTier::Massive => self.massive_trade_category,
            },
            DomainData::Support { .. } => self.support_category,
            DomainData::Index { .. } => self.index_category,
        }
    }

    /// Log channel for a domain
    #[must_use]
    pub const fn log_for(&self, domain: Domain) -> ChannelId {
        match domain {
            Domain::Trade => self.trade_log,
            Domain::Support => self.support_log,
            Domain::IndexService => self.index_log,
        }
    }
}

/// Lifecycle timing knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Grace delay between record removal and channel teardown, in seconds
    pub close_grace_secs: u64,
    /// How long an index close waits for its confirmation, in seconds
    pub confirm_window_secs: u64,
}

impl TimingConfig {
    /// Grace delay as a [`Duration`]
    #[must_use]
    pub const fn close_grace(&self) -> Duration {
        Duration::from_secs(self.close_grace_secs)
    }

    /// Confirmation window as a [`Duration`]
    #[must_use]
    pub const fn confirm_window(&self) -> Duration {
        Duration::from_secs(self.confirm_window_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            close_grace_secs: 5,
            confirm_window_secs: 30,
        }
    }
}

impl DeskConfig {
    /// Loads configuration from `ticket-desk.toml` and the environment
    ///
    /// The file is optional; environment variables use the `TICKET_DESK`
    /// prefix with `__` as the section separator, e.g.
    /// `TICKET_DESK_TIMING__CLOSE_GRACE_SECS=10`.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("ticket-desk").required(false))
            .add_source(
                config::Environment::with_prefix("TICKET_DESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Loads configuration, falling back to defaults on any error
    #[must_use]
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to load configuration, using defaults: {e}");
                Self::default()
            },
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            roles: RoleConfig::default(),
            channels: ChannelConfig::default(),
            timing: TimingConfig::default(),
            snapshot_path: PathBuf::from("ticket-desk.json"),
        }
    }
}
