//! In-memory collaborators and a prewired engine for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

use crate::config::DeskConfig;
use crate::core::{ChannelId, DomainData, RoleId, TradeTier, UserId};
use crate::engine::LifecycleEngine;
use crate::error::{DeskError, Result};
use crate::integration::{ChannelHost, ChannelRequest, Message, Notification, Roster};
use crate::storage::FileStorage;

pub(crate) const OWNER: UserId = UserId(100);
pub(crate) const HELPER: UserId = UserId(200);
pub(crate) const ADMIN: UserId = UserId(300);
pub(crate) const INDEXER: UserId = UserId(400);
pub(crate) const OUTSIDER: UserId = UserId(500);

pub(crate) fn trade_data(tier: TradeTier) -> DomainData {
    DomainData::Trade {
        tier,
        partner: "partner".to_string(),
        details: "items for coins".to_string(),
        declared_value: "800M".to_string(),
        can_join_links: "Yes".to_string(),
        platform_users: None,
    }
}

#[derive(Default)]
struct HostState {
    next_channel: u64,
    live: HashSet<ChannelId>,
    created: u64,
    deleted: Vec<ChannelId>,
    renamed: Vec<(ChannelId, String)>,
    granted: Vec<(ChannelId, UserId)>,
    notifications: Vec<(ChannelId, Notification)>,
    histories: HashMap<ChannelId, Vec<Message>>,
    fail_history: bool,
}

/// Recording in-memory stand-in for the channel host
#[derive(Default)]
pub(crate) struct InMemoryHost {
    state: Mutex<HostState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryHost {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                next_channel: 1_000,
                ..HostState::default()
            }),
        }
    }

    pub(crate) fn push_message(&self, channel: ChannelId, message: Message) {
        lock(&self.state)
            .histories
            .entry(channel)
            .or_default()
            .push(message);
    }

    pub(crate) fn set_fail_history(&self, fail: bool) {
        lock(&self.state).fail_history = fail;
    }

    pub(crate) fn created_count(&self) -> u64 {
        lock(&self.state).created
    }

    pub(crate) fn deleted(&self) -> Vec<ChannelId> {
        lock(&self.state).deleted.clone()
    }

    pub(crate) fn granted(&self) -> Vec<(ChannelId, UserId)> {
        lock(&self.state).granted.clone()
    }

    pub(crate) fn renamed(&self) -> Vec<(ChannelId, String)> {
        lock(&self.state).renamed.clone()
    }

    pub(crate) fn notifications_for(&self, channel: ChannelId) -> Vec<Notification> {
        lock(&self.state)
            .notifications
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelHost for InMemoryHost {
    async fn create_channel(&self, _request: ChannelRequest) -> Result<ChannelId> {
        let mut state = lock(&self.state);
        let channel = ChannelId(state.next_channel);
        state.next_channel += 1;
        state.created += 1;
        state.live.insert(channel);
        Ok(channel)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<()> {
        let mut state = lock(&self.state);
        state.live.remove(&channel);
        state.deleted.push(channel);
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> Result<()> {
        lock(&self.state).renamed.push((channel, name.to_string()));
        Ok(())
    }

    async fn grant_access(&self, channel: ChannelId, user: UserId) -> Result<()> {
        lock(&self.state).granted.push((channel, user));
        Ok(())
    }

    async fn fetch_history(&self, channel: ChannelId) -> Result<Vec<Message>> {
        let state = lock(&self.state);
        if state.fail_history {
            return Err(DeskError::custom("history unavailable"));
        }
        Ok(state.histories.get(&channel).cloned().unwrap_or_default())
    }

    async fn send_notification(
        &self,
        channel: ChannelId,
        notification: Notification,
    ) -> Result<()> {
        lock(&self.state).notifications.push((channel, notification));
        Ok(())
    }
}

/// Fixed role/name wiring for tests
#[derive(Default)]
pub(crate) struct StaticRoster {
    roles: HashMap<UserId, Vec<RoleId>>,
    privileged: HashSet<UserId>,
    names: HashMap<UserId, String>,
}

impl StaticRoster {
    /// OWNER unprivileged, HELPER holds the small-trade role, ADMIN is
    /// privileged, INDEXER holds the index-claim role, OUTSIDER nothing.
    pub(crate) fn default_wiring() -> Self {
        let mut roster = Self::default();
        roster.roles.insert(HELPER, vec![RoleId(1)]);
        roster.roles.insert(INDEXER, vec![RoleId(5)]);
        roster.privileged.insert(ADMIN);
        roster.names.insert(OWNER, "owner".to_string());
        roster.names.insert(HELPER, "helper".to_string());
        roster.names.insert(ADMIN, "admin".to_string());
        roster
    }
}

impl Roster for StaticRoster {
    fn has_role(&self, user: UserId, role: RoleId) -> bool {
        self.roles
            .get(&user)
            .is_some_and(|roles| roles.contains(&role))
    }

    fn is_privileged(&self, user: UserId) -> bool {
        self.privileged.contains(&user)
    }

    fn display_name(&self, user: UserId) -> Option<String> {
        self.names.get(&user).cloned()
    }
}

/// An engine over in-memory collaborators and a tempdir-backed snapshot
pub(crate) struct Harness {
    pub(crate) engine: LifecycleEngine,
    pub(crate) host: Arc<InMemoryHost>,
    pub(crate) dyn_host: Arc<dyn ChannelHost>,
    pub(crate) roster: Arc<dyn Roster>,
    pub(crate) storage: FileStorage,
    _dir: TempDir,
}

pub(crate) fn harness() -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let mut config = DeskConfig::default();
    config.snapshot_path = dir.path().join("desk.json");
    // immediate teardown keeps tests deterministic
    config.timing.close_grace_secs = 0;
    // distinct wiring so notification targets are distinguishable
    config.channels.trade_log = ChannelId(11);
    config.channels.support_log = ChannelId(12);
    config.channels.index_log = ChannelId(13);
    config.channels.transcript = ChannelId(14);
    config.channels.operator = ChannelId(15);

    let host = Arc::new(InMemoryHost::new());
    let dyn_host: Arc<dyn ChannelHost> = Arc::clone(&host) as Arc<dyn ChannelHost>;
    let roster: Arc<dyn Roster> = Arc::new(StaticRoster::default_wiring());
    let storage = FileStorage::new(&config.snapshot_path);

    let engine = LifecycleEngine::new(
        config,
        Arc::new(storage.clone()),
        Arc::clone(&dyn_host),
        Arc::clone(&roster),
    )
    .expect("engine init");

    Harness {
        engine,
        host,
        dyn_host,
        roster,
        storage,
        _dir: dir,
    }
}
