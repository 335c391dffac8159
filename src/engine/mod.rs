//! Ticket lifecycle state machine
//!
//! [`LifecycleEngine`] owns the in-memory store, the vouch ledger, and the
//! blacklist, and drives every state transition: open, claim, unclaim,
//! transfer, and close. Guards are evaluated and applied inside a single
//! critical section with no suspension point, then the full state is
//! persisted before the caller observes success.
//!
//! A persistence failure is logged and flagged but never rolls back the
//! in-memory mutation: the live system keeps serving with memory ahead of
//! disk rather than refusing work.

use chrono::Utc;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::DeskConfig;
use crate::core::{
    ChannelId, Domain, DomainData, RoleId, Ticket, UserId, VouchEntry, VouchLedger, VouchRecord,
};
use crate::error::{DeskError, Result};
use crate::integration::{name_or_id, ChannelHost, ChannelRequest, Notification, Roster};
use crate::storage::SnapshotRepository;
use crate::store::TicketStore;
use crate::transcript::TranscriptArchiver;

/// Intake parameters for opening a ticket
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// The requesting user
    pub owner: UserId,
    /// Display name used for the channel name and log lines
    pub owner_name: String,
    /// Domain-specific intake payload
    pub data: DomainData,
}

/// Outcome of an index-service close attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCloseOutcome {
    /// Confirmation arrived; the ticket was closed
    Closed,
    /// The confirmation explicitly declined; nothing changed
    Declined,
    /// The confirmation window elapsed; nothing changed
    TimedOut,
}

/// The lifecycle state machine and its collaborators
pub struct LifecycleEngine {
    store: Mutex<TicketStore>,
    vouches: Mutex<VouchLedger>,
    blacklist: Mutex<HashSet<UserId>>,
    repo: Arc<dyn SnapshotRepository>,
    host: Arc<dyn ChannelHost>,
    roster: Arc<dyn Roster>,
    archiver: TranscriptArchiver,
    config: DeskConfig,
    unsynced: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LifecycleEngine {
    /// Builds an engine, loading persisted state through the repository
    pub fn new(
        config: DeskConfig,
        repo: Arc<dyn SnapshotRepository>,
        host: Arc<dyn ChannelHost>,
        roster: Arc<dyn Roster>,
    ) -> Result<Self> {
        let (store, vouches) = repo.load()?;
        let archiver = TranscriptArchiver::new(
            Arc::clone(&host),
            Arc::clone(&roster),
            config.channels.transcript,
        );
        Ok(Self {
            store: Mutex::new(store),
            vouches: Mutex::new(vouches),
            blacklist: Mutex::new(HashSet::new()),
            repo,
            host,
            roster,
            archiver,
            config,
            unsynced: AtomicBool::new(false),
        })
    }

    /// Whether in-memory state is ahead of the last successful save
    #[must_use]
    pub fn has_unsynced_state(&self) -> bool {
        self.unsynced.load(Ordering::SeqCst)
    }

    /// Writes the full state through the repository
    ///
    /// Called with the store lock held, after every mutation. On failure
    /// the mutation stands; the flag records that disk is behind.
    fn persist(&self, store: &TicketStore, vouches: &VouchLedger) {
        match self.repo.save(store, vouches) {
            Ok(()) => self.unsynced.store(false, Ordering::SeqCst),
            Err(e) => {
                self.unsynced.store(true, Ordering::SeqCst);
                tracing::error!("snapshot save failed, in-memory state is ahead of disk: {e}");
            },
        }
    }

    fn persist_locked(&self, store: &TicketStore) {
        let vouches = lock(&self.vouches);
        self.persist(store, &vouches);
    }

    fn claim_roles(&self, data: &DomainData) -> Vec<RoleId> {
        match data {
            DomainData::Trade { tier, .. } => vec![self.config.roles.trade_claim_role(*tier)],
            DomainData::Support { .. } => self.config.roles.staff.clone(),
            DomainData::Index { .. } => vec![self.config.roles.index_claim],
        }
    }

    fn claim_eligible(&self, actor: UserId, data: &DomainData) -> bool {
        if self.roster.is_privileged(actor) {
            return true;
        }
        self.claim_roles(data)
            .iter()
            .any(|role| self.roster.has_role(actor, *role))
    }

    /// Close, rename, and participant changes share one authorization rule:
    /// privileged actors always, the claimer always, anyone while unclaimed.
    fn authorize_manage(&self, ticket: &Ticket, actor: UserId) -> Result<()> {
        if self.roster.is_privileged(actor) {
            return Ok(());
        }
        match ticket.claimed_by {
            None => Ok(()),
            Some(claimer) if claimer == actor => Ok(()),
            Some(_) => Err(DeskError::NotClaimer),
        }
    }

    async fn notify(&self, channel: ChannelId, text: String) {
        if let Err(e) = self
            .host
            .send_notification(channel, Notification::text(text))
            .await
        {
            tracing::warn!(%channel, "notification failed: {e}");
        }
    }

    /// Opens a ticket: creates the channel, registers the record, persists
    ///
    /// The uniqueness guard runs twice: a pre-check before the channel is
    /// created, and again under the lock at insert time. If the insert
    /// loses that race the freshly created channel is torn down.
    pub async fn open(&self, request: OpenRequest) -> Result<ChannelId> {
        let OpenRequest {
            owner,
            owner_name,
            data,
        } = request;
        let domain = data.domain();

        if domain == Domain::Trade && self.is_blacklisted(owner) {
            return Err(DeskError::Blacklisted);
        }
        {
            let store = lock(&self.store);
            if store.open_for(domain, owner).is_some() {
                return Err(DeskError::DuplicateOwner { domain });
            }
        }

        let channel = self
            .host
            .create_channel(ChannelRequest {
                name: channel_name(&data, &owner_name),
                category: self.config.channels.category_for(&data),
                allow_roles: self.claim_roles(&data),
                owner,
            })
            .await?;

        let inserted = {
            let mut store = lock(&self.store);
            store
                .insert(Ticket::new(channel, owner, data.clone()))
                .map(|()| self.persist_locked(&store))
        };
        if let Err(e) = inserted {
            if let Err(teardown) = self.host.delete_channel(channel).await {
                tracing::warn!(%channel, "teardown after rejected open failed: {teardown}");
            }
            return Err(e);
        }

        tracing::info!(%channel, %owner, %domain, subtype = data.subtype_label(), "ticket opened");
        self.notify(
            self.config.channels.log_for(domain),
            format!(
                "New {} ticket ({}) opened by {owner_name} in channel {channel}",
                domain,
                data.subtype_label()
            ),
        )
        .await;
        Ok(channel)
    }

    /// Claims the ticket bound to `channel` for `actor`
    ///
    /// Eligibility (subtype role or privilege) is resolved and the claim
    /// applied under one lock, so two racing claimers cannot both succeed.
    pub async fn claim(&self, channel: ChannelId, actor: UserId) -> Result<()> {
        {
            let mut store = lock(&self.store);
            let eligible = {
                let ticket = store.get(channel)?;
                self.claim_eligible(actor, &ticket.data)
            };
            store.claim(channel, actor, eligible)?;
            self.persist_locked(&store);
        }
        tracing::info!(%channel, %actor, "ticket claimed");
        self.notify(
            channel,
            format!(
                "Ticket claimed by {}",
                name_or_id(self.roster.as_ref(), actor)
            ),
        )
        .await;
        Ok(())
    }

    /// Releases the claim on the ticket bound to `channel`
    pub async fn unclaim(&self, channel: ChannelId, actor: UserId) -> Result<()> {
        {
            let mut store = lock(&self.store);
            store.unclaim(channel, actor, self.roster.is_privileged(actor))?;
            self.persist_locked(&store);
        }
        tracing::info!(%channel, %actor, "ticket unclaimed");
        self.notify(
            channel,
            "Claim released; this ticket is open for staff again".to_string(),
        )
        .await;
        Ok(())
    }

    /// Reassigns the claim to `new_claimer` and grants them channel access
    ///
    /// Trade-only. The reassignment itself is unconditional; whoever the
    /// previous claimer was, they lose the ticket.
    pub async fn transfer(
        &self,
        channel: ChannelId,
        actor: UserId,
        new_claimer: UserId,
    ) -> Result<()> {
        {
            let mut store = lock(&self.store);
            if store.get(channel)?.domain() != Domain::Trade {
                return Err(DeskError::custom(
                    "transfer is only available on trade tickets",
                ));
            }
            store.transfer(channel, new_claimer)?;
            self.persist_locked(&store);
        }
        if let Err(e) = self.host.grant_access(channel, new_claimer).await {
            tracing::warn!(%channel, user = %new_claimer, "access grant after transfer failed: {e}");
        }
        tracing::info!(%channel, %actor, %new_claimer, "ticket transferred");
        self.notify(
            channel,
            format!(
                "Ticket transferred to {} by {}",
                name_or_id(self.roster.as_ref(), new_claimer),
                name_or_id(self.roster.as_ref(), actor)
            ),
        )
        .await;
        Ok(())
    }

    /// Closes the ticket bound to `channel`
    ///
    /// Transcript archival runs first and is best-effort; its failure is
    /// surfaced to the operator channel, never blocks the close. Channel
    /// teardown happens on a spawned task after the grace delay, by which
    /// point the record is already gone and persisted.
    pub async fn close(
        &self,
        channel: ChannelId,
        actor: UserId,
        reason: Option<&str>,
    ) -> Result<()> {
        let ticket = {
            let store = lock(&self.store);
            let ticket = store.get(channel)?.clone();
            self.authorize_manage(&ticket, actor)?;
            ticket
        };
        self.finish_close(ticket, actor, reason).await
    }

    /// Closes an index-service ticket after a confirmation step
    ///
    /// `confirmation` is supplied by the command surface (e.g. a button
    /// press) and resolves to accept or decline; the wait is bounded by
    /// the configured window. Decline and timeout leave state untouched.
    pub async fn close_index<F>(
        &self,
        channel: ChannelId,
        actor: UserId,
        reason: Option<&str>,
        confirmation: F,
    ) -> Result<IndexCloseOutcome>
    where
        F: Future<Output = bool> + Send,
    {
        let ticket = {
            let store = lock(&self.store);
            let ticket = store.get(channel)?.clone();
            if ticket.domain() != Domain::IndexService {
                return Err(DeskError::custom(
                    "two-step confirmation only applies to index tickets",
                ));
            }
            self.authorize_manage(&ticket, actor)?;
            ticket
        };
        match tokio::time::timeout(self.config.timing.confirm_window(), confirmation).await {
            Ok(true) => {
                self.finish_close(ticket, actor, reason).await?;
                Ok(IndexCloseOutcome::Closed)
            },
            Ok(false) => {
                tracing::info!(%channel, %actor, "index close declined");
                Ok(IndexCloseOutcome::Declined)
            },
            Err(_) => {
                tracing::info!(%channel, %actor, "index close confirmation timed out");
                Ok(IndexCloseOutcome::TimedOut)
            },
        }
    }

    async fn finish_close(&self, ticket: Ticket, actor: UserId, reason: Option<&str>) -> Result<()> {
        let channel = ticket.channel;
        let domain = ticket.domain();

        if let Err(e) = self.archiver.archive(&ticket, actor, reason, Utc::now()).await {
            tracing::warn!(%channel, "archival failed, closing without transcript: {e}");
            self.notify(
                self.config.channels.operator,
                format!("Transcript for channel {channel} could not be archived: {e}"),
            )
            .await;
        }

        {
            // re-fetch: a concurrent close may have won while we archived
            let mut store = lock(&self.store);
            store.remove(channel)?;
            self.persist_locked(&store);
        }
        tracing::info!(%channel, %actor, %domain, "ticket closed");
        self.notify(
            self.config.channels.log_for(domain),
            format!(
                "{} ticket in channel {channel} closed by {}",
                domain,
                name_or_id(self.roster.as_ref(), actor)
            ),
        )
        .await;

        let host = Arc::clone(&self.host);
        let grace = self.config.timing.close_grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Err(e) = host.delete_channel(channel).await {
                tracing::warn!(%channel, "channel teardown failed: {e}");
            }
        });
        Ok(())
    }

    /// Renames the ticket's channel
    pub async fn rename(&self, channel: ChannelId, actor: UserId, name: &str) -> Result<()> {
        {
            let store = lock(&self.store);
            let ticket = store.get(channel)?;
            self.authorize_manage(ticket, actor)?;
        }
        self.host.rename_channel(channel, name).await
    }

    /// Grants an additional user access to the ticket's channel
    pub async fn add_participant(
        &self,
        channel: ChannelId,
        actor: UserId,
        user: UserId,
    ) -> Result<()> {
        {
            let store = lock(&self.store);
            let ticket = store.get(channel)?;
            self.authorize_manage(ticket, actor)?;
        }
        self.host.grant_access(channel, user).await?;
        self.notify(
            channel,
            format!(
                "{} was added to the ticket",
                name_or_id(self.roster.as_ref(), user)
            ),
        )
        .await;
        Ok(())
    }

    /// Records a vouch for `subject` and returns their new tally
    pub fn record_vouch(&self, subject: UserId, entry: VouchEntry) -> u32 {
        let store = lock(&self.store);
        let mut vouches = lock(&self.vouches);
        let record = vouches.0.entry(subject).or_default();
        record.count += 1;
        record.vouches.push(entry);
        let count = record.count;
        self.persist(&store, &vouches);
        count
    }

    /// The vouch tally for a user, if any
    #[must_use]
    pub fn vouch_record(&self, subject: UserId) -> Option<VouchRecord> {
        lock(&self.vouches).0.get(&subject).cloned()
    }

    /// Adds or removes a user from the trade blacklist
    ///
    /// The blacklist is session-scoped: it gates ticket creation only and
    /// is not persisted in the snapshot.
    pub fn set_blacklisted(&self, user: UserId, blacklisted: bool) {
        let mut blacklist = lock(&self.blacklist);
        if blacklisted {
            blacklist.insert(user);
        } else {
            blacklist.remove(&user);
        }
    }

    /// Whether the user is blacklisted from opening trade tickets
    #[must_use]
    pub fn is_blacklisted(&self, user: UserId) -> bool {
        lock(&self.blacklist).contains(&user)
    }

    /// A copy of the ticket bound to `channel`
    pub fn ticket(&self, channel: ChannelId) -> Result<Ticket> {
        lock(&self.store).get(channel).cloned()
    }

    /// Total live tickets across all domains
    #[must_use]
    pub fn open_ticket_count(&self) -> usize {
        lock(&self.store).len()
    }

    /// The engine's configuration
    #[must_use]
    pub const fn config(&self) -> &DeskConfig {
        &self.config
    }
}

/// Derives the channel name from the intake payload and owner name
fn channel_name(data: &DomainData, owner_name: &str) -> String {
    let prefix = match data {
        DomainData::Trade { tier, .. } => match tier {
            crate::core::TradeTier::Small => "small-trade",
            crate::core::TradeTier::Big => "big-trade",
            crate::core::TradeTier::Massive => "massive-trade",
        },
        DomainData::Support { .. } => "support",
        DomainData::Index { .. } => "index",
    };
    format!("{prefix}-{}", slugify(owner_name))
}

/// Lowercases and strips a display name down to channel-safe characters
fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "ticket".to_string()
    } else {
        out
    }
}
