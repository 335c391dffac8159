//! In-memory ticket store
//!
//! Single source of truth for ticket state during process lifetime: one
//! map per domain from channel id to [`Ticket`]. All mutations go through
//! guarded operations; no caller mutates a record's fields directly.
//!
//! Every guarded operation is a plain synchronous read-check-write with no
//! suspension point, so under the engine's lock each one is atomic with
//! respect to other ticket operations. That is the entire correctness
//! argument for claim exclusivity and per-owner uniqueness.

use std::collections::HashMap;

use crate::core::{ChannelId, Domain, Status, Ticket, UserId};
use crate::error::{DeskError, Result};

/// Per-domain mapping from channel id to live ticket
#[derive(Debug, Default)]
pub struct TicketStore {
    trade: HashMap<ChannelId, Ticket>,
    support: HashMap<ChannelId, Ticket>,
    index: HashMap<ChannelId, Ticket>,
}

impl TicketStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from per-domain maps, as loaded from a snapshot
    #[must_use]
    pub fn from_domains(
        trade: HashMap<ChannelId, Ticket>,
        support: HashMap<ChannelId, Ticket>,
        index: HashMap<ChannelId, Ticket>,
    ) -> Self {
        Self {
            trade,
            support,
            index,
        }
    }

    fn domain_map(&self, domain: Domain) -> &HashMap<ChannelId, Ticket> {
        match domain {
            Domain::Trade => &self.trade,
            Domain::Support => &self.support,
            Domain::IndexService => &self.index,
        }
    }

    fn domain_map_mut(&mut self, domain: Domain) -> &mut HashMap<ChannelId, Ticket> {
        match domain {
            Domain::Trade => &mut self.trade,
            Domain::Support => &mut self.support,
            Domain::IndexService => &mut self.index,
        }
    }

    /// The open ticket owned by `owner` in `domain`, if one exists
    ///
    /// Linear scan over the domain's live tickets. Acceptable while
    /// concurrent open tickets stay in the tens; an owner index would be
    /// the fix if that ever changes.
    #[must_use]
    pub fn open_for(&self, domain: Domain, owner: UserId) -> Option<&Ticket> {
        self.domain_map(domain)
            .values()
            .find(|t| t.owner == owner && t.status == Status::Open)
    }

    /// Inserts a freshly created ticket
    ///
    /// Enforces per-owner uniqueness within the domain and channel-id
    /// uniqueness across the union of all domains.
    pub fn insert(&mut self, ticket: Ticket) -> Result<()> {
        let domain = ticket.domain();
        if self.get(ticket.channel).is_ok() {
            return Err(DeskError::ChannelCollision {
                channel: ticket.channel,
            });
        }
        if self.open_for(domain, ticket.owner).is_some() {
            return Err(DeskError::DuplicateOwner { domain });
        }
        self.domain_map_mut(domain).insert(ticket.channel, ticket);
        Ok(())
    }

    /// Looks up a ticket by channel id across all domains
    pub fn get(&self, channel: ChannelId) -> Result<&Ticket> {
        self.trade
            .get(&channel)
            .or_else(|| self.support.get(&channel))
            .or_else(|| self.index.get(&channel))
            .ok_or(DeskError::TicketNotFound { channel })
    }

    fn get_mut(&mut self, channel: ChannelId) -> Result<&mut Ticket> {
        if let Some(t) = self.trade.get_mut(&channel) {
            return Ok(t);
        }
        if let Some(t) = self.support.get_mut(&channel) {
            return Ok(t);
        }
        self.index
            .get_mut(&channel)
            .ok_or(DeskError::TicketNotFound { channel })
    }

    /// Claims a ticket for `actor`
    ///
    /// `eligible` is evaluated by the caller (role check or privileged
    /// override); the store stays free of platform permission logic.
    /// Rejection order matches what the actor can self-correct on:
    /// already claimed, then self-claim, then missing role.
    pub fn claim(&mut self, channel: ChannelId, actor: UserId, eligible: bool) -> Result<()> {
        let ticket = self.get_mut(channel)?;
        if ticket.claimed_by.is_some() {
            return Err(DeskError::AlreadyClaimed);
        }
        if actor == ticket.owner {
            return Err(DeskError::SelfClaim);
        }
        if !eligible {
            return Err(DeskError::InsufficientRole);
        }
        ticket.claimed_by = Some(actor);
        Ok(())
    }

    /// Clears the claim on a ticket, returning the previous claimer
    ///
    /// Only the claimer themselves or a privileged actor may unclaim.
    pub fn unclaim(
        &mut self,
        channel: ChannelId,
        actor: UserId,
        is_privileged: bool,
    ) -> Result<UserId> {
        let ticket = self.get_mut(channel)?;
        let Some(claimer) = ticket.claimed_by else {
            return Err(DeskError::NotClaimed);
        };
        if actor != claimer && !is_privileged {
            return Err(DeskError::NotClaimer);
        }
        ticket.claimed_by = None;
        Ok(claimer)
    }

    /// Reassigns the claim unconditionally, returning the previous claimer
    pub fn transfer(&mut self, channel: ChannelId, new_claimer: UserId) -> Result<Option<UserId>> {
        let ticket = self.get_mut(channel)?;
        let previous = ticket.claimed_by.replace(new_claimer);
        Ok(previous)
    }

    /// Removes a ticket, marking it closed, and returns it for archival
    ///
    /// After this returns, any operation on the channel fails with
    /// `TicketNotFound`; no closed record outlives this call.
    pub fn remove(&mut self, channel: ChannelId) -> Result<Ticket> {
        let domain = self.get(channel)?.domain();
        let mut ticket = self
            .domain_map_mut(domain)
            .remove(&channel)
            .ok_or(DeskError::TicketNotFound { channel })?;
        ticket.status = Status::Closed;
        Ok(ticket)
    }

    /// Live tickets of one domain
    #[must_use]
    pub fn tickets(&self, domain: Domain) -> &HashMap<ChannelId, Ticket> {
        self.domain_map(domain)
    }

    /// Total live tickets across all domains
    #[must_use]
    pub fn len(&self) -> usize {
        self.trade.len() + self.support.len() + self.index.len()
    }

    /// Whether no tickets are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DomainData, IndexVariant, SupportCategory, TradeTier};

    fn trade(channel: u64, owner: u64) -> Ticket {
        Ticket::new(
            ChannelId(channel),
            UserId(owner),
            DomainData::Trade {
                tier: TradeTier::Small,
                partner: "p".to_string(),
                details: "d".to_string(),
                declared_value: "500M".to_string(),
                can_join_links: "Yes".to_string(),
                platform_users: None,
            },
        )
    }

    fn support(channel: u64, owner: u64) -> Ticket {
        Ticket::new(
            ChannelId(channel),
            UserId(owner),
            DomainData::Support {
                category: SupportCategory::GeneralQuestion,
                description: "q".to_string(),
                reporting: None,
                evidence: None,
            },
        )
    }

    fn index(channel: u64, owner: u64) -> Ticket {
        Ticket::new(
            ChannelId(channel),
            UserId(owner),
            DomainData::Index {
                variant: IndexVariant::Gold,
                platform_user: "u".to_string(),
                details: None,
            },
        )
    }

    #[test]
    fn owner_uniqueness_within_domain() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();
        let err = store.insert(trade(2, 100)).unwrap_err();
        assert!(matches!(
            err,
            DeskError::DuplicateOwner {
                domain: Domain::Trade
            }
        ));
    }

    #[test]
    fn same_owner_across_domains_is_allowed() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();
        store.insert(support(2, 100)).unwrap();
        store.insert(index(3, 100)).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn channel_ids_are_unique_across_domains() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();
        let err = store.insert(support(1, 200)).unwrap_err();
        assert!(matches!(err, DeskError::ChannelCollision { .. }));
    }

    #[test]
    fn claim_is_exclusive_until_unclaim() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();

        store.claim(ChannelId(1), UserId(200), true).unwrap();
        let err = store.claim(ChannelId(1), UserId(300), true).unwrap_err();
        assert!(matches!(err, DeskError::AlreadyClaimed));

        let previous = store.unclaim(ChannelId(1), UserId(200), false).unwrap();
        assert_eq!(previous, UserId(200));
        store.claim(ChannelId(1), UserId(300), true).unwrap();
        assert_eq!(store.get(ChannelId(1)).unwrap().claimed_by, Some(UserId(300)));
    }

    #[test]
    fn self_claim_is_rejected() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();
        let err = store.claim(ChannelId(1), UserId(100), true).unwrap_err();
        assert!(matches!(err, DeskError::SelfClaim));
    }

    #[test]
    fn ineligible_claim_is_rejected() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();
        let err = store.claim(ChannelId(1), UserId(200), false).unwrap_err();
        assert!(matches!(err, DeskError::InsufficientRole));
    }

    #[test]
    fn unclaim_requires_claimer_or_privilege() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();

        let err = store.unclaim(ChannelId(1), UserId(200), false).unwrap_err();
        assert!(matches!(err, DeskError::NotClaimed));

        store.claim(ChannelId(1), UserId(200), true).unwrap();
        let err = store.unclaim(ChannelId(1), UserId(300), false).unwrap_err();
        assert!(matches!(err, DeskError::NotClaimer));

        // privileged override
        store.unclaim(ChannelId(1), UserId(300), true).unwrap();
        assert!(!store.get(ChannelId(1)).unwrap().is_claimed());
    }

    #[test]
    fn transfer_replaces_claimer_unconditionally() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();

        assert_eq!(store.transfer(ChannelId(1), UserId(200)).unwrap(), None);
        assert_eq!(
            store.transfer(ChannelId(1), UserId(300)).unwrap(),
            Some(UserId(200))
        );
        assert_eq!(store.get(ChannelId(1)).unwrap().claimed_by, Some(UserId(300)));
    }

    #[test]
    fn remove_is_terminal() {
        let mut store = TicketStore::new();
        store.insert(trade(1, 100)).unwrap();

        let removed = store.remove(ChannelId(1)).unwrap();
        assert_eq!(removed.status, Status::Closed);

        assert!(matches!(
            store.get(ChannelId(1)),
            Err(DeskError::TicketNotFound { .. })
        ));
        assert!(matches!(
            store.claim(ChannelId(1), UserId(200), true),
            Err(DeskError::TicketNotFound { .. })
        ));
        assert!(matches!(
            store.remove(ChannelId(1)),
            Err(DeskError::TicketNotFound { .. })
        ));

        // owner may open again after closure
        store.insert(trade(2, 100)).unwrap();
    }
}
