use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{ChannelId, Domain, DomainData, Status, Ticket, TicketBuilder, UserId, VouchLedger};
use crate::error::Result;
use crate::store::TicketStore;

/// File-backed snapshot storage
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write never leaves a truncated snapshot behind. The file is
/// single-writer: only this process touches it.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

/// One persisted ticket record
///
/// The channel id is the map key, not a field, matching the on-disk
/// layout. Only fields needed to resume the lifecycle are persisted.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTicket {
    owner: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    claimed_by: Option<UserId>,
    status: Status,
    created_at: DateTime<Utc>,
    data: DomainData,
}

impl StoredTicket {
    fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            owner: ticket.owner,
            claimed_by: ticket.claimed_by,
            status: ticket.status,
            created_at: ticket.created_at,
            data: ticket.data.clone(),
        }
    }

    fn into_ticket(self, channel: ChannelId) -> Ticket {
        let mut builder = TicketBuilder::new(channel, self.owner, self.data)
            .status(self.status)
            .created_at(self.created_at);
        if let Some(claimer) = self.claimed_by {
            builder = builder.claimed_by(claimer);
        }
        builder.build()
    }
}

/// On-disk document shape
#[derive(Debug, Serialize)]
struct SnapshotOut<'a> {
    vouches: &'a VouchLedger,
    tickets: DomainsOut,
}

#[derive(Debug, Serialize)]
struct DomainsOut {
    trade: BTreeMap<String, StoredTicket>,
    support: BTreeMap<String, StoredTicket>,
    index: BTreeMap<String, StoredTicket>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    vouches: serde_json::Value,
    #[serde(default)]
    tickets: DomainsIn,
}

#[derive(Debug, Default, Deserialize)]
struct DomainsIn {
    #[serde(default)]
    trade: HashMap<String, serde_json::Value>,
    #[serde(default)]
    support: HashMap<String, serde_json::Value>,
    #[serde(default)]
    index: HashMap<String, serde_json::Value>,
}

impl FileStorage {
    /// Creates storage backed by the given snapshot file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the full state and writes it atomically
    pub fn save_snapshot(&self, store: &TicketStore, vouches: &VouchLedger) -> Result<()> {
        let snapshot = SnapshotOut {
            vouches,
            tickets: DomainsOut {
                trade: serialize_domain(store, Domain::Trade),
                support: serialize_domain(store, Domain::Support),
                index: serialize_domain(store, Domain::IndexService),
            },
        };
        let body = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), tickets = store.len(), "snapshot saved");
        Ok(())
    }

    /// Loads state from disk
    ///
    /// A missing or unreadable file yields empty state; a malformed
    /// individual record is skipped with a warning rather than aborting
    /// the whole load.
    pub fn load_snapshot(&self) -> Result<(TicketStore, VouchLedger)> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no snapshot file, starting empty");
            return Ok((TicketStore::new(), VouchLedger::new()));
        }

        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "unreadable snapshot, starting empty: {e}");
                return Ok((TicketStore::new(), VouchLedger::new()));
            },
        };
        let snapshot: SnapshotIn = match serde_json::from_str(&body) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "corrupt snapshot, starting empty: {e}");
                return Ok((TicketStore::new(), VouchLedger::new()));
            },
        };

        let vouches = match serde_json::from_value::<VouchLedger>(snapshot.vouches.clone()) {
            Ok(ledger) => ledger,
            Err(e) => {
                if !snapshot.vouches.is_null() {
                    tracing::warn!("malformed vouch document, dropping: {e}");
                }
                VouchLedger::new()
            },
        };

        let store = TicketStore::from_domains(
            deserialize_domain(snapshot.tickets.trade, Domain::Trade),
            deserialize_domain(snapshot.tickets.support, Domain::Support),
            deserialize_domain(snapshot.tickets.index, Domain::IndexService),
        );
        tracing::info!(tickets = store.len(), "snapshot loaded");
        Ok((store, vouches))
    }
}

fn serialize_domain(store: &TicketStore, domain: Domain) -> BTreeMap<String, StoredTicket> {
    store
        .tickets(domain)
        .iter()
        .map(|(channel, ticket)| (channel.to_string(), StoredTicket::from_ticket(ticket)))
        .collect()
}

fn deserialize_domain(
    raw: HashMap<String, serde_json::Value>,
    domain: Domain,
) -> HashMap<ChannelId, Ticket> {
    let mut out = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let Ok(channel) = ChannelId::try_from(key.clone()) else {
            tracing::warn!(%domain, key, "skipping record with malformed channel key");
            continue;
        };
        match serde_json::from_value::<StoredTicket>(value) {
            Ok(stored) if stored.data.domain() == domain => {
                out.insert(channel, stored.into_ticket(channel));
            },
            Ok(stored) => {
                tracing::warn!(
                    %domain, %channel,
                    found = %stored.data.domain(),
                    "skipping record filed under the wrong domain"
                );
            },
            Err(e) => {
                tracing::warn!(%domain, %channel, "skipping malformed record: {e}");
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SupportCategory, TradeTier};
    use tempfile::TempDir;

    fn trade_ticket(channel: u64, owner: u64) -> Ticket {
        Ticket::new(
            ChannelId(channel),
            UserId(owner),
            DomainData::Trade {
                tier: TradeTier::Massive,
                partner: "other".to_string(),
                details: "big swap".to_string(),
                declared_value: "5B".to_string(),
                can_join_links: "Yes".to_string(),
                platform_users: None,
            },
        )
    }

    fn support_ticket(channel: u64, owner: u64) -> Ticket {
        Ticket::new(
            ChannelId(channel),
            UserId(owner),
            DomainData::Support {
                category: SupportCategory::Appeal,
                description: "please unban".to_string(),
                reporting: None,
                evidence: Some("link".to_string()),
            },
        )
    }

    fn storage_in(dir: &TempDir) -> FileStorage {
        FileStorage::new(dir.path().join("state").join("desk.json"))
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let mut store = TicketStore::new();
        let mut claimed = trade_ticket(1, 100);
        claimed.claimed_by = Some(UserId(200));
        store.insert(claimed.clone()).unwrap();
        store.insert(support_ticket(2, 100)).unwrap();
        let vouches = VouchLedger::new();

        storage.save_snapshot(&store, &vouches).unwrap();
        let (loaded, loaded_vouches) = storage.load_snapshot().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(ChannelId(1)).unwrap(), &claimed);
        assert_eq!(
            loaded.get(ChannelId(2)).unwrap().data,
            store.get(ChannelId(2)).unwrap().data
        );
        assert_eq!(loaded_vouches, vouches);
    }

    #[test]
    fn save_of_loaded_state_is_stable() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let mut store = TicketStore::new();
        store.insert(trade_ticket(1, 100)).unwrap();
        storage.save_snapshot(&store, &VouchLedger::new()).unwrap();
        let first = fs::read_to_string(storage.path()).unwrap();

        let (loaded, vouches) = storage.load_snapshot().unwrap();
        storage.save_snapshot(&loaded, &vouches).unwrap();
        let second = fs::read_to_string(storage.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        let (store, vouches) = storage.load_snapshot().unwrap();
        assert!(store.is_empty());
        assert!(vouches.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("desk.json");
        fs::write(&path, "{ not json").unwrap();
        let storage = FileStorage::new(&path);
        let (store, _) = storage.load_snapshot().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let mut store = TicketStore::new();
        store.insert(trade_ticket(1, 100)).unwrap();
        storage.save_snapshot(&store, &VouchLedger::new()).unwrap();

        // graft a broken record and a bad key into the saved document
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
        doc["tickets"]["trade"]["2"] = serde_json::json!({"owner": "not numeric"});
        doc["tickets"]["support"]["oops"] = serde_json::json!({});
        fs::write(storage.path(), serde_json::to_string(&doc).unwrap()).unwrap();

        let (loaded, _) = storage.load_snapshot().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(ChannelId(1)).is_ok());
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage
            .save_snapshot(&TicketStore::new(), &VouchLedger::new())
            .unwrap();
        assert!(storage.path().exists());
        assert!(!storage.path().with_extension("tmp").exists());
    }
}
