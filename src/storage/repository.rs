use crate::core::VouchLedger;
use crate::error::Result;
use crate::store::TicketStore;

use super::FileStorage;

/// Repository trait for snapshot persistence
///
/// The engine saves through this seam after every mutating operation and
/// loads through it once at startup, allowing alternative backing stores.
pub trait SnapshotRepository: Send + Sync {
    /// Persists the full state durably
    fn save(&self, store: &TicketStore, vouches: &VouchLedger) -> Result<()>;

    /// Loads the full state, falling back to empty on missing/corrupt data
    fn load(&self) -> Result<(TicketStore, VouchLedger)>;
}

impl SnapshotRepository for FileStorage {
    fn save(&self, store: &TicketStore, vouches: &VouchLedger) -> Result<()> {
        self.save_snapshot(store, vouches)
    }

    fn load(&self) -> Result<(TicketStore, VouchLedger)> {
        self.load_snapshot()
    }
}
