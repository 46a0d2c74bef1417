//! Archive registry and occupancy ledger.
//!
//! The registry remembers, per loaded archive, every effective name the
//! archive tried to write. The ledger remembers, per effective name, every
//! archive that tried to write it, oldest first. Both record attempts, not
//! outcomes: a name skipped because of a conflict or the overwrite policy is
//! still recorded, so unload can always unwind exactly what load did.

use std::collections::HashMap;
use std::sync::Arc;

use crate::tree::ArchiveId;

/// Names an archive contributed, in the order the archive reader listed them.
#[derive(Debug, Clone)]
struct ArchiveRecord {
    id: ArchiveId,
    names: Vec<String>,
}

/// Tracks loaded archives and the per-name occupancy ledger.
#[derive(Debug, Default)]
pub struct ArchiveRegistry {
    /// Loaded archives in first-load order.
    archives: Vec<ArchiveRecord>,

    /// Effective name to every archive that attempted to claim it.
    ledger: HashMap<String, Vec<ArchiveId>>,
}

impl ArchiveRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an archive, returning its shared identifier.
    ///
    /// Registering an archive that is already loaded returns the existing
    /// identifier and keeps its contributed names.
    pub fn register(&mut self, id: &str) -> ArchiveId {
        if let Some(record) = self.record(id) {
            return Arc::clone(&record.id);
        }

        let id: ArchiveId = Arc::from(id);
        self.archives.push(ArchiveRecord {
            id: Arc::clone(&id),
            names: Vec::new(),
        });
        id
    }

    /// Record that `archive` attempted to write `name`.
    ///
    /// Appends to both the archive's contributed names and the ledger.
    /// Unregistered archives are ignored.
    pub fn record_attempt(&mut self, archive: &ArchiveId, name: &str) {
        let Some(record) = self.archives.iter_mut().find(|r| r.id == *archive) else {
            return;
        };
        record.names.push(name.to_string());
        self.ledger
            .entry(name.to_string())
            .or_default()
            .push(Arc::clone(archive));
    }

    /// Remove an archive and its ledger contributions.
    ///
    /// Returns the archive's identifier and contributed names in original
    /// order, or `None` if the archive is not loaded.
    pub fn unregister(&mut self, id: &str) -> Option<(ArchiveId, Vec<String>)> {
        let position = self.archives.iter().position(|r| &*r.id == id)?;
        let record = self.archives.remove(position);

        for name in &record.names {
            self.release(name, &record.id);
        }

        Some((record.id, record.names))
    }

    /// Drop one ledger slot for `archive` under `name`.
    fn release(&mut self, name: &str, archive: &ArchiveId) {
        let Some(occupants) = self.ledger.get_mut(name) else {
            return;
        };

        if let Some(slot) = occupants.iter().position(|a| a == archive) {
            occupants.remove(slot);
        }

        if occupants.is_empty() {
            self.ledger.remove(name);
        }
    }

    fn record(&self, id: &str) -> Option<&ArchiveRecord> {
        self.archives.iter().find(|r| &*r.id == id)
    }

    /// Check if an archive is currently loaded.
    pub fn is_loaded(&self, id: &str) -> bool {
        self.record(id).is_some()
    }

    /// Shared identifier of a loaded archive.
    pub fn id(&self, id: &str) -> Option<&ArchiveId> {
        self.record(id).map(|r| &r.id)
    }

    /// Effective names a loaded archive contributed, in reader order.
    pub fn contributed(&self, id: &str) -> Option<&[String]> {
        self.record(id).map(|r| r.names.as_slice())
    }

    /// Archives that attempted to claim `name`, oldest first.
    pub fn occupants(&self, name: &str) -> Option<&[ArchiveId]> {
        self.ledger.get(name).map(Vec::as_slice)
    }

    /// Loaded archive identifiers in first-load order.
    pub fn archives(&self) -> impl Iterator<Item = &ArchiveId> {
        self.archives.iter().map(|r| &r.id)
    }

    /// Number of loaded archives.
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Check if no archive is loaded.
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Number of distinct names in the ledger.
    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }
}
