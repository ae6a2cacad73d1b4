//! Engine-side bookkeeping of live beacons.
//!
//! The engine owns the registry; beacons only hold a [`Weak`](std::sync::Weak)
//! reference to it and deregister themselves when dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifier of one beacon instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeaconId(u64);

impl BeaconId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BeaconId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BeaconId({})", self.0)
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    id: BeaconId,
    queued: bool,
}

/// Live beacons in arrival order.
#[derive(Debug, Default)]
pub struct BeaconRegistry {
    entries: Mutex<Vec<RegistryEntry>>,
    next_id: AtomicU64,
}

impl BeaconRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands out a fresh id. The beacon is not registered until [`add`](Self::add).
    pub fn allocate_id(&self) -> BeaconId {
        BeaconId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a beacon. `queued` beacons are waiting for their source to be ready.
    pub fn add(&self, id: BeaconId, queued: bool) {
        let mut entries = self.entries();
        if let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) {
            entry.queued = queued;
            return;
        }
        entries.push(RegistryEntry { id, queued });
        log::debug!("Registered {} (queued: {}), {} live", id, queued, entries.len());
    }

    /// Clears the queued flag once the beacon starts playing.
    pub fn mark_playing(&self, id: BeaconId) {
        if let Some(entry) = self.entries().iter_mut().find(|entry| entry.id == id) {
            entry.queued = false;
        }
    }

    /// Deregisters a beacon. Unknown ids are ignored.
    pub fn remove(&self, id: BeaconId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if removed {
            log::debug!("Deregistered {}, {} live", id, entries.len());
        }
        removed
    }

    pub fn contains(&self, id: BeaconId) -> bool {
        self.entries().iter().any(|entry| entry.id == id)
    }

    pub fn is_queued(&self, id: BeaconId) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.id == id && entry.queued)
    }

    pub fn ids(&self) -> Vec<BeaconId> {
        self.entries().iter().map(|entry| entry.id).collect()
    }

    /// Beacons still waiting for their source, oldest first.
    pub fn queued(&self) -> Vec<BeaconId> {
        self.entries()
            .iter()
            .filter(|entry| entry.queued)
            .map(|entry| entry.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let registry = BeaconRegistry::new();
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert_ne!(a, b);
        assert!(registry.is_empty());

        registry.add(a, false);
        registry.add(b, false);
        assert_eq!(registry.ids(), vec![a, b]);

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(a));
    }

    #[test]
    fn test_queued_in_arrival_order() {
        let registry = BeaconRegistry::new();
        let ids: Vec<_> = (0..4).map(|_| registry.allocate_id()).collect();
        registry.add(ids[0], true);
        registry.add(ids[1], false);
        registry.add(ids[2], true);
        registry.add(ids[3], true);

        assert_eq!(registry.queued(), vec![ids[0], ids[2], ids[3]]);

        registry.mark_playing(ids[2]);
        assert_eq!(registry.queued(), vec![ids[0], ids[3]]);
        assert!(!registry.is_queued(ids[2]));
    }

    #[test]
    fn test_re_adding_updates_flag() {
        let registry = BeaconRegistry::new();
        let id = registry.allocate_id();
        registry.add(id, true);
        registry.add(id, false);
        assert_eq!(registry.len(), 1);
        assert!(registry.queued().is_empty());
    }
}
