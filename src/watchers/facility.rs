/*!
 * Facility Slots
 * Explicit seams through which the host calls an instrumentable capability
 *
 * A host registers its implementation in a slot and always calls through
 * the slot. Watchers replace the slot's contents with a decorator that
 * forwards to the original.
 */

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

static NEXT_FACILITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique facility identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacilityId(u64);

impl FacilityId {
    pub fn next() -> Self {
        Self(NEXT_FACILITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Install key for one named operation of this facility
    pub fn key(&self, operation: &str) -> String {
        format!("{}/{}", self.0, operation)
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "facility-{}", self.0)
    }
}

/// Atomic slot holding a single capability implementation
pub struct Facility<T: ?Sized> {
    id: FacilityId,
    // arc-swap needs a sized pointee
    slot: ArcSwapOption<Arc<T>>,
}

impl<T: ?Sized> Facility<T> {
    /// Slot with nothing registered
    pub fn empty() -> Self {
        Self {
            id: FacilityId::next(),
            slot: ArcSwapOption::empty(),
        }
    }

    pub fn new(implementation: Arc<T>) -> Self {
        let facility = Self::empty();
        facility.set(implementation);
        facility
    }

    pub fn id(&self) -> FacilityId {
        self.id
    }

    /// Current implementation
    #[inline]
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.load_full().map(|inner| Arc::clone(&*inner))
    }

    pub fn set(&self, implementation: Arc<T>) {
        self.slot.store(Some(Arc::new(implementation)));
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }

    pub fn is_registered(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Swap the implementation for `wrap(current)`; false if empty
    pub fn decorate(&self, wrap: impl FnOnce(Arc<T>) -> Arc<T>) -> bool {
        match self.get() {
            Some(current) => {
                self.set(wrap(current));
                true
            }
            None => false,
        }
    }
}

impl<T: ?Sized> Default for Facility<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Named registry of capability implementations
pub struct FacilityMap<T: ?Sized> {
    id: FacilityId,
    entries: DashMap<String, Arc<T>, ahash::RandomState>,
}

impl<T: ?Sized> FacilityMap<T> {
    pub fn new() -> Self {
        Self {
            id: FacilityId::next(),
            entries: DashMap::default(),
        }
    }

    pub fn id(&self) -> FacilityId {
        self.id
    }

    pub fn register(&self, name: impl Into<String>, implementation: Arc<T>) {
        self.entries.insert(name.into(), implementation);
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.entries.remove(name).map(|(_, v)| v)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Swap `name` for `wrap(current)`; false if not registered
    pub fn decorate(&self, name: &str, wrap: impl FnOnce(Arc<T>) -> Arc<T>) -> bool {
        match self.entries.get_mut(name) {
            Some(mut slot) => {
                let current = Arc::clone(slot.value());
                *slot.value_mut() = wrap(current);
                true
            }
            None => false,
        }
    }
}

impl<T: ?Sized> Default for FacilityMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
