/*!
 * Installed Set
 * Remembers which operations a watcher has already decorated
 */

use super::facility::Facility;
use super::instrument::Instrument;
use dashmap::DashSet;
use std::sync::Arc;
use tracing::debug;

/// Per-watcher record of instrumented operation identities
#[derive(Debug, Default)]
pub struct InstalledSet {
    keys: DashSet<String, ahash::RandomState>,
}

impl InstalledSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`; false if it was already instrumented
    #[inline]
    pub fn claim(&self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    /// Give up a claim whose decoration did not happen
    pub fn release(&self, key: &str) -> bool {
        self.keys.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Decorate a single-slot facility at most once
///
/// Disabled watchers return before touching the facility; an absent or
/// empty facility installs nothing.
pub(crate) fn install_facility<T: ?Sized>(
    instrument: &Instrument,
    installed: &InstalledSet,
    facility: Option<&Facility<T>>,
    operation: &str,
    wrap: impl FnOnce(Arc<T>, Instrument) -> Arc<T>,
) -> bool {
    if !instrument.is_enabled() {
        return false;
    }
    let Some(facility) = facility else {
        debug!(entry_type = %instrument.entry_type(), "No facility registered, watcher idle");
        return false;
    };
    let key = facility.id().key(operation);
    if !facility.is_registered() || !installed.claim(key.clone()) {
        return false;
    }

    let instrument = instrument.clone();
    let wrapped = facility.decorate(|inner| wrap(inner, instrument));
    if !wrapped {
        installed.release(&key);
    }
    debug!(operation, wrapped, "Watcher installed");
    wrapped
}
