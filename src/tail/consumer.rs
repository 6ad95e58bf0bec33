/*!
 * Tail Consumer
 * Locally held view of the newest entries, kept current by polling
 *
 * Each pagination kind (refresh, load more, load new, check) is guarded by
 * its own in-flight flag; a second call of the same kind while one runs is
 * skipped. Calls of different kinds may overlap and the last one applied
 * wins. State is only mutated after an await completes, so a dropped call
 * never leaves a partial update behind.
 */

use super::settings::SettingsStore;
use super::source::TailSource;
use crate::core::errors::TailError;
use crate::core::limits::{AUTO_REFRESH_SETTING, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::entries::{Entry, EntryType, Sequence};
use crate::query::CursorRequest;
use crate::store::StorageFilters;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of what the consumer currently shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TailState {
    /// Newest first
    pub entries: Vec<Entry>,
    pub newest_sequence: Option<Sequence>,
    pub oldest_sequence: Option<Sequence>,
    pub has_more: bool,
    pub total: u64,
    /// Entries known to exist beyond `newest_sequence`
    pub new_count: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Refresh,
    LoadMore,
    LoadNew,
    Check,
}

#[derive(Default)]
struct InFlight {
    refresh: AtomicBool,
    load_more: AtomicBool,
    load_new: AtomicBool,
    check: AtomicBool,
}

impl InFlight {
    fn flag(&self, kind: CallKind) -> &AtomicBool {
        match kind {
            CallKind::Refresh => &self.refresh,
            CallKind::LoadMore => &self.load_more,
            CallKind::LoadNew => &self.load_new,
            CallKind::Check => &self.check,
        }
    }

    fn try_begin(&self, kind: CallKind) -> Option<FlightGuard<'_>> {
        let flag = self.flag(kind);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flag })
    }
}

struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Consumer options
#[derive(Debug, Clone)]
pub struct TailOptions {
    pub entry_type: Option<EntryType>,
    pub filters: StorageFilters,
    pub limit: usize,
    /// Namespaces the persisted auto-refresh flag
    pub installation_id: String,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            entry_type: None,
            filters: StorageFilters::new(),
            limit: DEFAULT_PAGE_LIMIT,
            installation_id: "default".to_string(),
        }
    }
}

impl TailOptions {
    pub fn for_type(entry_type: EntryType) -> Self {
        Self {
            entry_type: Some(entry_type),
            ..Self::default()
        }
    }
}

pub struct TailConsumer {
    source: Arc<dyn TailSource>,
    settings: Arc<dyn SettingsStore>,
    settings_key: String,
    entry_type: Option<EntryType>,
    filters: StorageFilters,
    limit: usize,
    auto_refresh: AtomicBool,
    state: Mutex<TailState>,
    in_flight: InFlight,
}

impl TailConsumer {
    /// Build a consumer, reading the persisted auto-refresh flag once
    pub fn new(source: Arc<dyn TailSource>, settings: Arc<dyn SettingsStore>, options: TailOptions) -> Self {
        let settings_key = format!("{}:{}", options.installation_id, AUTO_REFRESH_SETTING);
        let auto_refresh = match settings.get_bool(&settings_key) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "Could not read auto-refresh setting, defaulting to off");
                false
            }
        };

        Self {
            source,
            settings,
            settings_key,
            entry_type: options.entry_type,
            filters: options.filters,
            limit: options.limit.clamp(1, MAX_PAGE_LIMIT),
            auto_refresh: AtomicBool::new(auto_refresh),
            state: Mutex::new(TailState::default()),
            in_flight: InFlight::default(),
        }
    }

    pub fn state(&self) -> TailState {
        self.state.lock().clone()
    }

    pub fn newest_sequence(&self) -> Option<Sequence> {
        self.state.lock().newest_sequence
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh.load(Ordering::Acquire)
    }

    /// Switch modes and persist the choice
    pub fn set_auto_refresh(&self, enabled: bool) {
        self.auto_refresh.store(enabled, Ordering::Release);
        if let Err(e) = self.settings.set_bool(&self.settings_key, enabled) {
            warn!(error = %e, "Could not persist auto-refresh setting");
        }
    }

    fn request(&self) -> CursorRequest {
        let mut request = CursorRequest::new().limit(self.limit).filters(self.filters.clone());
        request.entry_type = self.entry_type;
        request
    }

    /// Replace the view with the newest page
    ///
    /// Returns `None` when a refresh is already in flight.
    pub async fn refresh(&self) -> Result<Option<usize>, TailError> {
        let Some(_flight) = self.in_flight.try_begin(CallKind::Refresh) else {
            return Ok(None);
        };

        let page = self.source.page(&self.request()).await?;
        let loaded = page.data.len();

        let mut state = self.state.lock();
        state.newest_sequence = page.meta.newest_sequence;
        state.oldest_sequence = page.meta.oldest_sequence;
        state.has_more = page.meta.has_more;
        state.total = page.meta.total;
        state.entries = page.data;
        state.new_count = 0;
        state.last_error = None;
        Ok(Some(loaded))
    }

    /// Append the next older page
    pub async fn load_more(&self) -> Result<Option<usize>, TailError> {
        let oldest = self.state.lock().oldest_sequence;
        let Some(oldest) = oldest else {
            return self.refresh().await;
        };
        let Some(_flight) = self.in_flight.try_begin(CallKind::LoadMore) else {
            return Ok(None);
        };

        let page = self.source.page(&self.request().before(oldest)).await?;
        let loaded = page.data.len();

        let mut state = self.state.lock();
        // Skip anything a concurrent refresh already brought in
        let floor = state.oldest_sequence.unwrap_or(Sequence::MAX);
        state
            .entries
            .extend(page.data.into_iter().filter(|e| e.sequence < floor));
        state.oldest_sequence = state.entries.last().map(|e| e.sequence);
        state.has_more = page.meta.has_more;
        state.total = page.meta.total;
        Ok(Some(loaded))
    }

    /// Prepend everything newer than the newest known entry
    pub async fn load_new(&self) -> Result<Option<usize>, TailError> {
        let newest = self.state.lock().newest_sequence;
        let Some(newest) = newest else {
            return self.refresh().await;
        };
        let Some(_flight) = self.in_flight.try_begin(CallKind::LoadNew) else {
            return Ok(None);
        };

        // Pages come back newest first; collect until caught up
        let mut fresh: Vec<Entry> = Vec::new();
        let mut cursor = newest;
        let total;
        loop {
            let page = self.source.page(&self.request().after(cursor)).await?;
            let Some(top) = page.meta.newest_sequence else {
                total = page.meta.total;
                break;
            };
            cursor = top;
            let has_more = page.meta.has_more;
            fresh.splice(0..0, page.data);
            if !has_more {
                total = page.meta.total;
                break;
            }
        }
        let loaded = fresh.len();

        let mut state = self.state.lock();
        let ceiling = state.newest_sequence.unwrap_or(0);
        fresh.retain(|e| e.sequence > ceiling);
        if let Some(top) = fresh.first() {
            state.newest_sequence = Some(top.sequence);
        }
        fresh.append(&mut state.entries);
        state.entries = fresh;
        if state.oldest_sequence.is_none() {
            state.oldest_sequence = state.entries.last().map(|e| e.sequence);
        }
        state.total = total;
        state.new_count = 0;
        state.last_error = None;
        Ok(Some(loaded))
    }

    /// Probe for entries beyond the newest known one
    ///
    /// With nothing loaded yet only `latest_sequence` is consulted, and any
    /// stored entry counts as 1.
    pub async fn check_new(&self) -> Result<Option<u64>, TailError> {
        let Some(_flight) = self.in_flight.try_begin(CallKind::Check) else {
            return Ok(None);
        };

        let newest = self.state.lock().newest_sequence;
        let count = match newest {
            Some(after) => self.source.check_new(after, self.entry_type).await?,
            None => match self.source.latest_sequence(self.entry_type).await? {
                Some(_) => 1,
                None => 0,
            },
        };

        self.state.lock().new_count = count;
        Ok(Some(count))
    }

    /// One poll cycle: count-only, or count then load in auto-refresh mode
    ///
    /// Failures are logged and kept in `last_error`; the previous view stays.
    pub async fn tick(&self) {
        let result = async {
            let count = self.check_new().await?.unwrap_or(0);
            if self.auto_refresh() && count > 0 {
                self.load_new().await?;
            }
            Ok::<_, TailError>(())
        }
        .await;

        let mut state = self.state.lock();
        match result {
            Ok(()) => {
                state.last_error = None;
                debug!(new_count = state.new_count, "Live-tail cycle");
            }
            Err(e) => {
                warn!(error = %e, "Live-tail cycle failed, retrying next tick");
                state.last_error = Some(e.to_string());
            }
        }
    }
}
