/*!
 * Collector
 * Stamps observations with a sequence and forwards them to the entry store
 *
 * Design: many producers (watchers) offer into a bounded queue without
 * blocking; one worker drains it, so sequence assignment is serialized and
 * persisted order always equals sequence order. Awaited commands travel on a
 * separate channel and carry the number of observations admitted before
 * them; the worker persists exactly that prefix first, so acceptance order
 * equals sequence order across both paths. Storage failures are logged and
 * counted, never returned to the producer.
 */

use super::context::RequestContext;
use crate::core::config::{OverflowPolicy, RecorderConfig};
use crate::core::errors::{RecorderError, RecorderResult, StoreError};
use crate::entries::{EntryType, NewEntry, RequestId, Sequence};
use crate::store::EntryStore;
use flume::{Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A captured observation awaiting a sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entry_type: EntryType,
    pub payload: Value,
    /// Instant the watcher started timing; becomes `createdAt`
    pub started_at: OffsetDateTime,
    pub request_id: Option<RequestId>,
    pub tags: BTreeSet<String>,
}

impl Observation {
    /// New observation stamped now, correlated with the current request
    pub fn new(entry_type: EntryType, payload: Value) -> Self {
        Self {
            entry_type,
            payload,
            started_at: OffsetDateTime::now_utc(),
            request_id: RequestContext::current(),
            tags: BTreeSet::new(),
        }
    }

    /// Use the watcher's start instant as the timing basis
    pub fn at(mut self, started_at: OffsetDateTime) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn with_request_id(mut self, request_id: Option<RequestId>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    fn into_new_entry(self, sequence: Sequence) -> NewEntry {
        NewEntry {
            entry_type: self.entry_type,
            sequence,
            payload: self.payload,
            created_at: self.started_at,
            request_id: self.request_id,
            tags: self.tags,
        }
    }
}

/// Awaited commands; never evicted by the overflow policy
///
/// `after` is the number of observations admitted to the data queue before
/// the command was accepted.
enum Control {
    Immediate {
        observation: Observation,
        after: u64,
        ack: oneshot::Sender<Option<Sequence>>,
    },
    Flush {
        after: u64,
        ack: oneshot::Sender<()>,
    },
}

/// Data queue positions; the lock also orders admissions against eviction
/// and against the worker's positional drain
#[derive(Debug, Default)]
struct Positions {
    admitted: u64,
    /// Admitted observations evicted under `DropOldest`
    evicted: u64,
}

/// Collector statistics for monitoring the observer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub accepted: u64,
    pub persisted: u64,
    pub dropped: u64,
    pub failed: u64,
    pub pending: usize,
    pub last_sequence: Option<Sequence>,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    persisted: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    /// 0 until the first entry is persisted
    last_sequence: AtomicU64,
}

struct Shared {
    data_tx: Sender<Observation>,
    /// Held to evict the oldest pending observation under `DropOldest`
    data_evict: Receiver<Observation>,
    control_tx: Sender<Control>,
    positions: Arc<Mutex<Positions>>,
    overflow: OverflowPolicy,
    enabled: AtomicBool,
    counters: Arc<Counters>,
}

/// Handle shared by every watcher; cheap to clone
#[derive(Clone)]
pub struct Collector {
    shared: Arc<Shared>,
}

impl Collector {
    /// Start the persistence worker and return its handle
    ///
    /// The sequence counter resumes after the highest stored sequence.
    pub async fn spawn<S>(store: Arc<S>, config: &RecorderConfig) -> Self
    where
        S: EntryStore + ?Sized + 'static,
    {
        let next_sequence = match store.latest_sequence(None).await {
            Ok(latest) => latest.map_or(1, |s| s + 1),
            Err(e) => {
                warn!(error = %e, "Could not read latest sequence, starting from 1");
                1
            }
        };

        let (data_tx, data_rx) = flume::bounded(config.queue_capacity);
        let (control_tx, control_rx) = flume::unbounded();
        let counters = Arc::new(Counters::default());
        let positions = Arc::new(Mutex::new(Positions::default()));

        let worker = Worker {
            store,
            data_rx: data_rx.clone(),
            control_rx,
            positions: Arc::clone(&positions),
            received: 0,
            next_sequence,
            counters: Arc::clone(&counters),
        };
        tokio::spawn(worker.run());

        debug!(
            next_sequence,
            capacity = config.queue_capacity,
            overflow = ?config.overflow,
            "Collector started"
        );

        Self {
            shared: Arc::new(Shared {
                data_tx,
                data_evict: data_rx,
                control_tx,
                positions,
                overflow: config.overflow,
                enabled: AtomicBool::new(config.enabled),
                counters,
            }),
        }
    }

    /// Record an observation (fire-and-forget)
    #[inline]
    pub fn collect(&self, entry_type: EntryType, payload: Value) {
        self.offer(Observation::new(entry_type, payload));
    }

    /// Offer a prepared observation; returns false if it was dropped
    pub fn offer(&self, observation: Observation) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let counters = &self.shared.counters;
        let mut positions = self.shared.positions.lock();
        match self.shared.data_tx.try_send(observation) {
            Ok(()) => {
                positions.admitted += 1;
                counters.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(observation)) => match self.shared.overflow {
                OverflowPolicy::DropNewest => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(entry_type = %observation.entry_type, "Collector queue full, dropping newest");
                    false
                }
                OverflowPolicy::DropOldest => {
                    if let Ok(evicted) = self.shared.data_evict.try_recv() {
                        positions.evicted += 1;
                        counters.dropped.fetch_add(1, Ordering::Relaxed);
                        debug!(entry_type = %evicted.entry_type, "Collector queue full, dropping oldest");
                    }
                    match self.shared.data_tx.try_send(observation) {
                        Ok(()) => {
                            positions.admitted += 1;
                            counters.accepted.fetch_add(1, Ordering::Relaxed);
                            true
                        }
                        Err(_) => {
                            counters.dropped.fetch_add(1, Ordering::Relaxed);
                            false
                        }
                    }
                }
            },
            Err(TrySendError::Disconnected(_)) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Collector worker stopped, observation lost");
                false
            }
        }
    }

    /// Record an observation and wait until it is persisted
    ///
    /// Returns the assigned sequence, or `None` if it could not be stored.
    pub async fn collect_immediate(&self, entry_type: EntryType, payload: Value) -> Option<Sequence> {
        self.offer_immediate(Observation::new(entry_type, payload)).await
    }

    pub async fn offer_immediate(&self, observation: Observation) -> Option<Sequence> {
        if !self.is_enabled() {
            return None;
        }
        self.shared.counters.accepted.fetch_add(1, Ordering::Relaxed);

        let (ack, ack_rx) = oneshot::channel();
        let sent = {
            let positions = self.shared.positions.lock();
            self.shared.control_tx.send(Control::Immediate {
                observation,
                after: positions.admitted,
                ack,
            })
        };
        if sent.is_err() {
            self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Collector worker stopped, observation lost");
            return None;
        }
        ack_rx.await.ok().flatten()
    }

    /// Wait until everything offered before this call has been handled
    pub async fn flush(&self) -> RecorderResult<()> {
        let (ack, ack_rx) = oneshot::channel();
        {
            let positions = self.shared.positions.lock();
            self.shared
                .control_tx
                .send(Control::Flush {
                    after: positions.admitted,
                    ack,
                })
                .map_err(|_| RecorderError::CollectorStopped)?;
        }
        ack_rx.await.map_err(|_| RecorderError::CollectorStopped)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Relaxed)
    }

    /// Pause or resume recording at runtime
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CollectorStats {
        let c = &self.shared.counters;
        let last = c.last_sequence.load(Ordering::Acquire);
        CollectorStats {
            accepted: c.accepted.load(Ordering::Relaxed),
            persisted: c.persisted.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            pending: self.shared.data_tx.len(),
            last_sequence: (last > 0).then_some(last),
        }
    }
}

/// Single consumer owning the sequence counter
struct Worker<S: ?Sized> {
    store: Arc<S>,
    data_rx: Receiver<Observation>,
    control_rx: Receiver<Control>,
    positions: Arc<Mutex<Positions>>,
    /// Observations this worker has taken off the data queue
    received: u64,
    next_sequence: Sequence,
    counters: Arc<Counters>,
}

impl<S> Worker<S>
where
    S: EntryStore + ?Sized,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                control = self.control_rx.recv_async() => match control {
                    Ok(Control::Immediate { observation, after, ack }) => {
                        self.drain_until(after).await;
                        let sequence = self.persist(observation).await;
                        let _ = ack.send(sequence);
                    }
                    Ok(Control::Flush { after, ack }) => {
                        self.drain_until(after).await;
                        let _ = ack.send(());
                    }
                    Err(_) => break,
                },
                observation = self.data_rx.recv_async() => match observation {
                    Ok(observation) => {
                        self.received += 1;
                        self.persist(observation).await;
                    }
                    Err(_) => break,
                },
            }
        }

        self.drain_pending().await;
        debug!("Collector worker stopped");
    }

    /// Persist queued observations until the first `after` admitted ones
    /// have all been handled
    async fn drain_until(&mut self, after: u64) {
        loop {
            let next = {
                let positions = self.positions.lock();
                if self.received + positions.evicted >= after {
                    break;
                }
                self.data_rx.try_recv()
            };
            match next {
                Ok(observation) => {
                    self.received += 1;
                    self.persist(observation).await;
                }
                Err(_) => break,
            }
        }
    }

    /// Persist everything already queued
    async fn drain_pending(&mut self) {
        loop {
            match self.data_rx.try_recv() {
                Ok(observation) => {
                    self.received += 1;
                    self.persist(observation).await;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    async fn persist(&mut self, observation: Observation) -> Option<Sequence> {
        let entry_type = observation.entry_type;
        loop {
            let sequence = self.next_sequence;
            match self.store.insert(observation.clone().into_new_entry(sequence)).await {
                Ok(_) => {
                    self.next_sequence = sequence + 1;
                    self.counters.persisted.fetch_add(1, Ordering::Relaxed);
                    self.counters.last_sequence.store(sequence, Ordering::Release);
                    return Some(sequence);
                }
                Err(StoreError::DuplicateSequence(taken)) => {
                    // Another writer holds this sequence; move past it
                    warn!(sequence = taken, "Sequence already stored, advancing");
                    self.next_sequence = taken.max(sequence) + 1;
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(entry_type = %entry_type, error = %e, "Failed to persist entry");
                    return None;
                }
            }
        }
    }
}
