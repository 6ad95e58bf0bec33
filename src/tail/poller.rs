/*!
 * Tail Poller
 * Drives a consumer's `tick` on a fixed interval until stopped
 */

use super::consumer::TailConsumer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct TailPoller {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TailPoller {
    /// Start polling; the first cycle runs one `interval` after spawn
    pub fn spawn(consumer: Arc<TailConsumer>, interval: Duration) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            info!(interval_ms = interval.as_millis() as u64, "Live-tail polling started");
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // A cancelled in-flight cycle drops without touching state
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = consumer.tick() => {}
                        }
                    }
                }
            }
            debug!("Live-tail polling stopped");
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel polling and wait for the task to exit
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Live-tail poller task ended abnormally");
            }
        }
    }
}

impl Drop for TailPoller {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
