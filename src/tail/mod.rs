/*!
 * Live Tail
 * Polling consumer that keeps a view of the newest entries current
 */

mod consumer;
mod poller;
mod settings;
mod source;

pub use consumer::{TailConsumer, TailOptions, TailState};
pub use poller::TailPoller;
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use source::{cursor_query, HttpTailSource, LocalTailSource, TailSource};
