/*!
 * Watchers
 *
 * Each watcher decorates one host capability so every invocation is timed
 * and recorded while the caller observes exactly the original behavior.
 * Hosts expose capabilities through `Facility` slots; a watcher swaps in a
 * decorator once, keyed by the operation's identity, and degrades to a
 * no-op when the facility is absent or the watcher is disabled.
 */

pub mod cache;
pub mod exception;
pub mod facility;
pub mod generic;
pub mod http_client;
pub mod installed;
pub mod instrument;
pub mod job;
pub mod log;
pub mod mail;
pub mod query;
pub mod request;
pub mod schedule;
pub mod view;

pub use cache::{CacheStore, CacheWatcher};
pub use exception::ExceptionReporter;
pub use facility::{Facility, FacilityId, FacilityMap};
pub use generic::OperationWatcher;
pub use http_client::{HttpClientWatcher, HttpTransport, OutboundRequest, OutboundResponse, ReqwestTransport};
pub use installed::InstalledSet;
pub use instrument::{Instrument, Outcome, Settled, Stopwatch};
pub use job::{Job, JobProcessor, JobWatcher};
pub use log::LogWatchLayer;
pub use mail::{Mail, MailWatcher, Mailer};
pub use query::{operation_keyword, QueryExecutor, QueryOutput, QueryWatcher};
pub use request::{RequestWatchLayer, RequestWatchService, REQUEST_ID_HEADER};
pub use schedule::{Schedulable, ScheduleRegistry, ScheduleWatcher};
pub use view::{Renderable, ViewWatcher};
