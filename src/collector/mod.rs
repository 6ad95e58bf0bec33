/*!
 * Collector
 * Sequence assignment, request correlation and hand-off to storage
 */

#[allow(clippy::module_inception)]
mod collector;
mod context;

pub use collector::{Collector, CollectorStats, Observation};
pub use context::RequestContext;
