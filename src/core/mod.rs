/*!
 * Core Module
 * Errors, configuration, limits and tracing shared by every subsystem
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod tracer;

pub use config::{OverflowPolicy, RecorderConfig};
pub use errors::*;
pub use tracer::init_tracing;
