//! Observability module
//!
//! Logging, metrics, and the structured event stream the CLI host writes
//! timer outputs to.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EmitterSink, Event, EventEmitter};
pub use logging::init_logging;
pub use metrics::init_metrics;
