//! Logging setup and activation tracing helpers.

mod logging;
mod spans;

pub use logging::{init_tracing, LogFormat};
pub use spans::{ActivationSpanAttributes, SpanTimer};
