//! Observability for the job: structured logging with tracing spans.

pub mod logging;

pub use logging::{init_default_logging, init_logging, level_from_verbosity, LogFormat};

// Span macros for structured logging
pub use logging::{item_span, populate_span};
