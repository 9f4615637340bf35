/*!
 * Monitoring
 * Structured logging setup and run spans
 */

mod tracer;

pub use tracer::{init_tracing, span_run, RunSpan};
