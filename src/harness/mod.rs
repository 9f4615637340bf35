/*!
 * Conformance Harness
 *
 * Drives any `RawLock` with many workers mutating a shared array, then checks
 * after the fact that no two critical sections overlapped. Running the same
 * workload unguarded is the negative control that shows the check can fail.
 */

mod config;
mod driver;
mod shared;

pub use config::DemoConfig;
pub use driver::{ConformanceDriver, ConformanceReport};
pub use shared::{SharedArray, SCALE_FACTORS};
