/*!
 * Demo Configuration
 * Environment-driven settings for the conformance demo binary
 */

use super::driver::ConformanceDriver;
use crate::core::errors::{LockError, LockResult};
use crate::core::sync::{SpinConfig, SpinStrategy};
use std::str::FromStr;

/// Settings read by `mcs-demo`
///
/// Environment variables:
/// - `MCS_DEMO_THREADS`: worker threads (default: 100)
/// - `MCS_DEMO_ITERATIONS`: critical sections per worker (default: 100)
/// - `MCS_DEMO_LEN`: shared array length (default: 1000)
/// - `MCS_DEMO_YIELD`: yield inside each section (default: false)
/// - `MCS_SPIN_STRATEGY`: spin | yield | adaptive (default: adaptive)
/// - `MCS_DEMO_JSON`: print reports as JSON (default: false)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub driver: ConformanceDriver,
    pub spin: SpinConfig,
    pub json: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            driver: ConformanceDriver::default(),
            spin: SpinConfig::default(),
            json: false,
        }
    }
}

impl DemoConfig {
    /// Read from the process environment
    pub fn from_env() -> LockResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LockResult<Self> {
        let defaults = Self::default();

        let driver = ConformanceDriver {
            workers: parse_or(&lookup, "MCS_DEMO_THREADS", defaults.driver.workers)?,
            iterations: parse_or(&lookup, "MCS_DEMO_ITERATIONS", defaults.driver.iterations)?,
            len: parse_or(&lookup, "MCS_DEMO_LEN", defaults.driver.len)?,
            yield_midway: flag(&lookup, "MCS_DEMO_YIELD"),
        };
        if driver.workers == 0 {
            return Err(LockError::Configuration(
                "MCS_DEMO_THREADS must be at least 1".into(),
            ));
        }

        let strategy: SpinStrategy =
            parse_or(&lookup, "MCS_SPIN_STRATEGY", defaults.spin.strategy)?;

        Ok(Self {
            driver,
            spin: defaults.spin.with_strategy(strategy),
            json: flag(&lookup, "MCS_DEMO_JSON"),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> LockResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LockError::Configuration(format!("{}={:?}: {}", key, raw, e))),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
