/*!
 * Spin Configuration
 *
 * Runtime configuration for how queue waiters burn time while spinning
 */

use crate::core::errors::{LockError, LockResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Spin strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinStrategy {
    /// Pure busy-wait with the CPU spin hint (lowest latency, dedicated cores)
    Spin,
    /// Yield the time slice on every poll (oversubscribed machines)
    Yield,
    /// Exponential spin bursts, then yield
    Adaptive,
}

impl FromStr for SpinStrategy {
    type Err = LockError;

    fn from_str(s: &str) -> LockResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spin" => Ok(SpinStrategy::Spin),
            "yield" => Ok(SpinStrategy::Yield),
            "adaptive" | "auto" => Ok(SpinStrategy::Adaptive),
            other => Err(LockError::Configuration(format!(
                "unknown spin strategy '{}', expected spin|yield|adaptive",
                other
            ))),
        }
    }
}

/// Spin configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinConfig {
    /// Preferred strategy
    pub strategy: SpinStrategy,
    /// Spin rounds before the adaptive strategy starts yielding
    pub spin_limit: u32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            strategy: SpinStrategy::Adaptive,
            spin_limit: 6,
        }
    }
}

impl SpinConfig {
    /// Configuration for dedicated cores where handoff latency dominates
    pub const fn low_latency() -> Self {
        Self {
            strategy: SpinStrategy::Adaptive,
            spin_limit: 10,
        }
    }

    /// Configuration for more runnable threads than cores
    pub const fn oversubscribed() -> Self {
        Self {
            strategy: SpinStrategy::Yield,
            spin_limit: 0,
        }
    }

    /// Same configuration with a different strategy
    pub const fn with_strategy(mut self, strategy: SpinStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!("spin".parse::<SpinStrategy>().unwrap(), SpinStrategy::Spin);
        assert_eq!(" Yield ".parse::<SpinStrategy>().unwrap(), SpinStrategy::Yield);
        assert_eq!("auto".parse::<SpinStrategy>().unwrap(), SpinStrategy::Adaptive);
        assert!(matches!(
            "park".parse::<SpinStrategy>(),
            Err(LockError::Configuration(_))
        ));
    }

    #[test]
    fn test_presets() {
        assert_eq!(SpinConfig::default().strategy, SpinStrategy::Adaptive);
        assert_eq!(SpinConfig::oversubscribed().strategy, SpinStrategy::Yield);
        assert_eq!(
            SpinConfig::low_latency().with_strategy(SpinStrategy::Spin).strategy,
            SpinStrategy::Spin
        );
    }
}
