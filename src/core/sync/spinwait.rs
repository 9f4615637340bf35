/*!
 * Spin-Wait Back-off
 *
 * Every waiter in the queue polls a flag only it reads, so back-off here is
 * not about easing contention on a shared line. It exists to stay responsive
 * when there are more runnable threads than cores: the thread we wait on may
 * need our time slice to make progress.
 *
 * # Phases (adaptive strategy)
 *
 * 1. **Spin phase** (first `spin_limit` rounds): `2^round` spin-loop hints
 * 2. **Yield phase** (afterwards): `yield_now()` on every poll
 *
 * There is deliberately no sleep phase; a queue waiter never hands itself to
 * the OS scheduler for longer than a yield.
 */

use super::config::{SpinConfig, SpinStrategy};
use std::hint;
use std::thread;

/// Upper bound on the exponent of a single spin burst
const MAX_SPIN_SHIFT: u32 = 10;

/// Stateful back-off for one wait loop
///
/// Create one per wait; `snooze()` escalates with every call.
#[derive(Debug)]
pub struct Backoff {
    config: SpinConfig,
    round: u32,
}

impl Backoff {
    /// Create a back-off following `config`
    #[inline]
    pub fn new(config: SpinConfig) -> Self {
        Self { config, round: 0 }
    }

    /// Burn one round of waiting
    #[inline]
    pub fn snooze(&mut self) {
        match self.config.strategy {
            SpinStrategy::Spin => {
                Self::burst(self.round.min(self.config.spin_limit));
            }
            SpinStrategy::Yield => thread::yield_now(),
            SpinStrategy::Adaptive => {
                if self.round < self.config.spin_limit {
                    Self::burst(self.round);
                } else {
                    thread::yield_now();
                }
            }
        }
        self.round = self.round.saturating_add(1);
    }

    /// Snooze until `done` returns true
    #[inline]
    pub fn wait_until(&mut self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.snooze();
        }
    }

    /// Whether the adaptive spin phase is over
    #[cfg(test)]
    fn is_yielding(&self) -> bool {
        match self.config.strategy {
            SpinStrategy::Spin => false,
            SpinStrategy::Yield => true,
            SpinStrategy::Adaptive => self.round >= self.config.spin_limit,
        }
    }

    #[cfg(test)]
    fn rounds(&self) -> u32 {
        self.round
    }

    #[inline(always)]
    fn burst(shift: u32) {
        for _ in 0..(1u32 << shift.min(MAX_SPIN_SHIFT)) {
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_adaptive_escalates_to_yield() {
        let mut backoff = Backoff::new(SpinConfig {
            strategy: SpinStrategy::Adaptive,
            spin_limit: 3,
        });

        for _ in 0..3 {
            assert!(!backoff.is_yielding());
            backoff.snooze();
        }
        assert!(backoff.is_yielding());
        assert_eq!(backoff.rounds(), 3);
    }

    #[test]
    fn test_spin_never_yields() {
        let mut backoff = Backoff::new(SpinConfig {
            strategy: SpinStrategy::Spin,
            spin_limit: 64,
        });
        for _ in 0..100 {
            backoff.snooze();
        }
        assert!(!backoff.is_yielding());
    }

    #[test]
    fn test_wait_until_observes_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = {
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                flag.store(true, Ordering::Release);
            })
        };

        let mut backoff = Backoff::new(SpinConfig::default());
        backoff.wait_until(|| flag.load(Ordering::Acquire));
        assert!(backoff.rounds() > 0);

        setter.join().unwrap();
    }
}
