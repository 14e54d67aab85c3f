//! Per-object exponential backoff for failed reconciliations.
//!
//! kube's controller runtime requeues whatever `Action` the error policy hands
//! back, so the growing delay lives here: each object has its own attempt
//! counter, bumped on every failure and cleared on the next success.

use std::time::Duration;

use dashmap::DashMap;
use kube::runtime::reflector::ObjectRef;
use rand::Rng;

use crate::crd::Appoperator;

/// Backoff timing for failed reconciliations
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound on any delay
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failure
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Un-jittered delay for the given 1-based failure count, capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        self.capped(secs)
    }

    /// Convert seconds to a Duration no larger than `max_delay`
    ///
    /// f64 seconds can exceed what Duration represents (or be NaN), so any
    /// value that fails to convert falls back to the cap.
    fn capped(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs)
            .map(|d| d.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

/// Tracks consecutive failures per Appoperator
#[derive(Debug, Default)]
pub struct Backoff {
    config: BackoffConfig,
    attempts: DashMap<ObjectRef<Appoperator>, u32>,
}

impl Backoff {
    /// Create a tracker with the given timing
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: DashMap::new(),
        }
    }

    /// Record a failure and return how long to wait before retrying
    ///
    /// Jitter of 0.5x to 1.5x spreads retries of objects that failed together,
    /// and the result never exceeds `max_delay`.
    pub fn next_delay(&self, key: &ObjectRef<Appoperator>) -> Duration {
        let attempt = {
            let mut entry = self.attempts.entry(key.clone()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        let base = self.config.delay_for_attempt(attempt);
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        self.config.capped(base.as_secs_f64() * jitter)
    }

    /// Forget failures for an object after it reconciles cleanly
    pub fn reset(&self, key: &ObjectRef<Appoperator>) {
        self.attempts.remove(key);
    }

    /// Consecutive failures recorded for an object
    pub fn attempts(&self, key: &ObjectRef<Appoperator>) -> u32 {
        self.attempts.get(key).map(|a| *a).unwrap_or(0)
    }
}
