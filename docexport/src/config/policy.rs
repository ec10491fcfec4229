//! Poll policy with exponential backoff and optional jitter.
//!
//! Delays grow by `backoff_multiplier` from `initial_delay_ms` and are clamped
//! to `max_delay_ms`. Jitter only ever lowers a delay, so the clamp holds after
//! jitter too.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

/// Jitter strategy to spread concurrent pollers apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

impl JitterStrategy {
    /// Applies the jitter to a delay in milliseconds.
    #[must_use]
    pub fn apply(self, delay_ms: u64) -> u64 {
        match self {
            Self::None => delay_ms,
            Self::Full => {
                if delay_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay_ms)
                }
            }
            Self::Equal => {
                let half = delay_ms / 2;
                if half == 0 {
                    delay_ms
                } else {
                    (delay_ms - half) + rand::thread_rng().gen_range(0..=half)
                }
            }
        }
    }
}

impl FromStr for JitterStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "full" => Ok(Self::Full),
            "equal" => Ok(Self::Equal),
            other => Err(format!("unknown jitter strategy '{other}'")),
        }
    }
}

/// Bounds on how long and how often an export job is polled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of status queries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Delay before the second status query, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Growth factor applied to the delay after every wait.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Total polling budget in milliseconds.
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter: JitterStrategy,
}

fn default_max_attempts() -> usize {
    30
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_overall_timeout_ms() -> u64 {
    60_000
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            overall_timeout_ms: default_overall_timeout_ms(),
            jitter: JitterStrategy::None,
        }
    }
}

impl PollPolicy {
    /// Creates a policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the overall timeout.
    #[must_use]
    pub fn with_overall_timeout_ms(mut self, timeout: u64) -> Self {
        self.overall_timeout_ms = timeout;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Gets the overall timeout as Duration.
    #[must_use]
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    /// Checks the policy invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::invalid("initial_delay_ms", "must be greater than 0"));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid("backoff_multiplier", "must be at least 1"));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::invalid(
                "max_delay_ms",
                "must not be smaller than initial_delay_ms",
            ));
        }
        if self.overall_timeout_ms == 0 {
            return Err(ConfigError::invalid("overall_timeout_ms", "must be greater than 0"));
        }
        Ok(())
    }

    /// The delay that follows `delay_ms`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn next_delay_ms(&self, delay_ms: u64) -> u64 {
        let grown = (delay_ms as f64 * self.backoff_multiplier).min(self.max_delay_ms as f64);
        (grown as u64).min(self.max_delay_ms)
    }

    /// Returns the sequence of inter-attempt delays.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        Backoff {
            current_ms: self.initial_delay_ms.min(self.max_delay_ms),
            policy: self.clone(),
        }
    }
}

/// Infinite iterator over the delays between status queries.
#[derive(Debug, Clone)]
pub struct Backoff {
    current_ms: u64,
    policy: PollPolicy,
}

impl Backoff {
    /// Returns the next delay and advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current_ms;
        self.current_ms = self.policy.next_delay_ms(base);
        Duration::from_millis(self.policy.jitter.apply(base))
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_poll_policy_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.initial_delay_ms, 500);
        assert_eq!(policy.max_delay_ms, 5000);
        assert_eq!(policy.jitter, JitterStrategy::None);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = PollPolicy::new()
            .with_initial_delay_ms(100)
            .with_backoff_multiplier(2.0)
            .with_max_delay_ms(1000);

        let delays: Vec<u128> = policy.backoff().take(7).map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000, 1000]);
    }

    #[test]
    fn test_backoff_constant_with_unit_multiplier() {
        let policy = PollPolicy::new()
            .with_initial_delay_ms(250)
            .with_backoff_multiplier(1.0)
            .with_max_delay_ms(1000);

        assert!(policy.backoff().take(5).all(|d| d == Duration::from_millis(250)));
    }

    #[test]
    fn test_backoff_fractional_multiplier() {
        let policy = PollPolicy::new()
            .with_initial_delay_ms(500)
            .with_backoff_multiplier(1.5)
            .with_max_delay_ms(5000);

        let delays: Vec<u128> = policy.backoff().take(4).map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![500, 750, 1125, 1687]);
    }

    #[test]
    fn test_jitter_never_exceeds_cap() {
        for jitter in [JitterStrategy::Full, JitterStrategy::Equal] {
            let policy = PollPolicy::new()
                .with_initial_delay_ms(100)
                .with_backoff_multiplier(3.0)
                .with_max_delay_ms(700)
                .with_jitter(jitter);

            assert!(policy
                .backoff()
                .take(50)
                .all(|d| d <= Duration::from_millis(700)));
        }
    }

    #[test]
    fn test_equal_jitter_keeps_lower_half() {
        for _ in 0..20 {
            let delay = JitterStrategy::Equal.apply(100);
            assert!((50..=100).contains(&delay));
        }
    }

    #[test]
    fn test_validate_rejects_broken_policies() {
        assert!(PollPolicy::new().with_max_attempts(0).validate().is_err());
        assert!(PollPolicy::new().with_initial_delay_ms(0).validate().is_err());
        assert!(PollPolicy::new().with_backoff_multiplier(0.5).validate().is_err());
        assert!(PollPolicy::new().with_backoff_multiplier(f64::NAN).validate().is_err());
        assert!(PollPolicy::new()
            .with_initial_delay_ms(2000)
            .with_max_delay_ms(1000)
            .validate()
            .is_err());
        assert!(PollPolicy::new().with_overall_timeout_ms(0).validate().is_err());
    }

    #[test]
    fn test_jitter_from_str() {
        assert_eq!("Full".parse::<JitterStrategy>(), Ok(JitterStrategy::Full));
        assert_eq!(" none ".parse::<JitterStrategy>(), Ok(JitterStrategy::None));
        assert!("random".parse::<JitterStrategy>().is_err());
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: PollPolicy = serde_json::from_value(serde_json::json!({
            "max_attempts": 5,
            "jitter": "equal"
        }))
        .unwrap();

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay_ms, 500);
        assert_eq!(policy.jitter, JitterStrategy::Equal);
    }
}
