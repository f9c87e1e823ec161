//! Retry classification and exponential backoff.
//!
//! Every failed attempt of the request pipeline is classified as
//! [`FailureClass::Retryable`] or [`FailureClass::Fatal`]. Retryable failures
//! are retried with an exponentially growing, optionally jittered delay until
//! the configured number of retries is exhausted.
//!
//! # Example
//!
//! ```rust
//! use exact_online::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig {
//!     base_delay: Duration::from_millis(500),
//!     max_delay: Duration::from_secs(30),
//!     exponential_base: 2.0,
//!     jitter: false,
//!     ..RetryConfig::default()
//! };
//!
//! assert_eq!(config.delay_for_attempt(1), Duration::from_millis(500));
//! assert_eq!(config.delay_for_attempt(4), Duration::from_secs(4));
//! ```

use crate::error::ConfigError;
use std::time::Duration;

/// Backoff parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub exponential_base: f64,
    /// Whether to multiply each delay by a uniform random factor in `[0, 1]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Returns the un-jittered delay for the given 1-indexed attempt:
    /// `min(max_delay, base_delay * exponential_base^(attempt - 1))`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Returns the delay to sleep before the given attempt, with jitter applied
    /// when enabled.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.jitter {
            delay.mul_f64(rand::random::<f64>())
        } else {
            delay
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(ConfigError::InvalidRetryConfig {
                reason: format!(
                    "exponential_base must be at least 1.0, got {}",
                    self.exponential_base
                ),
            });
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::InvalidRetryConfig {
                reason: "max_delay must not be smaller than base_delay".to_string(),
            });
        }
        Ok(())
    }
}

/// Whether and how failed requests are retried.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// Surface the first failure immediately, whatever its classification.
    None,
    /// Retry retryable failures with exponential backoff.
    Backoff(RetryConfig),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Backoff(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Returns the total number of attempts an operation may make.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Backoff(config) => config.max_retries.saturating_add(1),
        }
    }

    /// Validates the policy parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRetryConfig`] if the backoff parameters
    /// are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::None => Ok(()),
            Self::Backoff(config) => config.validate(),
        }
    }
}

/// Classification of a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient; another attempt may succeed.
    Retryable,
    /// Permanent; retrying cannot help.
    Fatal,
}

/// Classifies a non-success HTTP status code.
///
/// 5xx and 429 are retryable. Every other status, including 413 and 414
/// size-limit rejections, is fatal.
#[must_use]
pub const fn classify_status(code: u16) -> FailureClass {
    match code {
        429 | 500..=599 => FailureClass::Retryable,
        _ => FailureClass::Fatal,
    }
}

/// Classifies a transport-level error.
#[must_use]
pub fn classify_network(error: &reqwest::Error) -> FailureClass {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        FailureClass::Retryable
    } else {
        FailureClass::Fatal
    }
}

/// Per-operation retry bookkeeping.
///
/// Created when a logical operation starts and dropped once it reaches a
/// terminal outcome.
#[derive(Debug)]
pub struct RetryContext<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
    elapsed_delay: Duration,
    last_failure: Option<FailureClass>,
}

impl<'a> RetryContext<'a> {
    /// Starts a new context for one logical operation.
    #[must_use]
    pub const fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            elapsed_delay: Duration::ZERO,
            last_failure: None,
        }
    }

    /// Marks the start of the next attempt and returns its 1-indexed number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Returns the number of attempts made so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Returns the total time spent sleeping between attempts.
    #[must_use]
    pub const fn elapsed_delay(&self) -> Duration {
        self.elapsed_delay
    }

    /// Returns the classification of the most recent failure.
    #[must_use]
    pub const fn last_failure(&self) -> Option<FailureClass> {
        self.last_failure
    }

    /// Records a failed attempt and returns the delay before the next one, or
    /// `None` if the failure must be surfaced.
    pub fn next_delay(&mut self, class: FailureClass) -> Option<Duration> {
        self.next_delay_after(class, None)
    }

    /// Like [`next_delay`](Self::next_delay), honoring a server-requested
    /// wait such as `Retry-After`.
    ///
    /// The delay is the longer of the backoff and the requested wait, capped
    /// at `max_delay`.
    pub fn next_delay_after(
        &mut self,
        class: FailureClass,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        self.last_failure = Some(class);
        let RetryPolicy::Backoff(config) = self.policy else {
            return None;
        };
        if class == FailureClass::Fatal || self.attempt >= self.policy.max_attempts() {
            return None;
        }
        let backoff = config.backoff(self.attempt);
        let delay = retry_after
            .map_or(backoff, |requested| requested.max(backoff))
            .min(config.max_delay);
        self.elapsed_delay += delay;
        Some(delay)
    }
}
