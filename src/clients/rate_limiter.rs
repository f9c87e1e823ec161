//! Per-division rate limiting.
//!
//! Exact Online allows a fixed number of calls per minute and per day for each
//! division, and forbids parallel requests to the same division. The
//! [`RateLimiter`] enforces both:
//!
//! - [`RateLimiter::admit`] queues callers in FIFO order behind a
//!   per-division gate, so at most one request per division is in flight.
//!   Once at the head of the queue it suspends until both windows have a
//!   call left, then decrements the local estimate.
//! - [`RateLimiter::record`] overwrites the estimate with the authoritative
//!   values from the response headers.
//!
//! Responses without rate limit headers leave the optimistic local estimate
//! in place.

use crate::clients::http_response::RateLimitHeaders;
use crate::config::Division;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

fn minute() -> ChronoDuration {
    ChronoDuration::seconds(60)
}

/// The tracked call budget of one division.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateBudget {
    /// The division this budget belongs to.
    pub division: Division,
    /// Calls allowed per minute.
    pub minutely_limit: u32,
    /// Calls left in the current minute.
    pub minutely_remaining: u32,
    /// When the minute window resets, if known.
    pub minutely_reset: Option<DateTime<Utc>>,
    /// Calls allowed per day, if reported.
    pub daily_limit: Option<u32>,
    /// Calls left today, if reported.
    pub daily_remaining: Option<u32>,
    /// When the day window resets, if known.
    pub daily_reset: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Window {
    Minute,
    Day,
}

impl RateBudget {
    fn new(division: Division, minutely_limit: u32) -> Self {
        Self {
            division,
            minutely_limit,
            minutely_remaining: minutely_limit,
            minutely_reset: None,
            daily_limit: None,
            daily_remaining: None,
            daily_reset: None,
        }
    }

    /// Returns `true` if a call can be made now in both windows.
    #[must_use]
    pub fn has_capacity(&self, now: DateTime<Utc>) -> bool {
        self.exhausted(now).is_none()
    }

    /// Returns the exhausted window and how long until it resets.
    fn exhausted(&self, now: DateTime<Utc>) -> Option<(Window, Duration)> {
        if self.minutely_remaining == 0 {
            let reset = self.minutely_reset.unwrap_or(now + minute());
            if reset > now {
                return Some((Window::Minute, until(now, reset)));
            }
        }
        if self.daily_remaining == Some(0) {
            let reset = self.daily_reset.unwrap_or_else(|| next_midnight(now));
            if reset > now {
                return Some((Window::Day, until(now, reset)));
            }
        }
        None
    }

    fn roll_over(&mut self, window: Window) {
        match window {
            Window::Minute => {
                self.minutely_remaining = self.minutely_limit;
                self.minutely_reset = None;
            }
            Window::Day => {
                self.daily_remaining = self.daily_limit;
                self.daily_reset = None;
            }
        }
    }

    fn consume(&mut self, now: DateTime<Utc>) {
        if self.minutely_reset.map_or(true, |reset| reset <= now) {
            if self.minutely_reset.is_some() {
                self.minutely_remaining = self.minutely_limit;
            }
            self.minutely_reset = Some(now + minute());
        }
        if self.daily_reset.is_some_and(|reset| reset <= now) {
            self.roll_over(Window::Day);
        }
        self.minutely_remaining = self.minutely_remaining.saturating_sub(1);
        self.daily_remaining = self.daily_remaining.map(|r| r.saturating_sub(1));
    }

    fn apply(&mut self, headers: &RateLimitHeaders) {
        if let Some(limit) = headers.minutely_limit {
            self.minutely_limit = limit;
        }
        if let Some(remaining) = headers.minutely_remaining {
            self.minutely_remaining = remaining;
        }
        if let Some(reset) = headers.minutely_reset {
            self.minutely_reset = Some(reset);
        }
        if let Some(limit) = headers.daily_limit {
            self.daily_limit = Some(limit);
        }
        if let Some(remaining) = headers.daily_remaining {
            self.daily_remaining = Some(remaining);
        }
        if let Some(reset) = headers.daily_reset {
            self.daily_reset = Some(reset);
        }
    }
}

fn until(now: DateTime<Utc>, reset: DateTime<Utc>) -> Duration {
    (reset - now).to_std().unwrap_or(Duration::ZERO)
}

fn next_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map_or(now + minute(), |midnight| Utc.from_utc_datetime(&midnight))
}

#[derive(Debug)]
struct Partition {
    gate: Arc<AsyncMutex<()>>,
    budget: Mutex<RateBudget>,
}

/// Proof of admission for one request to a division.
///
/// The division's gate stays closed until the permit is dropped.
#[derive(Debug)]
pub struct AdmitPermit {
    division: Division,
    _gate: OwnedMutexGuard<()>,
}

impl AdmitPermit {
    /// Returns the division this permit admits a request to.
    #[must_use]
    pub const fn division(&self) -> Division {
        self.division
    }
}

/// Tracks call budgets and serializes requests per division.
///
/// # Example
///
/// ```rust
/// use exact_online::clients::RateLimiter;
/// use exact_online::Division;
///
/// # tokio_test::block_on(async {
/// let limiter = RateLimiter::new(60);
/// let division = Division::new(1).unwrap();
///
/// let permit = limiter.admit(division).await;
/// assert_eq!(limiter.budget(division).unwrap().minutely_remaining, 59);
/// drop(permit);
/// # });
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    minutely_limit: u32,
    partitions: Mutex<HashMap<Division, Arc<Partition>>>,
}

// Verify RateLimiter is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RateLimiter>();
};

impl RateLimiter {
    /// Creates a limiter that assumes `minutely_limit` calls per minute until
    /// headers report otherwise.
    #[must_use]
    pub fn new(minutely_limit: u32) -> Self {
        Self {
            minutely_limit: minutely_limit.max(1),
            partitions: Mutex::new(HashMap::new()),
        }
    }

    fn partition(&self, division: Division) -> Arc<Partition> {
        let mut partitions = self
            .partitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(partitions.entry(division).or_insert_with(|| {
            Arc::new(Partition {
                gate: Arc::new(AsyncMutex::new(())),
                budget: Mutex::new(RateBudget::new(division, self.minutely_limit)),
            })
        }))
    }

    /// Waits for this caller's turn and for budget in both windows, then
    /// consumes one call from the local estimate.
    ///
    /// Callers are admitted in FIFO order. Dropping the returned future before
    /// admission leaves the queue without side effects.
    pub async fn admit(&self, division: Division) -> AdmitPermit {
        let partition = self.partition(division);
        let gate = Arc::clone(&partition.gate).lock_owned().await;

        loop {
            let exhausted = lock(&partition.budget).exhausted(Utc::now());
            let Some((window, wait)) = exhausted else {
                break;
            };
            tracing::debug!(
                division = %division,
                window = ?window,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Rate limit reached, waiting for window reset"
            );
            tokio::time::sleep(wait).await;
            lock(&partition.budget).roll_over(window);
        }

        lock(&partition.budget).consume(Utc::now());
        AdmitPermit {
            division,
            _gate: gate,
        }
    }

    /// Overwrites the tracked budget with values reported by the API.
    pub fn record(&self, division: Division, headers: &RateLimitHeaders) {
        if headers.is_empty() {
            return;
        }
        let partition = self.partition(division);
        lock(&partition.budget).apply(headers);
    }

    /// Returns the tracked budget of a division, if it has been used.
    #[must_use]
    pub fn budget(&self, division: Division) -> Option<RateBudget> {
        let partitions = self
            .partitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        partitions
            .get(&division)
            .map(|partition| *lock(&partition.budget))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn division(code: u32) -> Division {
        Division::new(code).unwrap()
    }

    #[tokio::test]
    async fn test_admit_decrements_estimate() {
        let limiter = RateLimiter::new(60);
        drop(limiter.admit(division(1)).await);
        drop(limiter.admit(division(1)).await);

        let budget = limiter.budget(division(1)).unwrap();
        assert_eq!(budget.minutely_remaining, 58);
        assert!(budget.minutely_reset.is_some());
        assert!(limiter.budget(division(2)).is_none());
    }

    #[tokio::test]
    async fn test_record_overwrites_estimate() {
        let limiter = RateLimiter::new(60);
        drop(limiter.admit(division(1)).await);

        limiter.record(
            division(1),
            &RateLimitHeaders {
                minutely_limit: Some(100),
                minutely_remaining: Some(42),
                daily_remaining: Some(4000),
                ..RateLimitHeaders::default()
            },
        );

        let budget = limiter.budget(division(1)).unwrap();
        assert_eq!(budget.minutely_limit, 100);
        assert_eq!(budget.minutely_remaining, 42);
        assert_eq!(budget.daily_remaining, Some(4000));
    }

    #[tokio::test]
    async fn test_empty_headers_keep_local_estimate() {
        let limiter = RateLimiter::new(60);
        drop(limiter.admit(division(1)).await);
        limiter.record(division(1), &RateLimitHeaders::default());

        assert_eq!(limiter.budget(division(1)).unwrap().minutely_remaining, 59);
    }

    #[test]
    fn test_exhausted_budget_waits_until_reset() {
        let now = Utc::now();
        let mut budget = RateBudget::new(division(1), 60);
        budget.minutely_remaining = 0;
        budget.minutely_reset = Some(now + ChronoDuration::seconds(12));

        let (window, wait) = budget.exhausted(now).unwrap();
        assert_eq!(window, Window::Minute);
        assert_eq!(wait, Duration::from_secs(12));
        assert!(!budget.has_capacity(now));
    }

    #[test]
    fn test_passed_reset_means_capacity() {
        let now = Utc::now();
        let mut budget = RateBudget::new(division(1), 60);
        budget.minutely_remaining = 0;
        budget.minutely_reset = Some(now - ChronoDuration::seconds(1));
        assert!(budget.has_capacity(now));

        budget.consume(now);
        assert_eq!(budget.minutely_remaining, 59);
        assert_eq!(budget.minutely_reset, Some(now + minute()));
    }

    #[test]
    fn test_daily_window_is_checked() {
        let now = Utc::now();
        let mut budget = RateBudget::new(division(1), 60);
        budget.daily_limit = Some(5000);
        budget.daily_remaining = Some(0);
        budget.daily_reset = Some(now + ChronoDuration::hours(3));

        let (window, wait) = budget.exhausted(now).unwrap();
        assert_eq!(window, Window::Day);
        assert_eq!(wait, Duration::from_secs(3 * 3600));

        budget.roll_over(Window::Day);
        assert_eq!(budget.daily_remaining, Some(5000));
    }
}
