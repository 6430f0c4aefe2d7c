//! Per-user sliding-window rate limiting.
//!
//! Two windows are checked on every request: a short one that absorbs
//! bursts and a long one that caps sustained traffic. Counters live in
//! memory; restarting the gateway resets them.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use taskpilot_core::store::{RateLimited, RateLimiter};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Map size at which stale users are swept out.
const SWEEP_THRESHOLD: usize = 1024;

pub struct SlidingWindowLimiter {
    per_minute: u32,
    per_hour: u32,
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute,
            per_hour,
            requests: Mutex::new(HashMap::new()),
        }
    }

    fn check_at(&self, user_id: &str, now: Instant) -> Result<(), RateLimited> {
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());

        // Users whose newest request aged past the long window contribute
        // nothing to any future check; sweep them out once the map grows.
        if requests.len() > SWEEP_THRESHOLD {
            requests.retain(|_, window| {
                window
                    .back()
                    .is_some_and(|t| now.duration_since(*t) <= HOUR)
            });
        }

        let window = requests.entry(user_id.to_string()).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) > HOUR {
                window.pop_front();
            } else {
                break;
            }
        }

        let in_hour = window.len() as u32;
        if in_hour >= self.per_hour {
            let oldest = *window.front().unwrap_or(&now);
            return Err(RateLimited {
                limit: self.per_hour,
                window: "hour",
                retry_after_secs: retry_after(oldest, now, HOUR),
            });
        }

        let in_minute = window
            .iter()
            .rev()
            .take_while(|t| now.duration_since(**t) <= MINUTE)
            .count() as u32;
        if in_minute >= self.per_minute {
            let oldest_in_minute = *window
                .iter()
                .rev()
                .take_while(|t| now.duration_since(**t) <= MINUTE)
                .last()
                .unwrap_or(&now);
            return Err(RateLimited {
                limit: self.per_minute,
                window: "minute",
                retry_after_secs: retry_after(oldest_in_minute, now, MINUTE),
            });
        }

        window.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

fn retry_after(oldest: Instant, now: Instant, window: Duration) -> u64 {
    window
        .saturating_sub(now.duration_since(oldest))
        .as_secs()
        .max(1)
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, user_id: &str) -> Result<(), RateLimited> {
        self.check_at(user_id, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_minute_limit() {
        let limiter = SlidingWindowLimiter::new(3, 100);
        let now = Instant::now();
        for _ in 0..3 {
            limiter.check_at("u1", now).unwrap();
        }
        let rejected = limiter.check_at("u1", now).unwrap_err();
        assert_eq!(rejected.window, "minute");
        assert_eq!(rejected.limit, 3);
        assert!(rejected.retry_after_secs >= 1);
    }

    #[test]
    fn minute_window_slides() {
        let limiter = SlidingWindowLimiter::new(2, 100);
        let start = Instant::now();
        limiter.check_at("u1", start).unwrap();
        limiter.check_at("u1", start).unwrap();
        assert!(limiter.check_at("u1", start).is_err());

        // 61 seconds later the burst has aged out.
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at("u1", later).is_ok());
    }

    #[test]
    fn hour_limit_caps_sustained_traffic() {
        let limiter = SlidingWindowLimiter::new(100, 5);
        let start = Instant::now();
        // Spread across the hour so the minute window never trips.
        for i in 0..5 {
            limiter
                .check_at("u1", start + Duration::from_secs(i * 120))
                .unwrap();
        }
        let rejected = limiter
            .check_at("u1", start + Duration::from_secs(700))
            .unwrap_err();
        assert_eq!(rejected.window, "hour");
    }

    #[test]
    fn stale_users_are_swept_once_the_map_grows() {
        let limiter = SlidingWindowLimiter::new(100, 100);
        let start = Instant::now();
        for i in 0..=SWEEP_THRESHOLD {
            limiter.check_at(&format!("u{i}"), start).unwrap();
        }
        assert_eq!(limiter.tracked_users(), SWEEP_THRESHOLD + 1);

        // Two hours later every tracked user is stale; the next check
        // sweeps them all and tracks only the caller.
        let later = start + Duration::from_secs(7200);
        limiter.check_at("fresh", later).unwrap();
        assert_eq!(limiter.tracked_users(), 1);
    }

    #[test]
    fn users_are_limited_independently() {
        let limiter = SlidingWindowLimiter::new(1, 100);
        let now = Instant::now();
        limiter.check_at("u1", now).unwrap();
        assert!(limiter.check_at("u1", now).is_err());
        assert!(limiter.check_at("u2", now).is_ok());
    }
}
