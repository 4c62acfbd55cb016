use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Outcome of a rate-limit check: either the caller may proceed (and must
/// call [`RateLimiter::release`] when the stream ends), or it must wait.
#[derive(Debug, Eq, PartialEq)]
pub enum Admission {
    Proceed,
    Wait { retry_after: Duration },
}

struct IpState {
    active: VecDeque<Instant>,
    last_request: Option<Instant>,
}

/// Per-IP sliding-window limiter: at most `max_concurrent` in-flight streams
/// per address, with a minimum gap between the start of consecutive
/// requests. Ported from this system's IP-keyed request tracker.
pub struct RateLimiter {
    max_concurrent: usize,
    window: Duration,
    min_gap: Duration,
    by_ip: DashMap<String, Mutex<IpState>>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, window: Duration, min_gap: Duration) -> Self {
        RateLimiter {
            max_concurrent,
            window,
            min_gap,
            by_ip: DashMap::new(),
        }
    }

    /// Defaults matching the 2-per-60s-window, 5s-gap policy this limiter
    /// was adapted from.
    pub fn with_default_policy() -> Self {
        Self::new(2, Duration::from_secs(60), Duration::from_secs(5))
    }

    pub fn check(&self, ip: &str) -> Admission {
        let now = Instant::now();
        let entry = self
            .by_ip
            .entry(ip.to_string())
            .or_insert_with(|| {
                Mutex::new(IpState {
                    active: VecDeque::new(),
                    last_request: None,
                })
            });
        let mut state = entry.lock().unwrap();

        while let Some(&front) = state.active.front() {
            if now.duration_since(front) >= self.window {
                state.active.pop_front();
            } else {
                break;
            }
        }

        if let Some(last) = state.last_request {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_gap {
                return Admission::Wait {
                    retry_after: self.min_gap - elapsed,
                };
            }
        }

        if state.active.len() >= self.max_concurrent {
            return Admission::Wait {
                retry_after: self.window,
            };
        }

        state.active.push_back(now);
        state.last_request = Some(now);
        Admission::Proceed
    }

    /// Call when a stream for `ip` ends, freeing its concurrency slot.
    pub fn release(&self, ip: &str) {
        if let Some(entry) = self.by_ip.get(ip) {
            let mut state = entry.lock().unwrap();
            state.active.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_concurrent() {
        let rl = RateLimiter::new(2, Duration::from_secs(60), Duration::ZERO);
        assert_eq!(rl.check("1.2.3.4"), Admission::Proceed);
        assert_eq!(rl.check("1.2.3.4"), Admission::Proceed);
        assert!(matches!(rl.check("1.2.3.4"), Admission::Wait { .. }));
    }

    #[test]
    fn release_frees_a_slot() {
        let rl = RateLimiter::new(1, Duration::from_secs(60), Duration::ZERO);
        assert_eq!(rl.check("1.2.3.4"), Admission::Proceed);
        assert!(matches!(rl.check("1.2.3.4"), Admission::Wait { .. }));
        rl.release("1.2.3.4");
        assert_eq!(rl.check("1.2.3.4"), Admission::Proceed);
    }

    #[test]
    fn separate_ips_do_not_share_a_budget() {
        let rl = RateLimiter::new(1, Duration::from_secs(60), Duration::ZERO);
        assert_eq!(rl.check("1.2.3.4"), Admission::Proceed);
        assert_eq!(rl.check("5.6.7.8"), Admission::Proceed);
    }

    #[test]
    fn enforces_minimum_gap_between_requests() {
        let rl = RateLimiter::new(5, Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(rl.check("1.2.3.4"), Admission::Proceed);
        match rl.check("1.2.3.4") {
            Admission::Wait { retry_after } => assert!(retry_after <= Duration::from_secs(5)),
            Admission::Proceed => panic!("expected the minimum gap to apply"),
        }
    }
}
