//! Per-actor, per-route request budgets.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// Admission log for one `(actor, route)` key.
#[derive(Default)]
struct SlidingWindow {
    admitted: VecDeque<Instant>,
}

impl SlidingWindow {
    fn try_acquire(&mut self, limit: usize, window: Duration, now: Instant) -> bool {
        // Forget admissions that have left the window
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.admitted.pop_front();
            } else {
                break;
            }
        }

        if self.admitted.len() >= limit {
            return false;
        }
        self.admitted.push_back(now);
        true
    }

    fn is_idle(&self, window: Duration, now: Instant) -> bool {
        self.admitted
            .back()
            .map_or(true, |&last| now.saturating_duration_since(last) >= window)
    }
}

/// Rolling-window limiter keyed by `(actor_id, route_id)`.
///
/// The prune, compare and record sequence for a key runs under one lock, so
/// concurrent callers can never both take the last slot.
pub struct RateLimiter {
    windows: Mutex<HashMap<(String, String), SlidingWindow>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Admit one request if the key is under `limit` for the current window.
    /// A limit of zero means the route is unmetered.
    pub fn allow(&self, actor_id: &str, route_id: &str, limit: u32) -> bool {
        self.allow_at(actor_id, route_id, limit, Instant::now())
    }

    pub fn allow_at(&self, actor_id: &str, route_id: &str, limit: u32, now: Instant) -> bool {
        if limit == 0 {
            return true;
        }

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let allowed = windows
            .entry((actor_id.to_string(), route_id.to_string()))
            .or_default()
            .try_acquire(limit as usize, self.window, now);

        if !allowed {
            metrics::record_rate_limited(route_id);
        }
        allowed
    }

    /// Remove keys whose last admission has left the window.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, w| !w.is_idle(self.window, now));
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
