//! # Rate Limiting

//! Fixed-window request counters keyed by actor and operation, held in a shared `DashMap`. Every window expires
//! after its TTL; expired entries are reset on the next hit and swept by `purge_expired`.

use std::time::{Duration, Instant};
use dashmap::DashMap;
use crate::config::RateLimitSettings;
use crate::errors::{TerminalError, TerminalResult};
use crate::services::auth::Action;

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: DashMap<(String, Action), Window>,
    max_requests: u32,
    ttl: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, ttl: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            ttl,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, Duration::from_secs(settings.window_secs))
    }

    /// Counts one request and rejects it once the window's budget is spent.
    pub fn check(&self, actor_id: &str, action: Action) -> TerminalResult<()> {
        self.check_at(actor_id, action, Instant::now())
    }

    fn check_at(&self, actor_id: &str, action: Action, now: Instant) -> TerminalResult<()> {
        let mut window = self
            .windows
            .entry((actor_id.to_string(), action))
            .or_insert(Window { started_at: now, count: 0 });

        if now.duration_since(window.started_at) >= self.ttl {
            *window = Window { started_at: now, count: 0 };
        }

        if window.count >= self.max_requests {
            let retry_in = self.ttl.saturating_sub(now.duration_since(window.started_at));
            return Err(TerminalError::RateLimited(format!(
                "{} exceeded {} requests for {}; retry in {}s",
                actor_id,
                self.max_requests,
                action,
                retry_in.as_secs().max(1)
            )));
        }

        window.count += 1;
        Ok(())
    }

    /// Drops windows whose TTL has elapsed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| now.duration_since(window.started_at) < self.ttl);
        before - self.windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
