//! Per-user fixed-window rate limiting.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Window {
    started: Instant,
    count: u32,
}

/// Allows at most `max_per_window` requests per key per window.
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates a limiter with a one-minute window. Zero disables limiting.
    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    /// Creates a limiter with an arbitrary window.
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if limiting is active.
    pub fn is_enabled(&self) -> bool {
        self.max_per_window > 0
    }

    /// Counts one request for `key`.
    ///
    /// Returns `Err(retry_in)` if the key exhausted its window.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }

        let now = Instant::now();
        let mut windows = self.windows.lock();
        if windows.len() > 10_000 {
            let span = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < span);
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;
        if window.count <= self.max_per_window {
            Ok(())
        } else {
            Err(self.window.saturating_sub(now.duration_since(window.started)))
        }
    }
}
