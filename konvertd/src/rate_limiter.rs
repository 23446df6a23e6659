// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Per-client admission control with a sliding window.
//!
//! Each key keeps the instants of its admitted requests, oldest first. A check
//! trims everything older than the window and admits only while fewer than
//! `capacity` instants remain.
//!
//! Keys are created lazily and would otherwise live forever, so once the map
//! grows beyond `compaction_threshold` keys every entry is trimmed and the
//! empty ones are dropped. All state sits behind one mutex.

use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admissions allowed per window.
    pub capacity: usize,
    /// Length of the sliding window.
    pub window: Duration,
    /// Number of tracked keys above which a compaction pass runs.
    pub compaction_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            window: Duration::from_secs(60 * 60),
            compaction_threshold: 1000,
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records an admission for `key` if it still has quota left.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now())
    }

    /// Quota left for `key` in the current window.
    pub fn remaining(&self, key: &str) -> usize {
        self.remaining_at(key, Instant::now())
    }

    /// Drops every key whose history has fully expired.
    pub fn compact(&self) {
        self.compact_at(Instant::now())
    }

    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    pub fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let mut history = self.lock();

        if history.len() > self.config.compaction_threshold {
            self.compact_map(&mut history, now);
        }

        let timestamps = history.entry(key.to_string()).or_default();
        self.trim(timestamps, now);

        if timestamps.len() >= self.config.capacity {
            warn!(
                "Rate limit exceeded for {} ({} requests in window)",
                key,
                timestamps.len()
            );
            return false;
        }

        timestamps.push_back(now);
        debug!(
            "Request allowed for {} ({}/{})",
            key,
            timestamps.len(),
            self.config.capacity
        );
        true
    }

    pub fn remaining_at(&self, key: &str, now: Instant) -> usize {
        let mut history = self.lock();
        match history.get_mut(key) {
            None => self.config.capacity,
            Some(timestamps) => {
                self.trim(timestamps, now);
                self.config.capacity.saturating_sub(timestamps.len())
            }
        }
    }

    pub fn compact_at(&self, now: Instant) {
        let mut history = self.lock();
        self.compact_map(&mut history, now);
    }

    fn compact_map(&self, history: &mut HashMap<String, VecDeque<Instant>>, now: Instant) {
        let before = history.len();
        history.retain(|_, timestamps| {
            self.trim(timestamps, now);
            !timestamps.is_empty()
        });
        debug!(
            "rate limiter compaction dropped {} of {} keys",
            before - history.len(),
            before
        );
    }

    /// The deque is time ordered, so expired entries form a prefix.
    fn trim(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.config.window) else {
            return;
        };
        while timestamps.front().is_some_and(|t| *t < cutoff) {
            timestamps.pop_front();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
