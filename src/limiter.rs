// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client token bucket rate limiter.
//!
//! Each client identity owns a bucket holding up to `requests_per_minute`
//! tokens. Buckets start full and refill lazily, one token per whole
//! elapsed second, whenever the client is checked.
//!
//! The identity map sits behind a `RwLock` so lookups of known clients run
//! concurrently; only inserting a new client or sweeping idle ones takes the
//! write lock. Each bucket carries its own `Mutex`, which serialises the
//! refill and decrement for that client alone.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Token bucket state for one client.
#[derive(Debug)]
struct Visitor {
    /// Available tokens, never above capacity
    tokens: u32,
    /// Last time whole seconds were credited
    last_refill: Instant,
}

impl Visitor {
    fn new(capacity: u32, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Credit one token per whole elapsed second. The refill clock only
    /// advances when at least one token was credited, so sub-second
    /// remainders are dropped rather than carried.
    fn refill(&mut self, capacity: u32, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs();
        if elapsed > 0 {
            let to_add = u32::try_from(elapsed).unwrap_or(u32::MAX);
            self.tokens = self.tokens.saturating_add(to_add).min(capacity);
            self.last_refill = now;
        }
    }

    /// Try to consume a token. Returns true if successful.
    fn try_consume(&mut self, capacity: u32, now: Instant) -> bool {
        self.refill(capacity, now);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// Thread-safe per-client rate limiter.
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Per-client buckets
    visitors: RwLock<HashMap<String, Arc<Mutex<Visitor>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            visitors: RwLock::new(HashMap::new()),
        }
    }

    /// Bucket capacity, also the steady-state requests per minute.
    pub fn capacity(&self) -> u32 {
        self.config.requests_per_minute
    }

    /// Decide whether `identity` may make a request now.
    ///
    /// Returns true and spends a token when one is available. A denied
    /// check has no other side effect.
    pub async fn admit(&self, identity: &str) -> bool {
        let allowed = self.consume(identity).await;
        if !allowed {
            debug!(client = %identity, "Client rate limit exceeded");
        }
        allowed
    }

    /// Number of tracked clients.
    pub async fn len(&self) -> usize {
        self.visitors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.visitors.read().await.is_empty()
    }

    /// Spend a token from the bucket for `identity`, creating a full one on
    /// first sight.
    ///
    /// The map lock stays held until the bucket has been updated, so a
    /// sweep cannot drop the bucket between lookup and decrement. Lock order
    /// is map then bucket, the same as [`cleanup`](Self::cleanup).
    async fn consume(&self, identity: &str) -> bool {
        let capacity = self.capacity();

        {
            let visitors = self.visitors.read().await;
            if let Some(visitor) = visitors.get(identity) {
                let mut visitor = visitor.lock().await;
                return visitor.try_consume(capacity, Instant::now());
            }
        }

        let mut visitors = self.visitors.write().await;
        // Another task may have inserted while we waited for the write lock.
        let visitor = visitors
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Visitor::new(capacity, Instant::now()))));
        let mut visitor = visitor.lock().await;
        visitor.try_consume(capacity, Instant::now())
    }

    /// Remove clients idle for longer than the cleanup interval.
    ///
    /// Each bucket is locked before its staleness is read, so a bucket in
    /// the middle of a refill is never judged on a half-updated clock.
    /// Returns the number of clients removed.
    pub async fn cleanup(&self) -> usize {
        let stale_threshold = self.config.cleanup_interval();
        let now = Instant::now();

        let mut visitors = self.visitors.write().await;
        let mut stale = Vec::new();
        for (identity, visitor) in visitors.iter() {
            let visitor = visitor.lock().await;
            if now.saturating_duration_since(visitor.last_refill) > stale_threshold {
                stale.push(identity.clone());
            }
        }

        for identity in &stale {
            visitors.remove(identity);
        }
        stale.len()
    }

    /// Run [`cleanup`](Self::cleanup) every cleanup interval until
    /// `shutdown` flips to true or its sender is dropped.
    pub fn spawn_cleanup(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.cleanup_interval();
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = self.cleanup().await;
                        if removed > 0 {
                            debug!(removed, "Removed idle rate limit visitors");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Rate limit cleanup stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
