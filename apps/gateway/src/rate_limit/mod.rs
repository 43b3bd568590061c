//! Per-client token-bucket rate limiting.
//!
//! Buckets live in a sharded map. Every refill-and-consume happens while the
//! entry's shard lock is held, so two concurrent calls for one client never
//! spend the same token. The evictor uses `retain`, which takes the same
//! shard locks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Tokens added per second
    pub rate: f64,
    /// Bucket capacity; also the initial token count
    pub burst: u32,
    /// How often the evictor runs. Buckets idle for twice this long are dropped.
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            burst: 20,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct ClientBucket {
    tokens_remaining: f64,
    last_refill: Instant,
    capacity: f64,
    refill_rate: f64,
}

impl ClientBucket {
    fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            tokens_remaining: capacity,
            last_refill: now,
            capacity,
            refill_rate,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens_remaining =
            (self.tokens_remaining + elapsed * self.refill_rate).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDecision {
    Allowed,
    /// Denied; one token becomes available after `retry_after_secs` (rounded up).
    Denied { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, ClientBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Admit or deny one request for `client_id`.
    pub fn allow(&self, client_id: &str) -> bool {
        self.check(client_id).is_allowed()
    }

    pub fn check(&self, client_id: &str) -> RateDecision {
        self.check_at(client_id, Instant::now())
    }

    pub fn check_at(&self, client_id: &str, now: Instant) -> RateDecision {
        let capacity = f64::from(self.config.burst);
        let rate = self.config.rate;

        let mut bucket = self
            .buckets
            .entry(client_id.to_string())
            .or_insert_with(|| ClientBucket::new(capacity, rate, now));

        bucket.refill(now);

        if bucket.tokens_remaining >= 1.0 {
            bucket.tokens_remaining -= 1.0;
            return RateDecision::Allowed;
        }

        let missing = 1.0 - bucket.tokens_remaining;
        let secs = if bucket.refill_rate > 0.0 {
            (missing / bucket.refill_rate).ceil()
        } else {
            self.config.cleanup_interval.as_secs_f64().ceil()
        };
        RateDecision::Denied {
            retry_after_secs: (secs as u64).max(1),
        }
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop buckets idle for more than two cleanup intervals. Returns how many
    /// were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let max_idle = self.config.cleanup_interval * 2;
        let mut removed = 0usize;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_duration_since(bucket.last_refill) <= max_idle;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Run `evict_idle` every cleanup interval until `shutdown` fires.
    pub fn spawn_evictor(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        let period = limiter
            .config
            .cleanup_interval
            .max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("rate limiter evictor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.evict_idle();
                        if removed > 0 {
                            debug!(removed, remaining = limiter.len(), "evicted idle rate-limit buckets");
                        }
                    }
                }
            }
        })
    }
}
