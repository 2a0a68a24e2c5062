//! Login throttling
//!
//! Each key gets `max_attempts` tries per window. Going over starts a ban
//! during which every attempt is refused. State is kept in process memory;
//! once the map holds more than `PRUNE_AT` keys, lapsed entries are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::ServerConfig;

const PRUNE_AT: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub max_attempts: u32,
    pub window: Duration,
    pub ban: Duration,
}

impl From<&ServerConfig> for RateLimiterConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_attempts: config.login_max_attempts,
            window: Duration::from_secs(config.login_window_seconds),
            ban: Duration::from_secs(config.login_ban_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum KeyState {
    Counting { attempts: u32, since: Instant },
    Banned { until: Instant },
}

/// Per-key attempt counter with temporary bans
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    keys: Arc<Mutex<HashMap<String, KeyState>>>,
    prune_at: usize,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            keys: Arc::new(Mutex::new(HashMap::new())),
            prune_at: PRUNE_AT,
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.attempt_at(key, Instant::now()).await
    }

    async fn attempt_at(&self, key: &str, now: Instant) -> bool {
        let mut keys = self.keys.lock().await;
        let current = keys
            .get(key)
            .copied()
            .and_then(|state| self.still_relevant(state, now));

        let (next, allowed) = match current {
            Some(banned @ KeyState::Banned { .. }) => (banned, false),
            Some(KeyState::Counting { attempts, .. }) if attempts >= self.config.max_attempts => {
                warn!("Too many attempts for {}, banning for {:?}", key, self.config.ban);
                let until = now + self.config.ban;
                (KeyState::Banned { until }, false)
            }
            Some(KeyState::Counting { attempts, since }) => {
                let attempts = attempts + 1;
                (KeyState::Counting { attempts, since }, true)
            }
            None => (KeyState::Counting { attempts: 1, since: now }, true),
        };

        keys.insert(key.to_string(), next);

        if keys.len() > self.prune_at {
            let before = keys.len();
            keys.retain(|_, state| self.still_relevant(*state, now).is_some());
            debug!(dropped = before - keys.len(), "Pruned login throttling state");
        }

        allowed
    }

    /// `None` once a ban has lapsed or the counting window has closed
    fn still_relevant(&self, state: KeyState, now: Instant) -> Option<KeyState> {
        match state {
            KeyState::Banned { until } if now < until => Some(state),
            KeyState::Counting { since, .. } if now.duration_since(since) < self.config.window => {
                Some(state)
            }
            _ => None,
        }
    }

    /// Forget the attempts recorded for `key`
    pub async fn reset(&self, key: &str) {
        self.keys.lock().await.remove(key);
    }
}
