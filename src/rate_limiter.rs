//! Per-host adaptive rate limiting.
//!
//! Keyed by host (scheme+authority). `acquire` suspends until at least the
//! host's current minimum delay has elapsed since its last recorded request,
//! then records "now". A reported 429 doubles the effective delay for that
//! host (capped at a ceiling); the delay decays back to baseline after a
//! cooldown window passes without another 429.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

struct HostState {
    baseline_delay: Duration,
    effective_delay: Duration,
    last_request_at: Option<DateTime<Utc>>,
    last_429_at: Option<DateTime<Utc>>,
}

impl HostState {
    fn new(baseline: Duration) -> Self {
        Self {
            baseline_delay: baseline,
            effective_delay: baseline,
            last_request_at: None,
            last_429_at: None,
        }
    }
}

/// Pure decay/widen computation, separated from the lock and the sleep so it
/// can be unit-tested against fixed timestamps instead of wall-clock sleeps.
fn decayed_delay(state: &HostState, now: DateTime<Utc>, cooldown: Duration) -> Duration {
    match state.last_429_at {
        Some(last) if now.signed_duration_since(last).to_std().unwrap_or_default() >= cooldown => {
            state.baseline_delay
        }
        Some(_) => state.effective_delay,
        None => state.effective_delay,
    }
}

pub struct RateLimiter {
    ceiling: Duration,
    cooldown: Duration,
    hosts: DashMap<String, HostState>,
    // per-host suspension lock so concurrent callers for the same host serialize
    // their wait-then-record in first-come-first-served arrival order.
    gates: AsyncMutex<HashMap<String, std::sync::Arc<AsyncMutex<()>>>>,
}

impl RateLimiter {
    pub fn new(ceiling: Duration, cooldown: Duration) -> Self {
        Self {
            ceiling,
            cooldown,
            hosts: DashMap::new(),
            gates: AsyncMutex::new(HashMap::new()),
        }
    }

    async fn gate_for(&self, host: &str) -> std::sync::Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().await;
        gates
            .entry(host.to_string())
            .or_insert_with(|| std::sync::Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Wait until `min_delay` has elapsed since the last request to `host`,
    /// then record now as the last request. Never fails.
    pub async fn acquire(&self, host: &str, min_delay: Duration) {
        let gate = self.gate_for(host).await;
        let _permit = gate.lock().await;

        loop {
            let now = Utc::now();
            let wait = {
                let mut state = self
                    .hosts
                    .entry(host.to_string())
                    .or_insert_with(|| HostState::new(min_delay));
                let effective = decayed_delay(&state, now, self.cooldown).max(min_delay);
                state.effective_delay = effective;

                match state.last_request_at {
                    None => None,
                    Some(last) => {
                        let elapsed = now.signed_duration_since(last).to_std().unwrap_or_default();
                        if elapsed >= effective {
                            None
                        } else {
                            Some(effective - elapsed)
                        }
                    }
                }
            };

            match wait {
                None => break,
                // a few percent of random jitter keeps many hosts sharing the
                // same baseline delay from waking up in lockstep
                Some(d) => tokio::time::sleep(jittered(d)).await,
            }
        }

        let mut state = self.hosts.get_mut(host).expect("host state inserted above");
        state.last_request_at = Some(Utc::now());
    }

    /// Report a 429-equivalent response for `host`, doubling its effective
    /// delay up to the configured ceiling.
    pub fn report_rate_limited(&self, host: &str, baseline: Duration) {
        let mut state = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(|| HostState::new(baseline));
        state.effective_delay = (state.effective_delay * 2).min(self.ceiling);
        state.last_429_at = Some(Utc::now());
    }

    /// Current effective delay for `host`, or `baseline` if unseen.
    pub fn current_delay(&self, host: &str, baseline: Duration) -> Duration {
        self.hosts
            .get(host)
            .map(|s| decayed_delay(&s, Utc::now(), self.cooldown))
            .unwrap_or(baseline)
    }
}

/// Adds up to 5% positive jitter; never sleeps less than `d` so the
/// configured minimum delay is still honored.
fn jittered(d: Duration) -> Duration {
    let factor = rand::rng().random_range(1.0..=1.05);
    d.mul_f64(factor)
}
