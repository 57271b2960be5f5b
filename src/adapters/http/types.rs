//! Shared state for the HTTP layer: services, rate limiters, the authenticated caller.

use crate::usecases::{
    AuthService, ChatService, EmergencyService, MedicineService, OnboardingService, UserService,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub type SharedLimiter = Arc<Mutex<RateLimiter>>;

/// Checks between full sweeps of idle clients.
const SWEEP_EVERY: u64 = 256;

/// Per-route limiters for the unauthenticated auth endpoints.
///
/// Clients are keyed by peer address. `trust_forwarded` switches to the first
/// `X-Forwarded-For` hop and must only be set behind a proxy that overwrites it.
#[derive(Clone)]
pub struct RateLimits {
    pub register: SharedLimiter,
    pub login: SharedLimiter,
    pub refresh: SharedLimiter,
    pub trust_forwarded: bool,
}

impl RateLimits {
    pub fn new(trust_forwarded: bool) -> Self {
        Self {
            register: RateLimiter::shared(20, Duration::from_secs(3600)),
            login: RateLimiter::shared(10, Duration::from_secs(60)),
            refresh: RateLimiter::shared(60, Duration::from_secs(3600)),
            trust_forwarded,
        }
    }

    /// Middleware state for one route's limiter.
    pub fn for_route(&self, limiter: &SharedLimiter) -> RouteLimit {
        RouteLimit {
            limiter: limiter.clone(),
            trust_forwarded: self.trust_forwarded,
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new(false)
    }
}

#[derive(Clone)]
pub struct RouteLimit {
    pub limiter: SharedLimiter,
    pub trust_forwarded: bool,
}

/// Handed to every handler via `State` and to middleware via `Extension`.
#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<AuthService>,
    pub onboarding: Arc<OnboardingService>,
    pub users: Arc<UserService>,
    pub medicines: Arc<MedicineService>,
    pub chat: Arc<ChatService>,
    pub emergency: Arc<EmergencyService>,
    pub limits: RateLimits,
}

/// Caller identity, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Sliding-window request counter keyed by client address.
///
/// Clients with no request inside the window are dropped on a periodic sweep,
/// so memory tracks recent clients only.
#[derive(Debug)]
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    limit: u32,
    window: Duration,
    checks: u64,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            limit,
            window,
            checks: 0,
        }
    }

    pub fn shared(limit: u32, window: Duration) -> SharedLimiter {
        Arc::new(Mutex::new(Self::new(limit, window)))
    }

    /// Record a request for `key`. Returns `Err(retry_after_secs)` once the
    /// window already holds `limit` requests.
    pub fn check(&mut self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &str, now: Instant) -> Result<(), u64> {
        let window = self.window;
        self.checks += 1;
        if self.checks % SWEEP_EVERY == 0 {
            self.sweep(now);
        }
        let entries = self.windows.entry(key.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < window);

        if entries.len() as u32 >= self.limit {
            let oldest = entries.first().copied().unwrap_or(now);
            let wait = window.saturating_sub(now.duration_since(oldest));
            return Err(wait.as_secs().max(1));
        }
        entries.push(now);
        Ok(())
    }

    /// Forget clients whose requests have all left the window.
    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < window);
            !entries.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let mut rl = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(rl.check_at("1.2.3.4", t0).is_ok());
        }
        let retry = rl.check_at("1.2.3.4", t0).unwrap_err();
        assert_eq!(retry, 60);
        assert!(rl.check_at("5.6.7.8", t0).is_ok());
    }

    #[test]
    fn window_slides() {
        let mut rl = RateLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        rl.check_at("k", t0).unwrap();
        assert_eq!(rl.check_at("k", t0 + Duration::from_secs(4)).unwrap_err(), 6);
        assert!(rl.check_at("k", t0 + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let mut rl = RateLimiter::new(5, Duration::from_secs(10));
        let t0 = Instant::now();
        for i in 0..SWEEP_EVERY - 1 {
            rl.check_at(&format!("10.0.{}.{}", i / 256, i % 256), t0).unwrap();
        }
        assert_eq!(rl.tracked_clients(), (SWEEP_EVERY - 1) as usize);

        // The next check triggers a sweep once the old window has passed.
        rl.check_at("fresh", t0 + Duration::from_secs(11)).unwrap();
        assert_eq!(rl.tracked_clients(), 1);
    }
}
