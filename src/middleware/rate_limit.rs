use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Fixed one-second window request counter for the public API group.
#[derive(Debug)]
struct Window {
    opened: Instant,
    requests: u32,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_per_second: u32,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second: max_per_second.max(1),
            window: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                requests: 0,
            })),
        }
    }

    fn allow(&self) -> bool {
        let mut guard = self.window.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        if now.duration_since(guard.opened) >= Duration::from_secs(1) {
            guard.opened = now;
            guard.requests = 0;
        }
        if guard.requests < self.max_per_second {
            guard.requests += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.allow() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(max_per_second: u32) -> RateLimiter {
    RateLimiter::new(max_per_second)
}
