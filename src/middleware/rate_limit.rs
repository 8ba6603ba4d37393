//! Token bucket rate limiting for static file rules.

use crate::common::ApiResponse;
use crate::config::RateLimitOptions;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::IntoResponse,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const ANONYMOUS: &str = "anonymous";

/// Tokens left for one client, refilled lazily on each visit.
struct Bucket {
    tokens: f64,
    seen_at: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            seen_at: now,
        }
    }

    fn take(&mut self, now: Instant, capacity: f64, per_second: f64) -> bool {
        let refill = now.duration_since(self.seen_at).as_secs_f64() * per_second;
        self.tokens = (self.tokens + refill).min(capacity);
        self.seen_at = now;

        let admitted = self.tokens >= 1.0;
        if admitted {
            self.tokens -= 1.0;
        }
        admitted
    }
}

/// Per-client token bucket.
///
/// Clients are told apart by peer address when the server runs with connect
/// info. With `trust_forwarded_for` the first `x-forwarded-for` entry takes
/// precedence. Requests with neither share one bucket.
///
/// A bucket untouched for long enough to refill completely is dropped, since
/// a fresh one would admit exactly the same requests.
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    per_second: f64,
    capacity: f64,
    trust_forwarded_for: bool,
    idle_after: Option<Duration>,
    swept_at: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(options: &RateLimitOptions) -> Self {
        let per_second = options.requests_per_second.max(0.0);
        let capacity = f64::from(options.burst.max(1));
        let idle_after = (per_second > 0.0)
            .then(|| Duration::try_from_secs_f64(capacity / per_second).ok())
            .flatten();

        Self {
            buckets: DashMap::new(),
            per_second,
            capacity,
            trust_forwarded_for: options.trust_forwarded_for,
            idle_after,
            swept_at: Mutex::new(Instant::now()),
        }
    }

    fn admit(&self, key: String) -> bool {
        let now = Instant::now();
        self.sweep(now);

        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| Bucket::full(self.capacity, now));
        bucket.take(now, self.capacity, self.per_second)
    }

    /// Drop refilled buckets, at most once per idle window.
    fn sweep(&self, now: Instant) {
        let Some(idle_after) = self.idle_after else {
            return;
        };
        let Ok(mut swept_at) = self.swept_at.try_lock() else {
            return;
        };
        if now.duration_since(*swept_at) < idle_after {
            return;
        }
        *swept_at = now;
        drop(swept_at);

        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.seen_at) < idle_after);
    }

    fn client_key(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.buckets.len()
    }
}

#[async_trait]
impl Middleware for RateLimiter {
    async fn handle(&self, request: Request<Body>, next: Next) -> MiddlewareResult {
        let key = self.client_key(&request);

        if self.admit(key.clone()) {
            next.run(request).await
        } else {
            tracing::warn!(client = %key, "Rate limit exceeded");
            Ok(ApiResponse::failure(StatusCode::TOO_MANY_REQUESTS, "Too many requests")
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded_by(client: &str) -> Request<Body> {
        Request::builder()
            .header("x-forwarded-for", format!("{client}, 10.0.0.1"))
            .body(Body::empty())
            .unwrap()
    }

    fn peer(ip: [u8; 4]) -> Request<Body> {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        request
    }

    fn passthrough() -> Next {
        Next::new(|_| Box::pin(async { Ok(StatusCode::OK.into_response()) }))
    }

    async fn status(limiter: &RateLimiter, request: Request<Body>) -> StatusCode {
        limiter.handle(request, passthrough()).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_burst_then_reject_per_peer() {
        let limiter = RateLimiter::new(&RateLimitOptions::new(0.0, 2));

        assert_eq!(status(&limiter, peer([1, 2, 3, 4])).await, StatusCode::OK);
        assert_eq!(status(&limiter, peer([1, 2, 3, 4])).await, StatusCode::OK);
        assert_eq!(
            status(&limiter, peer([1, 2, 3, 4])).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status(&limiter, peer([5, 6, 7, 8])).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forwarded_header_is_ignored_by_default() {
        let limiter = RateLimiter::new(&RateLimitOptions::new(0.0, 1));

        assert_eq!(status(&limiter, forwarded_by("1.1.1.1")).await, StatusCode::OK);
        for client in ["2.2.2.2", "3.3.3.3", "4.4.4.4"] {
            assert_eq!(
                status(&limiter, forwarded_by(client)).await,
                StatusCode::TOO_MANY_REQUESTS
            );
        }
        assert_eq!(limiter.tracked(), 1);
    }

    #[tokio::test]
    async fn test_trusted_forwarded_header_splits_clients() {
        let limiter = RateLimiter::new(&RateLimitOptions::new(0.0, 1).trust_forwarded_for());

        assert_eq!(status(&limiter, forwarded_by("1.1.1.1")).await, StatusCode::OK);
        assert_eq!(status(&limiter, forwarded_by("2.2.2.2")).await, StatusCode::OK);
        assert_eq!(
            status(&limiter, forwarded_by("1.1.1.1")).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_client_key_prefers_peer_address() {
        let limiter = RateLimiter::new(&RateLimitOptions::new(1.0, 1));
        assert_eq!(limiter.client_key(&Request::new(Body::empty())), ANONYMOUS);
        assert_eq!(limiter.client_key(&forwarded_by("9.9.9.9")), ANONYMOUS);
        assert_eq!(limiter.client_key(&peer([9, 9, 9, 9])), "9.9.9.9");

        let trusting = RateLimiter::new(&RateLimitOptions::new(1.0, 1).trust_forwarded_for());
        assert_eq!(trusting.client_key(&forwarded_by("9.9.9.9")), "9.9.9.9");
        assert_eq!(trusting.client_key(&peer([8, 8, 8, 8])), "8.8.8.8");
    }

    #[tokio::test]
    async fn test_refilled_buckets_are_evicted() {
        // Ten tokens a second, so a single-token bucket is full again after 100ms.
        let limiter = RateLimiter::new(&RateLimitOptions::new(10.0, 1).trust_forwarded_for());

        for client in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            assert_eq!(status(&limiter, forwarded_by(client)).await, StatusCode::OK);
        }
        assert_eq!(limiter.tracked(), 3);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(status(&limiter, forwarded_by("4.4.4.4")).await, StatusCode::OK);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn test_without_refill_nothing_is_evicted() {
        let limiter = RateLimiter::new(&RateLimitOptions::new(0.0, 1));
        assert!(limiter.idle_after.is_none());
    }
}
