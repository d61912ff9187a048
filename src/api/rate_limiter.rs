use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Token bucket bounding the outbound request rate.
///
/// The bucket holds up to `burst_size` tokens and refills at `max_per_second`
/// tokens per second. Callers queue on the inner mutex, so waiters are served in
/// call order.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_second: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    fn refill(&mut self, rate: f64, capacity: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

impl RateLimiter {
    pub fn new(max_per_second: f64, burst_size: u32) -> Self {
        let capacity = burst_size.max(1) as f64;
        Self {
            max_per_second: if max_per_second > 0.0 { max_per_second } else { 1.0 },
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        state.refill(self.max_per_second, self.capacity);

        if state.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - state.tokens) / self.max_per_second);
            debug!("Rate limiter empty, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
            state.refill(self.max_per_second, self.capacity);
        }

        state.tokens = (state.tokens - 1.0).max(0.0);
    }

    /// Tokens currently available, after refilling.
    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        state.refill(self.max_per_second, self.capacity);
        state.tokens
    }
}
