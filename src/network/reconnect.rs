use std::time::Duration;

use rand::Rng;

/// Chính sách reconnect cho realtime session: exponential backoff có jitter,
/// giới hạn số lần thử trước khi bỏ cuộc.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay cho lần thử thứ `attempt` (tính từ 1): initial * 2^(attempt-1),
    /// chặn trên bởi max_delay, cộng jitter tối đa 50% để tránh các client
    /// cùng reconnect một lúc.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        let jitter_ceiling = base.as_millis() as u64 / 2;
        let jitter = if jitter_ceiling == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ceiling))
        };

        base + jitter
    }
}
