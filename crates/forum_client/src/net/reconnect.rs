use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// A socket that stayed up this long starts the backoff over.
pub const RECONNECT_RESET_AFTER: Duration = Duration::from_secs(60 * 5);

const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Jittered exponential backoff for room socket reconnects (attempt starts at 1).
pub fn schedule_reconnect(attempt: u32) -> (Instant, u64) {
	let ms = backoff_delay_ms(attempt, &mut rand::rng());
	(Instant::now() + Duration::from_millis(ms), ms)
}

fn backoff_delay_ms(attempt: u32, rng: &mut impl Rng) -> u64 {
	let pow = 2u64.saturating_pow(attempt.saturating_sub(1).min(6));
	let delay_ms = BASE_DELAY_MS.saturating_mul(pow).min(MAX_DELAY_MS);
	let jitter_window = (delay_ms / 10).max(1);
	let jitter_offset = rng.random_range(0..=(jitter_window * 2));
	delay_ms.saturating_sub(jitter_window).saturating_add(jitter_offset)
}

/// Next attempt number; a long-lived previous connection resets the count.
pub fn bump_attempt(attempt: u32, last_connected: Option<Instant>) -> u32 {
	match last_connected {
		Some(last) if Instant::now().duration_since(last) > RECONNECT_RESET_AFTER => 1,
		_ => attempt.saturating_add(1).max(1),
	}
}
