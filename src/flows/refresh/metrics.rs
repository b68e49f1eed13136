// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh calls.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	refreshed: AtomicU64,
	retained: AtomicU64,
	raised: AtomicU64,
}
impl RefreshMetrics {
	/// Total refresh calls that reached the session guard.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Calls that stored a new pair.
	pub fn successes(&self) -> u64 {
		self.refreshed.load(Ordering::Relaxed)
	}

	/// Calls where the server did not refresh and the session kept its pair.
	pub fn retained(&self) -> u64 {
		self.retained.load(Ordering::Relaxed)
	}

	/// Calls that raised an error (missing state, storage failures).
	pub fn failures(&self) -> u64 {
		self.raised.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.refreshed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retained(&self) {
		self.retained.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.raised.fetch_add(1, Ordering::Relaxed);
	}
}
