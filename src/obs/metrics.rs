// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{CallKind, CallOutcome};

/// Counter of call attempts and their outcomes, labeled by `call` and `outcome`.
pub const CALLS_TOTAL: &str = "payments_broker_call_total";
/// Histogram of finished call latencies in seconds, labeled by `call` and `outcome`.
pub const CALL_DURATION_SECONDS: &str = "payments_broker_call_duration_seconds";
/// Counter of failed calls that carried an upstream HTTP status, labeled by `call` and `class`.
pub const UPSTREAM_STATUS_TOTAL: &str = "payments_broker_upstream_status_total";

/// Increments [`CALLS_TOTAL`] (when metrics are enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(CALLS_TOTAL, "call" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a finished call into [`CALL_DURATION_SECONDS`] (when metrics are enabled).
pub fn record_call_duration(kind: CallKind, outcome: CallOutcome, elapsed: StdDuration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!(
			CALL_DURATION_SECONDS,
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.record(elapsed.as_secs_f64());
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome, elapsed);
	}
}

/// Increments [`UPSTREAM_STATUS_TOTAL`] for `status` (when metrics are enabled).
pub fn record_upstream_status(kind: CallKind, status: u16) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			UPSTREAM_STATUS_TOTAL,
			"call" => kind.as_str(),
			"class" => status_class(status)
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, status);
	}
}

/// Buckets an HTTP status into the `class` label (`4xx`, `5xx`, ...).
pub const fn status_class(status: u16) -> &'static str {
	match status {
		100..=199 => "1xx",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		500..=599 => "5xx",
		_ => "other",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn statuses_bucket_by_class() {
		assert_eq!(status_class(200), "2xx");
		assert_eq!(status_class(401), "4xx");
		assert_eq!(status_class(503), "5xx");
		assert_eq!(status_class(42), "other");
	}

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_call_outcome(CallKind::CreatePayout, CallOutcome::Failure);
		record_call_duration(CallKind::CreatePayout, CallOutcome::Failure, StdDuration::ZERO);
		record_upstream_status(CallKind::CreatePayout, 422);
	}
}
