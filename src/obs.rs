//! Optional observability helpers for token exchanges and API operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit a `payments_broker.call` span per call with the `call`
//!   (operation) and `stage` (call site) fields. `outcome`, `status` (upstream HTTP status of a
//!   failed call), and `elapsed_ms` are recorded when the call ends.
//! - Enable `metrics` to emit [`CALLS_TOTAL`], [`CALL_DURATION_SECONDS`], and
//!   [`UPSTREAM_STATUS_TOTAL`].

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// std
use std::time::{Duration as StdDuration, Instant};
// self
use crate::_prelude::*;

/// Upstream calls observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Client-credentials token exchange.
	TokenExchange,
	/// Local merchant account lookup (no network).
	GetMerchantAccount,
	/// `GET /v3/merchant-accounts`.
	ListMerchantAccounts,
	/// `GET /v3/payouts/{id}`.
	GetPayout,
	/// `GET /v3/payments/{id}`.
	GetPayment,
	/// `GET /v3/payment-links/{id}`.
	GetPaymentLink,
	/// `POST /v3/payouts`.
	CreatePayout,
	/// `POST /v3/payment-links`.
	CreatePaymentLink,
	/// `GET /v3/merchant-accounts/{id}/transactions`.
	ListTransactions,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::TokenExchange => "token_exchange",
			CallKind::GetMerchantAccount => "get_merchant_account",
			CallKind::ListMerchantAccounts => "list_merchant_accounts",
			CallKind::GetPayout => "get_payout",
			CallKind::GetPayment => "get_payment",
			CallKind::GetPaymentLink => "get_payment_link",
			CallKind::CreatePayout => "create_payout",
			CallKind::CreatePaymentLink => "create_payment_link",
			CallKind::ListTransactions => "list_transactions",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a broker call.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a [`CallSpan`] and records how it ended.
pub async fn observe<T, Fut>(kind: CallKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = CallSpan::new(kind, stage);
	let started = Instant::now();

	record_call_outcome(kind, CallOutcome::Attempt);

	let result = span.run(fut).await;
	let (outcome, status) = match &result {
		Ok(_) => (CallOutcome::Success, None),
		Err(e) => (CallOutcome::Failure, e.status()),
	};

	finish(kind, &span, outcome, status, started.elapsed());

	result
}

/// Observes a call answered from local state.
pub fn observe_local<T>(kind: CallKind, stage: &'static str, f: impl FnOnce() -> T) -> T {
	let span = CallSpan::new(kind, stage);
	let started = Instant::now();

	record_call_outcome(kind, CallOutcome::Attempt);

	let value = span.in_scope(f);

	finish(kind, &span, CallOutcome::Success, None, started.elapsed());

	value
}

fn finish(
	kind: CallKind,
	span: &CallSpan,
	outcome: CallOutcome,
	status: Option<u16>,
	elapsed: StdDuration,
) {
	span.finish(outcome, status, elapsed);
	record_call_outcome(kind, outcome);
	record_call_duration(kind, outcome, elapsed);

	if let Some(status) = status {
		record_upstream_status(kind, status);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn observe_returns_the_call_result_unchanged() {
		let ok = observe(CallKind::GetPayment, "ok", async { Ok(7) }).await;
		let err = observe(CallKind::GetPayment, "err", async {
			Err::<(), _>(Error::upstream_api(404, b"missing"))
		})
		.await
		.expect_err("Failures should propagate.");

		assert_eq!(ok.expect("Success should propagate."), 7);
		assert_eq!(err.status(), Some(404));
	}

	#[test]
	fn observe_local_runs_the_section_once() {
		let mut runs = 0;
		let value = observe_local(CallKind::GetMerchantAccount, "local", || {
			runs += 1;

			"m-1"
		});

		assert_eq!((value, runs), ("m-1", 1));
	}
}
