// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	obs::{CallKind, CallOutcome},
};

/// Span covering one broker call.
///
/// `outcome`, `status`, and `elapsed_ms` are declared empty and filled in by
/// [`CallSpan::finish`] once the call has ended.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Opens a span for `kind` at call site `stage`.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"payments_broker.call",
				call = kind.as_str(),
				stage,
				outcome = tracing::field::Empty,
				status = tracing::field::Empty,
				elapsed_ms = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs a synchronous section inside the span.
	pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
		#[cfg(feature = "tracing")]
		{
			self.span.in_scope(f)
		}
		#[cfg(not(feature = "tracing"))]
		{
			f()
		}
	}

	/// Drives `fut` to completion with the span entered on every poll.
	pub async fn run<Fut>(&self, fut: Fut) -> Fut::Output
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone()).await
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut.await
		}
	}

	/// Records how the call ended. `status` is the upstream HTTP status, when one was received.
	pub fn finish(&self, outcome: CallOutcome, status: Option<u16>, elapsed: StdDuration) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());
			self.span.record("elapsed_ms", u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));

			if let Some(status) = status {
				self.span.record("status", status);
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (outcome, status, elapsed);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn in_scope_returns_the_section_value() {
		let span = CallSpan::new(CallKind::GetMerchantAccount, "in_scope");

		assert_eq!(span.in_scope(|| "local"), "local");

		span.finish(CallOutcome::Success, None, StdDuration::from_millis(3));
	}

	#[tokio::test]
	async fn run_passes_the_output_through() {
		let span = CallSpan::new(CallKind::TokenExchange, "run");
		let value = span.run(async { 42 }).await;

		span.finish(CallOutcome::Failure, Some(401), StdDuration::MAX);

		assert_eq!(value, 42);
	}
}
