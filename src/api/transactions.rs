//! Merchant account transaction listing with a trailing default window.

// crates.io
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	api::{self, PaymentsClient},
	http::ApiHttpClient,
	obs::{self, CallKind},
	sign::Method,
};

/// Arguments for [`PaymentsClient::list_transactions`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTransactions {
	/// Merchant account to list; the configured account when omitted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_account_id: Option<String>,
	/// Inclusive RFC 3339 lower bound; `to` minus the configured window when omitted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<String>,
	/// RFC 3339 upper bound; now when omitted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	/// Pagination cursor returned by a previous page.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cursor: Option<String>,
}
impl ListTransactions {
	/// Resolves the query window relative to `now`.
	pub fn window(&self, now: OffsetDateTime, span: Duration) -> Result<TransactionWindow> {
		let to = match self.to.as_deref() {
			Some(to) => parse_bound("to", to)?,
			None => now,
		};
		let from = match self.from.as_deref() {
			Some(from) => parse_bound("from", from)?,
			None => to.checked_sub(span).ok_or_else(|| Error::InvalidInput {
				field: "from",
				reason: "default window start falls outside the representable date range".into(),
			})?,
		};

		if from >= to {
			return Err(Error::InvalidInput {
				field: "from",
				reason: "must be earlier than `to`".into(),
			});
		}

		Ok(TransactionWindow { from: api::format_timestamp(from)?, to: api::format_timestamp(to)? })
	}
}

/// Formatted bounds sent as the `from` and `to` query parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionWindow {
	/// Lower bound, RFC 3339 UTC with milliseconds.
	pub from: String,
	/// Upper bound, RFC 3339 UTC with milliseconds.
	pub to: String,
}

impl<C> PaymentsClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Lists transactions of a merchant account over the requested (or default) window.
	pub async fn list_transactions(&self, request: ListTransactions) -> Result<Value> {
		obs::observe(CallKind::ListTransactions, "list_transactions", async move {
			let settings = self.settings();
			let window = request.window(OffsetDateTime::now_utc(), settings.transactions_window)?;
			let merchant_account_id = match request.merchant_account_id.as_deref() {
				Some(id) => api::require_id("merchant_account_id", id)?,
				None => settings.merchant_account_id.as_str(),
			};
			let mut url =
				self.api_url(&["v3", "merchant-accounts", merchant_account_id, "transactions"])?;

			{
				let mut query = url.query_pairs_mut();

				query.append_pair("from", &window.from).append_pair("to", &window.to);

				if let Some(cursor) = request.cursor.as_deref().filter(|c| !c.trim().is_empty()) {
					query.append_pair("cursor", cursor);
				}
			}

			self.send(Method::Get, url, None).await
		})
		.await
	}
}

fn parse_bound(field: &'static str, value: &str) -> Result<OffsetDateTime> {
	OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|e| Error::InvalidInput {
		field,
		reason: format!("expected an RFC 3339 timestamp: {e}"),
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	const NOW: OffsetDateTime = datetime!(2025-02-15 10:30:00 UTC);

	#[test]
	fn default_window_trails_now() {
		let window = ListTransactions::default()
			.window(NOW, Duration::days(30))
			.expect("Default window should resolve.");

		assert_eq!(window.to, "2025-02-15T10:30:00.000Z");
		assert_eq!(window.from, "2025-01-16T10:30:00.000Z");
	}

	#[test]
	fn explicit_to_shifts_default_from() {
		let request =
			ListTransactions { to: Some("2025-01-31T00:00:00+01:00".into()), ..Default::default() };
		let window = request.window(NOW, Duration::days(30)).expect("Window should resolve.");

		assert_eq!(window.to, "2025-01-30T23:00:00.000Z");
		assert_eq!(window.from, "2024-12-31T23:00:00.000Z");
	}

	#[test]
	fn invalid_bounds_are_rejected() {
		let unparsable = ListTransactions { from: Some("last week".into()), ..Default::default() };
		let inverted = ListTransactions {
			from: Some("2025-02-01T00:00:00Z".into()),
			to: Some("2025-01-01T00:00:00Z".into()),
			..Default::default()
		};

		assert!(matches!(
			unparsable.window(NOW, Duration::days(30)),
			Err(Error::InvalidInput { field: "from", .. })
		));
		assert!(matches!(
			inverted.window(NOW, Duration::days(30)),
			Err(Error::InvalidInput { field: "from", .. })
		));
	}

	#[test]
	fn oversized_window_fails_without_panicking() {
		assert!(matches!(
			ListTransactions::default().window(NOW, Duration::MAX),
			Err(Error::InvalidInput { field: "from", .. })
		));
	}
}
