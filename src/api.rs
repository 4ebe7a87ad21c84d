//! Payments API operations built on the token manager and request signer.
//!
//! Every networked operation follows the same pipeline: obtain a bearer token, build the
//! [`SigningInput`] (with a fresh `Idempotency-Key` for mutating calls), sign it, transmit it,
//! and return the parsed JSON body untouched. Nothing is retried automatically.

pub mod payment_links;
pub mod payouts;
pub mod transactions;

pub use payment_links::*;
pub use payouts::*;
pub use transactions::*;

// crates.io
use serde_json::Value;
use time::{UtcOffset, macros::format_description};
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	config::{ClientSettings, Credential},
	error,
	http::{self, ApiHttpClient, OutboundRequest},
	obs::{self, CallKind},
	sign::{self, Method, SigningInput},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Header carrying the per-request idempotency key on mutating calls.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const TARGET: &str = "payments API";
const JSON_CONTENT_TYPE: &str = "application/json";

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestPaymentsClient = PaymentsClient<ReqwestHttpClient>;

/// Identifiers configured for this process; served without a network call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MerchantAccount {
	/// Default merchant account identifier.
	pub merchant_account_id: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// API base URL the client talks to.
	pub api_endpoint: String,
}

/// Signed, token-caching client for the payments API.
///
/// The client owns the credential, settings, transport, and a [`TokenManager`] sharing that
/// transport, so one instance serves every operation with a single cached token.
pub struct PaymentsClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	credential: Arc<Credential>,
	settings: Arc<ClientSettings>,
	http_client: Arc<C>,
	tokens: TokenManager<C>,
}
impl<C> PaymentsClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		credential: Credential,
		settings: ClientSettings,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let credential = Arc::new(credential);
		let settings = Arc::new(settings);
		let http_client = http_client.into();
		let tokens = TokenManager::new(credential.clone(), settings.clone(), http_client.clone());

		Self { credential, settings, http_client, tokens }
	}

	/// Returns the token manager.
	pub fn tokens(&self) -> &TokenManager<C> {
		&self.tokens
	}

	/// Returns the active settings.
	pub fn settings(&self) -> &ClientSettings {
		&self.settings
	}

	/// Returns configured account identifiers without contacting the API.
	pub fn merchant_account(&self) -> MerchantAccount {
		obs::observe_local(CallKind::GetMerchantAccount, "merchant_account", || MerchantAccount {
			merchant_account_id: self.settings.merchant_account_id.clone(),
			client_id: self.credential.client_id.clone(),
			api_endpoint: self.credential.endpoints.api.to_string(),
		})
	}

	/// Lists merchant accounts visible to the client.
	pub async fn list_merchant_accounts(&self) -> Result<Value> {
		obs::observe(CallKind::ListMerchantAccounts, "list_merchant_accounts", async move {
			let url = self.api_url(&["v3", "merchant-accounts"])?;

			self.send(Method::Get, url, None).await
		})
		.await
	}

	/// Fetches a payout by identifier.
	pub async fn get_payout(&self, payout_id: &str) -> Result<Value> {
		obs::observe(CallKind::GetPayout, "get_payout", async move {
			let url = self.api_url(&["v3", "payouts", require_id("payout_id", payout_id)?])?;

			self.send(Method::Get, url, None).await
		})
		.await
	}

	/// Fetches a payment by identifier.
	pub async fn get_payment(&self, payment_id: &str) -> Result<Value> {
		obs::observe(CallKind::GetPayment, "get_payment", async move {
			let url = self.api_url(&["v3", "payments", require_id("payment_id", payment_id)?])?;

			self.send(Method::Get, url, None).await
		})
		.await
	}

	/// Fetches a payment link by identifier.
	pub async fn get_payment_link(&self, payment_link_id: &str) -> Result<Value> {
		obs::observe(CallKind::GetPaymentLink, "get_payment_link", async move {
			let id = require_id("payment_link_id", payment_link_id)?;
			let url = self.api_url(&["v3", "payment-links", id])?;

			self.send(Method::Get, url, None).await
		})
		.await
	}

	fn api_url(&self, segments: &[&str]) -> Result<Url> {
		Ok(http::endpoint_url(&self.credential.endpoints.api, segments)?)
	}

	/// Signs and sends one API request. A `body` marks the call as mutating, which adds a
	/// JSON content type and a fresh idempotency key.
	async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Value> {
		let token = self.tokens.access_token().await?;
		let mut input = SigningInput::new(method, http::path_and_query(&url))
			.header("Authorization", format!("Bearer {}", token.expose()))
			.header("User-Agent", self.settings.user_agent.as_str())
			.header("Accept", JSON_CONTENT_TYPE);

		if let Some(body) = body {
			input = input
				.header("Content-Type", JSON_CONTENT_TYPE)
				.header(IDEMPOTENCY_KEY_HEADER, Uuid::new_v4().to_string())
				.body(body);
		}

		let signed = sign::build_signed_request(&self.credential, input)?;
		let reply = self.http_client.execute(OutboundRequest::new(url, signed, TARGET)).await?;

		if !reply.is_success() {
			return Err(Error::upstream_api(reply.status, &reply.body));
		}
		if reply.body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		error::parse_json(TARGET, reply.status, &reply.body)
	}
}
#[cfg(feature = "reqwest")]
impl PaymentsClient<ReqwestHttpClient> {
	/// Creates a client with its own reqwest transport (redirects disabled).
	pub fn new(credential: Credential, settings: ClientSettings) -> Result<Self> {
		Ok(Self::with_http_client(credential, settings, ReqwestHttpClient::new()?))
	}

	/// Loads credential + settings from `PAYMENTS_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Self::new(Credential::from_env()?, ClientSettings::from_env()?)
	}
}
impl<C> Debug for PaymentsClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PaymentsClient")
			.field("credential", &self.credential)
			.field("settings", &self.settings)
			.field("tokens", &self.tokens)
			.finish()
	}
}

fn require_id<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
	let value = value.trim();

	if value.is_empty() {
		return Err(Error::InvalidInput { field, reason: "must not be empty".into() });
	}

	Ok(value)
}

fn require_amount(amount_in_minor: u64) -> Result<u64> {
	if amount_in_minor == 0 {
		return Err(Error::InvalidInput {
			field: "amount_in_minor",
			reason: "must be greater than zero".into(),
		});
	}

	Ok(amount_in_minor)
}

fn normalize_currency(currency: &str) -> Result<String> {
	let currency = currency.trim();

	if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_alphabetic()) {
		return Err(Error::InvalidInput {
			field: "currency",
			reason: format!("expected a three-letter ISO 4217 code, got `{currency}`"),
		});
	}

	Ok(currency.to_ascii_uppercase())
}

fn to_json_body<T>(body: &T) -> Result<Vec<u8>>
where
	T: Serialize,
{
	serde_json::to_vec(body)
		.map_err(|e| Error::Encoding { what: "request body", reason: e.to_string() })
}

/// Formats `instant` as RFC 3339 UTC with millisecond precision (`2025-01-01T00:00:00.000Z`).
pub fn format_timestamp(instant: OffsetDateTime) -> Result<String> {
	instant
		.to_offset(UtcOffset::UTC)
		.format(format_description!(
			"[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
		))
		.map_err(|e| Error::Encoding { what: "timestamp", reason: e.to_string() })
}
