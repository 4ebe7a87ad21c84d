//! Single-use payment link creation (`POST /v3/payment-links`).

// crates.io
use serde_json::Value;
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	api::{self, PaymentsClient},
	config::ClientSettings,
	http::ApiHttpClient,
	obs::{self, CallKind},
	sign::Method,
};

/// Longest accepted `expires_in_hours` (one year).
pub const MAX_EXPIRES_IN_HOURS: u32 = 24 * 365;

/// Arguments for [`PaymentsClient::create_payment_link`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentLink {
	/// Amount in the currency's minor unit.
	pub amount_in_minor: u64,
	/// ISO 4217 currency code.
	pub currency: String,
	/// Receiving merchant account; the configured account when omitted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_account_id: Option<String>,
	/// Reference shown to the payer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reference: Option<String>,
	/// Optional payer details.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<LinkUser>,
	/// Link lifetime override, in hours.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in_hours: Option<u32>,
}
impl CreatePaymentLink {
	/// Creates arguments for `amount_in_minor` of `currency` with every option unset.
	pub fn new(amount_in_minor: u64, currency: impl Into<String>) -> Self {
		Self {
			amount_in_minor,
			currency: currency.into(),
			merchant_account_id: None,
			reference: None,
			user: None,
			expires_in_hours: None,
		}
	}

	/// Validates the arguments and builds the request body, expiring `now` + lifetime.
	///
	/// The payer receives a freshly generated user identifier on every call.
	pub fn into_body(
		self,
		settings: &ClientSettings,
		now: OffsetDateTime,
	) -> Result<PaymentLinkBody> {
		let ttl = match self.expires_in_hours {
			Some(0) =>
				return Err(Error::InvalidInput {
					field: "expires_in_hours",
					reason: "must be greater than zero".into(),
				}),
			Some(hours) if hours > MAX_EXPIRES_IN_HOURS =>
				return Err(Error::InvalidInput {
					field: "expires_in_hours",
					reason: format!("must not exceed {MAX_EXPIRES_IN_HOURS}"),
				}),
			Some(hours) => Duration::hours(hours.into()),
			None => settings.payment_link_ttl,
		};
		let expires_at = now.checked_add(ttl).ok_or_else(|| Error::InvalidInput {
			field: "expires_in_hours",
			reason: "expiry falls outside the representable date range".into(),
		})?;
		let merchant_account_id = self
			.merchant_account_id
			.map(|id| id.trim().to_owned())
			.filter(|id| !id.is_empty())
			.unwrap_or_else(|| settings.merchant_account_id.clone());
		let user = self.user.unwrap_or_default();

		Ok(PaymentLinkBody {
			kind: "single_use",
			expires_at: api::format_timestamp(expires_at)?,
			reference: self.reference.filter(|reference| !reference.trim().is_empty()),
			payment_configuration: PaymentConfiguration {
				amount_in_minor: api::require_amount(self.amount_in_minor)?,
				currency: api::normalize_currency(&self.currency)?,
				payment_method: PaymentMethod {
					kind: "bank_transfer",
					provider_selection: ProviderSelection { kind: "user_selected" },
					beneficiary: MerchantBeneficiary {
						kind: "merchant_account",
						merchant_account_id,
					},
				},
				user: PayerBody {
					id: Uuid::new_v4().to_string(),
					name: user.name,
					email: user.email,
				},
			},
		})
	}
}

/// Payer details attached to a payment link.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUser {
	/// Payer display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Payer e-mail address.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
}

/// Wire body of a payment link creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentLinkBody {
	/// Link type; always `single_use`.
	#[serde(rename = "type")]
	pub kind: &'static str,
	/// RFC 3339 expiry instant.
	pub expires_at: String,
	/// Reference shown to the payer.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reference: Option<String>,
	/// Amount, currency, payment method, and payer.
	pub payment_configuration: PaymentConfiguration,
}

/// Payment configuration nested in [`PaymentLinkBody`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentConfiguration {
	/// Amount in minor units.
	pub amount_in_minor: u64,
	/// Upper-case ISO 4217 code.
	pub currency: String,
	/// Bank transfer into the merchant account.
	pub payment_method: PaymentMethod,
	/// Payer with a generated identifier.
	pub user: PayerBody,
}

/// Payment method nested in [`PaymentConfiguration`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentMethod {
	/// Always `bank_transfer`.
	#[serde(rename = "type")]
	pub kind: &'static str,
	/// Payer picks their bank.
	pub provider_selection: ProviderSelection,
	/// Receiving merchant account.
	pub beneficiary: MerchantBeneficiary,
}

/// Provider selection nested in [`PaymentMethod`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderSelection {
	/// Always `user_selected`.
	#[serde(rename = "type")]
	pub kind: &'static str,
}

/// Merchant account beneficiary nested in [`PaymentMethod`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MerchantBeneficiary {
	/// Always `merchant_account`.
	#[serde(rename = "type")]
	pub kind: &'static str,
	/// Receiving merchant account.
	pub merchant_account_id: String,
}

/// Payer nested in [`PaymentConfiguration`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PayerBody {
	/// Generated end-user identifier.
	pub id: String,
	/// Payer display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Payer e-mail address.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
}

impl<C> PaymentsClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a single-use payment link; each call carries a fresh idempotency key.
	pub async fn create_payment_link(&self, request: CreatePaymentLink) -> Result<Value> {
		obs::observe(CallKind::CreatePaymentLink, "create_payment_link", async move {
			let body = request.into_body(self.settings(), OffsetDateTime::now_utc())?;
			let body = api::to_json_body(&body)?;
			let url = self.api_url(&["v3", "payment-links"])?;

			self.send(Method::Post, url, Some(body)).await
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::{format_description::well_known::Rfc3339, macros::datetime};
	// self
	use super::*;

	#[test]
	fn body_round_trips_amount_and_future_expiry() {
		let settings = ClientSettings::new("m-1");
		let now = OffsetDateTime::now_utc();
		let mut request = CreatePaymentLink::new(5000, "GBP");

		request.merchant_account_id = Some("m-1".into());

		let body = request.into_body(&settings, now).expect("Valid link should render.");
		let json = serde_json::to_value(&body).expect("Body should serialize.");
		let expires_at = OffsetDateTime::parse(
			json["expires_at"].as_str().expect("expires_at should be a string."),
			&Rfc3339,
		)
		.expect("expires_at should be RFC 3339.");

		assert_eq!(json["type"], "single_use");
		assert_eq!(json["payment_configuration"]["amount_in_minor"], 5000);
		assert_eq!(json["payment_configuration"]["currency"], "GBP");
		assert_eq!(
			json["payment_configuration"]["payment_method"]["beneficiary"]["merchant_account_id"],
			"m-1"
		);
		assert!(expires_at > now);
		assert!(json.get("reference").is_none());
	}

	#[test]
	fn expiry_defaults_to_configured_ttl_and_accepts_override() {
		let settings = ClientSettings::new("m-1");
		let now = datetime!(2025-06-01 12:00 UTC);
		let default = CreatePaymentLink::new(100, "EUR")
			.into_body(&settings, now)
			.expect("Default expiry should render.");
		let mut custom = CreatePaymentLink::new(100, "EUR");

		custom.expires_in_hours = Some(2);

		let custom = custom.into_body(&settings, now).expect("Override should render.");

		assert_eq!(default.expires_at, "2025-06-02T12:00:00.000Z");
		assert_eq!(custom.expires_at, "2025-06-01T14:00:00.000Z");
	}

	#[test]
	fn each_link_gets_a_fresh_user_id() {
		let settings = ClientSettings::new("m-1");
		let now = OffsetDateTime::now_utc();
		let link = || {
			CreatePaymentLink::new(1, "GBP")
				.into_body(&settings, now)
				.expect("Link should render.")
		};
		let (first, second) = (link(), link());

		assert_ne!(first.payment_configuration.user.id, second.payment_configuration.user.id);
	}

	#[test]
	fn out_of_range_lifetimes_are_rejected() {
		let now = OffsetDateTime::now_utc();

		for hours in [0, MAX_EXPIRES_IN_HOURS + 1, u32::MAX] {
			let mut request = CreatePaymentLink::new(1, "GBP");

			request.expires_in_hours = Some(hours);

			assert!(
				matches!(
					request.into_body(&ClientSettings::new("m-1"), now),
					Err(Error::InvalidInput { field: "expires_in_hours", .. })
				),
				"{hours} hours should be rejected."
			);
		}

		let mut longest = CreatePaymentLink::new(1, "GBP");

		longest.expires_in_hours = Some(MAX_EXPIRES_IN_HOURS);

		assert!(longest.into_body(&ClientSettings::new("m-1"), now).is_ok());
	}

	#[test]
	fn oversized_configured_lifetime_fails_without_panicking() {
		let settings = ClientSettings::new("m-1").with_payment_link_ttl(Duration::MAX);

		assert!(matches!(
			CreatePaymentLink::new(1, "GBP").into_body(&settings, OffsetDateTime::now_utc()),
			Err(Error::InvalidInput { field: "expires_in_hours", .. })
		));
	}
}
