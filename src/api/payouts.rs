//! Payout creation (`POST /v3/payouts`).

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	api::{self, PaymentsClient},
	http::ApiHttpClient,
	obs::{self, CallKind},
	sign::Method,
};

/// Arguments for [`PaymentsClient::create_payout`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayout {
	/// Amount in the currency's minor unit (pence, cents).
	pub amount_in_minor: u64,
	/// ISO 4217 currency code.
	pub currency: String,
	/// Source merchant account; the configured account when omitted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_account_id: Option<String>,
	/// Who receives the funds.
	pub beneficiary: Beneficiary,
	/// Free-form metadata echoed back by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<BTreeMap<String, String>>,
}
impl CreatePayout {
	/// Validates the arguments and renders the JSON request body.
	pub fn to_body(&self, default_merchant_account_id: &str) -> Result<Vec<u8>> {
		let merchant_account_id = self
			.merchant_account_id
			.as_deref()
			.map(str::trim)
			.filter(|id| !id.is_empty())
			.unwrap_or(default_merchant_account_id);

		self.beneficiary.validate()?;

		api::to_json_body(&PayoutBody {
			merchant_account_id,
			amount_in_minor: api::require_amount(self.amount_in_minor)?,
			currency: api::normalize_currency(&self.currency)?,
			beneficiary: &self.beneficiary,
			metadata: self.metadata.as_ref(),
		})
	}
}

/// Payout destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Beneficiary {
	/// Any external bank account.
	ExternalAccount {
		/// Name on the receiving account.
		account_holder_name: String,
		/// Routing details of the receiving account.
		account_identifier: AccountIdentifier,
		/// Reference shown on the beneficiary's statement.
		reference: String,
	},
	/// Account a previous payment was made from.
	PaymentSource {
		/// Payment source identifier.
		payment_source_id: String,
		/// User the payment source belongs to.
		user_id: String,
		/// Reference shown on the beneficiary's statement.
		reference: String,
	},
	/// The business account registered with the API provider.
	BusinessAccount {
		/// Reference shown on the beneficiary's statement.
		reference: String,
	},
}
impl Beneficiary {
	/// Returns the statement reference.
	pub fn reference(&self) -> &str {
		match self {
			Beneficiary::ExternalAccount { reference, .. }
			| Beneficiary::PaymentSource { reference, .. }
			| Beneficiary::BusinessAccount { reference } => reference,
		}
	}

	fn validate(&self) -> Result<()> {
		if self.reference().trim().is_empty() {
			return Err(Error::InvalidInput {
				field: "beneficiary.reference",
				reason: "must not be empty".into(),
			});
		}

		match self {
			Beneficiary::ExternalAccount { account_holder_name, account_identifier, .. } => {
				if account_holder_name.trim().is_empty() {
					return Err(Error::InvalidInput {
						field: "beneficiary.account_holder_name",
						reason: "must not be empty".into(),
					});
				}

				account_identifier.validate()
			},
			Beneficiary::PaymentSource { payment_source_id, user_id, .. } => {
				api::require_id("beneficiary.payment_source_id", payment_source_id)?;
				api::require_id("beneficiary.user_id", user_id)?;

				Ok(())
			},
			Beneficiary::BusinessAccount { .. } => Ok(()),
		}
	}
}

/// Bank routing details of an external account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountIdentifier {
	/// UK sort code + account number.
	SortCodeAccountNumber {
		/// Six-digit sort code.
		sort_code: String,
		/// Eight-digit account number.
		account_number: String,
	},
	/// International bank account number.
	Iban {
		/// IBAN without spaces.
		iban: String,
	},
}
impl AccountIdentifier {
	fn validate(&self) -> Result<()> {
		match self {
			AccountIdentifier::SortCodeAccountNumber { sort_code, account_number } => {
				if !is_digits(sort_code, 6) {
					return Err(Error::InvalidInput {
						field: "beneficiary.account_identifier.sort_code",
						reason: "expected six digits".into(),
					});
				}
				if !is_digits(account_number, 8) {
					return Err(Error::InvalidInput {
						field: "beneficiary.account_identifier.account_number",
						reason: "expected eight digits".into(),
					});
				}
			},
			AccountIdentifier::Iban { iban } =>
				if iban.len() < 15 || !iban.bytes().all(|b| b.is_ascii_alphanumeric()) {
					return Err(Error::InvalidInput {
						field: "beneficiary.account_identifier.iban",
						reason: "expected an IBAN without spaces".into(),
					});
				},
		}

		Ok(())
	}
}

#[derive(Serialize)]
struct PayoutBody<'a> {
	merchant_account_id: &'a str,
	amount_in_minor: u64,
	currency: String,
	beneficiary: &'a Beneficiary,
	#[serde(skip_serializing_if = "Option::is_none")]
	metadata: Option<&'a BTreeMap<String, String>>,
}

impl<C> PaymentsClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a payout; each call carries a fresh idempotency key.
	pub async fn create_payout(&self, request: CreatePayout) -> Result<Value> {
		obs::observe(CallKind::CreatePayout, "create_payout", async move {
			let body = request.to_body(&self.settings().merchant_account_id)?;
			let url = self.api_url(&["v3", "payouts"])?;

			self.send(Method::Post, url, Some(body)).await
		})
		.await
	}
}

fn is_digits(value: &str, len: usize) -> bool {
	value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}
