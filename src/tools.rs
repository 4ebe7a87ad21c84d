//! Tool registry exposing [`PaymentsClient`] operations to a tool-calling host.
//!
//! Every operation is published under a stable snake_case name with a JSON input schema.
//! [`PaymentTools::call`] never fails: argument decoding errors, unknown tools, and every
//! [`Error`] raised by the client are folded into [`ToolOutcome::Failure`] text so a host
//! always receives either the upstream JSON or a readable message.

pub mod rpc;

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	api::{
		CreatePaymentLink, CreatePayout, ListTransactions, MAX_EXPIRES_IN_HOURS, PaymentsClient,
	},
	http::ApiHttpClient,
};

/// Result of one tool invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutcome {
	/// Raw JSON returned by the operation.
	Success(Value),
	/// Human-readable failure description.
	Failure(String),
}
impl ToolOutcome {
	/// Returns `true` for [`ToolOutcome::Failure`].
	pub fn is_failure(&self) -> bool {
		matches!(self, ToolOutcome::Failure(_))
	}

	/// Renders the outcome as text for hosts that only accept strings.
	pub fn to_text(&self) -> String {
		match self {
			ToolOutcome::Success(value) =>
				serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
			ToolOutcome::Failure(message) => message.clone(),
		}
	}
}

/// Published descriptor of one tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
	/// Stable tool name.
	pub name: &'static str,
	/// What the tool does, shown to the assistant.
	pub description: &'static str,
	/// JSON Schema of the accepted arguments.
	#[serde(rename = "inputSchema")]
	pub input_schema: Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PayoutArgs {
	payout_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PaymentArgs {
	payment_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PaymentLinkArgs {
	payment_link_id: String,
}

/// Dispatches named tool calls onto one [`PaymentsClient`].
pub struct PaymentTools<C>
where
	C: ?Sized + ApiHttpClient,
{
	client: PaymentsClient<C>,
}
impl<C> PaymentTools<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Wraps `client`.
	pub fn new(client: PaymentsClient<C>) -> Self {
		Self { client }
	}

	/// Returns the wrapped client.
	pub fn client(&self) -> &PaymentsClient<C> {
		&self.client
	}

	/// Lists every published tool.
	pub fn specs(&self) -> Vec<ToolSpec> {
		tool_specs()
	}

	/// Invokes tool `name`; failures of any kind become [`ToolOutcome::Failure`].
	pub async fn call(&self, name: &str, arguments: Value) -> ToolOutcome {
		match self.dispatch(name, arguments).await {
			Ok(value) => ToolOutcome::Success(value),
			Err(e) => ToolOutcome::Failure(describe_failure(name, &e)),
		}
	}

	async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value> {
		match name {
			"get_merchant_account" => {
				decode::<NoArgs>(arguments)?;

				serde_json::to_value(self.client.merchant_account())
					.map_err(|e| Error::Encoding { what: "tool result", reason: e.to_string() })
			},
			"list_merchant_accounts" => {
				decode::<NoArgs>(arguments)?;

				self.client.list_merchant_accounts().await
			},
			"get_payout" => {
				let args = decode::<PayoutArgs>(arguments)?;

				self.client.get_payout(&args.payout_id).await
			},
			"get_payment" => {
				let args = decode::<PaymentArgs>(arguments)?;

				self.client.get_payment(&args.payment_id).await
			},
			"get_payment_link" => {
				let args = decode::<PaymentLinkArgs>(arguments)?;

				self.client.get_payment_link(&args.payment_link_id).await
			},
			"create_payout" => self.client.create_payout(decode::<CreatePayout>(arguments)?).await,
			"create_payment_link" =>
				self.client.create_payment_link(decode::<CreatePaymentLink>(arguments)?).await,
			"list_transactions" =>
				self.client.list_transactions(decode::<ListTransactions>(arguments)?).await,
			_ =>
				Err(Error::InvalidInput { field: "name", reason: format!("unknown tool `{name}`") }),
		}
	}
}
impl<C> Debug for PaymentTools<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PaymentTools").field("client", &self.client).finish()
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

fn describe_failure(name: &str, error: &Error) -> String {
	let mut text = format!("{name} failed: {error}");
	let mut source = std::error::Error::source(error);

	while let Some(cause) = source {
		text.push_str(&format!(" Caused by: {cause}"));

		source = cause.source();
	}

	text
}

/// Decodes tool arguments, treating `null` as an empty object and reporting the failing path.
fn decode<T>(arguments: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	let arguments = if arguments.is_null() { Value::Object(Default::default()) } else { arguments };

	serde_path_to_error::deserialize(arguments)
		.map_err(|e| Error::InvalidInput { field: "arguments", reason: e.to_string() })
}

fn id_schema(field: &str, description: &str) -> Value {
	json!({
		"type": "object",
		"properties": { field: { "type": "string", "description": description } },
		"required": [field],
		"additionalProperties": false
	})
}

fn empty_schema() -> Value {
	json!({ "type": "object", "properties": {}, "additionalProperties": false })
}

fn tool_specs() -> Vec<ToolSpec> {
	vec![
		ToolSpec {
			name: "get_merchant_account",
			description: "Return the configured merchant account and client identifiers.",
			input_schema: empty_schema(),
		},
		ToolSpec {
			name: "list_merchant_accounts",
			description: "List merchant accounts available to the client.",
			input_schema: empty_schema(),
		},
		ToolSpec {
			name: "get_payout",
			description: "Fetch a payout by identifier.",
			input_schema: id_schema("payout_id", "Payout identifier."),
		},
		ToolSpec {
			name: "get_payment",
			description: "Fetch a payment by identifier.",
			input_schema: id_schema("payment_id", "Payment identifier."),
		},
		ToolSpec {
			name: "get_payment_link",
			description: "Fetch a payment link by identifier.",
			input_schema: id_schema("payment_link_id", "Payment link identifier."),
		},
		ToolSpec {
			name: "create_payout",
			description: "Pay out funds from a merchant account to a beneficiary.",
			input_schema: json!({
				"type": "object",
				"properties": {
					"amount_in_minor": { "type": "integer", "minimum": 1 },
					"currency": { "type": "string", "description": "ISO 4217 code, e.g. GBP." },
					"merchant_account_id": { "type": "string" },
					"beneficiary": {
						"type": "object",
						"description": "Tagged by `type`: external_account, payment_source, or business_account.",
						"properties": {
							"type": {
								"type": "string",
								"enum": ["external_account", "payment_source", "business_account"]
							},
							"reference": { "type": "string" },
							"account_holder_name": { "type": "string" },
							"account_identifier": {
								"type": "object",
								"description": "Tagged by `type`: sort_code_account_number or iban."
							},
							"payment_source_id": { "type": "string" },
							"user_id": { "type": "string" }
						},
						"required": ["type", "reference"]
					},
					"metadata": { "type": "object", "additionalProperties": { "type": "string" } }
				},
				"required": ["amount_in_minor", "currency", "beneficiary"]
			}),
		},
		ToolSpec {
			name: "create_payment_link",
			description: "Create a single-use payment link into a merchant account.",
			input_schema: json!({
				"type": "object",
				"properties": {
					"amount_in_minor": { "type": "integer", "minimum": 1 },
					"currency": { "type": "string" },
					"merchant_account_id": { "type": "string" },
					"reference": { "type": "string" },
					"user": {
						"type": "object",
						"properties": {
							"name": { "type": "string" },
							"email": { "type": "string" }
						}
					},
					"expires_in_hours": {
						"type": "integer",
						"minimum": 1,
						"maximum": MAX_EXPIRES_IN_HOURS
					}
				},
				"required": ["amount_in_minor", "currency"]
			}),
		},
		ToolSpec {
			name: "list_transactions",
			description: "List merchant account transactions; defaults to the trailing 30 days.",
			input_schema: json!({
				"type": "object",
				"properties": {
					"merchant_account_id": { "type": "string" },
					"from": { "type": "string", "description": "RFC 3339 lower bound." },
					"to": { "type": "string", "description": "RFC 3339 upper bound." },
					"cursor": { "type": "string", "description": "Pagination cursor." }
				}
			}),
		},
	]
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn specs_cover_every_operation_once() {
		let names = tool_specs().into_iter().map(|spec| spec.name).collect::<Vec<_>>();

		assert_eq!(names, [
			"get_merchant_account",
			"list_merchant_accounts",
			"get_payout",
			"get_payment",
			"get_payment_link",
			"create_payout",
			"create_payment_link",
			"list_transactions",
		]);
	}

	#[test]
	fn decode_reports_failing_path() {
		let err = decode::<CreatePayout>(json!({
			"amount_in_minor": 10,
			"currency": "GBP",
			"beneficiary": { "type": "business_account", "reference": 7 }
		}))
		.err()
		.expect("Numeric reference should fail to decode.");

		assert!(err.to_string().contains("beneficiary"));
	}

	#[test]
	fn null_arguments_decode_as_empty_object() {
		let args = decode::<ListTransactions>(Value::Null).expect("Null should decode as defaults.");

		assert_eq!(args, ListTransactions::default());
		assert!(decode::<NoArgs>(json!({ "extra": 1 })).is_err());
	}

	#[test]
	fn failure_text_includes_causes() {
		let error = Error::from(crate::error::TransportError::from(std::io::Error::other("reset")));
		let text = describe_failure("get_payment", &error);

		assert!(text.starts_with("get_payment failed: "));
		assert!(text.ends_with("Caused by: reset"));
	}

	#[test]
	fn outcome_text_rendering() {
		assert_eq!(ToolOutcome::Failure("nope".into()).to_text(), "nope");
		assert!(ToolOutcome::Failure(String::new()).is_failure());
		assert_eq!(ToolOutcome::Success(json!({ "a": 1 })).to_text(), "{\n  \"a\": 1\n}");
	}
}
