//! Line-oriented JSON-RPC 2.0 front end for [`PaymentTools`].
//!
//! Each input line carries one message. Requests receive exactly one response, notifications
//! (messages without an `id`) receive none.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	http::ApiHttpClient,
	tools::{PaymentTools, ToolOutcome},
};

/// Protocol revision announced when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name announced by `initialize`.
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// JSON-RPC error object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RpcError {
	/// Standard JSON-RPC error code.
	pub code: i64,
	/// Short description.
	pub message: String,
}
impl RpcError {
	/// `-32700`: the line is not valid JSON.
	pub fn parse_error(message: impl Into<String>) -> Self {
		Self { code: -32700, message: message.into() }
	}

	/// `-32600`: the message is not a valid request object.
	pub fn invalid_request(message: impl Into<String>) -> Self {
		Self { code: -32600, message: message.into() }
	}

	/// `-32601`: the method is unknown.
	pub fn method_not_found(method: &str) -> Self {
		Self { code: -32601, message: format!("method not found: {method}") }
	}

	/// `-32602`: the parameters are unusable.
	pub fn invalid_params(message: impl Into<String>) -> Self {
		Self { code: -32602, message: message.into() }
	}
}

impl<C> PaymentTools<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Handles one input line and returns the response to write back, if any.
	pub async fn handle_line(&self, line: &str) -> Option<Value> {
		let line = line.trim();

		if line.is_empty() {
			return None;
		}

		match serde_json::from_str::<Value>(line) {
			Ok(message) => self.handle_message(message).await,
			Err(e) => Some(error_response(Value::Null, RpcError::parse_error(e.to_string()))),
		}
	}

	/// Handles one decoded message.
	pub async fn handle_message(&self, message: Value) -> Option<Value> {
		let Some(object) = message.as_object() else {
			return Some(error_response(
				Value::Null,
				RpcError::invalid_request("message must be a JSON object"),
			));
		};
		let id = object.get("id").cloned();

		if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
			return Some(error_response(
				id.unwrap_or(Value::Null),
				RpcError::invalid_request("jsonrpc must be \"2.0\""),
			));
		}

		let Some(method) = object.get("method").and_then(Value::as_str) else {
			// Responses to server-initiated requests; this server never issues any.
			return id.map(|id| error_response(id, RpcError::invalid_request("missing method")));
		};
		let id = id?;
		let params = object.get("params").cloned().unwrap_or(Value::Null);

		Some(match self.handle_request(method, params).await {
			Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
			Err(e) => error_response(id, e),
		})
	}

	async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
		match method {
			"initialize" => {
				let version = params
					.get("protocolVersion")
					.and_then(Value::as_str)
					.unwrap_or(DEFAULT_PROTOCOL_VERSION);

				Ok(json!({
					"protocolVersion": version,
					"capabilities": { "tools": { "listChanged": false } },
					"serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
				}))
			},
			"ping" => Ok(json!({})),
			"tools/list" => Ok(json!({ "tools": self.specs() })),
			"tools/call" => self.handle_tools_call(params).await,
			_ => Err(RpcError::method_not_found(method)),
		}
	}

	async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
		let name = params
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| RpcError::invalid_params("tools/call requires a string `name`"))?;
		let arguments = match params.get("arguments") {
			Some(arguments @ Value::Object(_)) => arguments.clone(),
			Some(Value::Null) | None => Value::Null,
			Some(_) =>
				return Err(RpcError::invalid_params("tools/call `arguments` must be an object")),
		};
		let outcome = self.call(name, arguments).await;

		Ok(json!({
			"content": [{ "type": "text", "text": outcome.to_text() }],
			"isError": matches!(outcome, ToolOutcome::Failure(_)),
		}))
	}
}

fn error_response(id: Value, error: RpcError) -> Value {
	json!({ "jsonrpc": "2.0", "id": id, "error": error })
}
