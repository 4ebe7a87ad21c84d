// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use payments_broker::{
	_preludet::*,
	http::ReqwestHttpClient,
	tools::{PaymentTools, ToolOutcome},
};

fn offline_tools() -> PaymentTools<ReqwestHttpClient> {
	// Nothing listens on the discard port; only handlers that stay local are exercised.
	PaymentTools::new(build_reqwest_test_client("http://127.0.0.1:9", "http://127.0.0.1:9"))
}

async fn rpc(tools: &PaymentTools<ReqwestHttpClient>, message: Value) -> Value {
	tools
		.handle_line(&message.to_string())
		.await
		.expect("Requests with an id should receive a response.")
}

#[tokio::test]
async fn merchant_account_tool_stays_local() {
	let tools = offline_tools();
	let outcome = tools.call("get_merchant_account", Value::Null).await;

	assert_eq!(
		outcome,
		ToolOutcome::Success(json!({
			"merchant_account_id": TEST_MERCHANT_ACCOUNT_ID,
			"client_id": TEST_CLIENT_ID,
			"api_endpoint": "http://127.0.0.1:9/",
		}))
	);
}

#[tokio::test]
async fn dispatch_failures_become_text() {
	let tools = offline_tools();
	let unknown = tools.call("refund_everything", json!({})).await;
	let missing = tools.call("get_payment", json!({})).await;
	let invalid = tools
		.call("create_payment_link", json!({ "amount_in_minor": 0, "currency": "GBP" }))
		.await;

	assert!(matches!(unknown, ToolOutcome::Failure(ref text) if text.contains("refund_everything")));
	assert!(matches!(missing, ToolOutcome::Failure(ref text) if text.contains("payment_id")));
	assert!(matches!(invalid, ToolOutcome::Failure(ref text) if text.contains("amount_in_minor")));
}

#[tokio::test]
async fn upstream_failure_is_reported_not_raised() {
	let server = MockServer::start_async().await;
	let tools =
		PaymentTools::new(build_reqwest_test_client(&server.base_url(), &server.base_url()));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"tool-token","expires_in":3600}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v3/payouts/po_9");
			then.status(500).body("upstream exploded");
		})
		.await;

	let outcome = tools.call("get_payout", json!({ "payout_id": "po_9" })).await;

	assert!(matches!(outcome, ToolOutcome::Failure(ref text) if text.contains("500")));
}

#[tokio::test]
async fn rpc_initialize_and_list_tools() {
	let tools = offline_tools();
	let init = rpc(&tools, json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }))
		.await;
	let list = rpc(&tools, json!({ "jsonrpc": "2.0", "id": "two", "method": "tools/list" })).await;

	assert_eq!(init["id"], 1);
	assert_eq!(init["result"]["serverInfo"]["name"], "payments-broker");
	assert_eq!(list["id"], "two");
	assert_eq!(list["result"]["tools"].as_array().map(Vec::len), Some(8));
	assert!(list["result"]["tools"][0]["inputSchema"].is_object());
}

#[tokio::test]
async fn rpc_tools_call_wraps_outcome() {
	let tools = offline_tools();
	let ok = rpc(&tools, json!({
		"jsonrpc": "2.0",
		"id": 3,
		"method": "tools/call",
		"params": { "name": "get_merchant_account" }
	}))
	.await;
	let failed = rpc(&tools, json!({
		"jsonrpc": "2.0",
		"id": 4,
		"method": "tools/call",
		"params": { "name": "nope", "arguments": {} }
	}))
	.await;

	assert_eq!(ok["result"]["isError"], false);
	assert!(
		ok["result"]["content"][0]["text"]
			.as_str()
			.is_some_and(|text| text.contains(TEST_MERCHANT_ACCOUNT_ID))
	);
	assert_eq!(failed["result"]["isError"], true);
	assert_eq!(failed["result"]["content"][0]["type"], "text");
}

#[tokio::test]
async fn rpc_protocol_errors_and_notifications() {
	let tools = offline_tools();
	let unknown = rpc(&tools, json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" })).await;
	let garbage = tools.handle_line("{not json").await.expect("Parse errors should be answered.");
	let bad_params =
		rpc(&tools, json!({ "jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {} })).await;

	assert_eq!(unknown["error"]["code"], -32601);
	assert_eq!(garbage["error"]["code"], -32700);
	assert_eq!(garbage["id"], Value::Null);
	assert_eq!(bad_params["error"]["code"], -32602);
	assert!(
		tools
			.handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
			.await
			.is_none()
	);
	assert!(tools.handle_line("   ").await.is_none());
}
