//! Signed, token-caching payments API client: client-credentials token lifecycle, ES512
//! request signing, and tool-callable payment operations in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod sign;
pub mod tools;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		api::PaymentsClient,
		config::{ClientSettings, Credential, Endpoints},
		http::ReqwestHttpClient,
	};

	/// SEC1 PEM of the P-521 key used across tests.
	pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/ec512-private.pem");
	/// Key identifier paired with [`TEST_PRIVATE_KEY_PEM`].
	pub const TEST_KEY_ID: &str = "test-kid";
	/// Client identifier used by test credentials.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Client secret used by test credentials.
	pub const TEST_CLIENT_SECRET: &str = "secret-test";
	/// Merchant account configured on test clients.
	pub const TEST_MERCHANT_ACCOUNT_ID: &str = "merchant-test";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a test credential pointing both endpoints at the given (mock) base URLs.
	pub fn test_credential(auth_url: &str, api_url: &str) -> Credential {
		let endpoints = Endpoints::parse(auth_url, api_url)
			.expect("Mock server URLs should be valid endpoints.");

		Credential::new(
			TEST_KEY_ID,
			TEST_PRIVATE_KEY_PEM,
			TEST_CLIENT_ID,
			TEST_CLIENT_SECRET,
			endpoints,
		)
	}

	/// Constructs a [`PaymentsClient`] backed by the reqwest transport used across integration
	/// tests, signing with the fixture key.
	pub fn build_reqwest_test_client(
		auth_url: &str,
		api_url: &str,
	) -> PaymentsClient<ReqwestHttpClient> {
		PaymentsClient::with_http_client(
			test_credential(auth_url, api_url),
			ClientSettings::new(TEST_MERCHANT_ACCOUNT_ID).with_user_agent("payments-broker-test"),
			test_reqwest_http_client(),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
#[cfg(feature = "server")] use {tokio as _, tracing_subscriber as _};
