//! Transport primitives for signed token exchanges and API calls.
//!
//! [`ApiHttpClient`] is the broker's only dependency on an HTTP stack. It receives fully
//! signed [`OutboundRequest`]s and must transmit the headers and body unchanged; anything it
//! adds (connection headers, `Content-Length`) is outside the signed set and ignored by the
//! verifier. Custom transports (recording fakes, proxies, alternative clients) implement the
//! trait directly.

// crates.io
use url::Position;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	sign::{Method, SignedRequest},
};

/// Boxed future returned by [`ApiHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpReply, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of sending signed requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the token
/// manager and the API client behind an `Arc`.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with the raw status + body.
	///
	/// Transport failures (DNS, TCP, TLS, body read) map to [`TransportError`]; non-2xx
	/// statuses are *not* errors at this layer.
	fn execute(&self, request: OutboundRequest) -> HttpFuture<'_>;
}

/// Signed request paired with its absolute destination.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL; its path + query equals the signed path.
	pub url: Url,
	/// Headers to transmit, signature header included.
	pub headers: Vec<(String, String)>,
	/// Body to transmit.
	pub body: Vec<u8>,
	/// Short label of the endpoint, used in transport diagnostics.
	pub target: &'static str,
}
impl OutboundRequest {
	/// Pairs a [`SignedRequest`] with the URL it was signed for.
	pub fn new(url: Url, signed: SignedRequest, target: &'static str) -> Self {
		let SignedRequest { method, headers, body, .. } = signed;

		Self { method, url, headers, body, target }
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Raw HTTP reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Appends percent-encoded `segments` to `base`, keeping any base path prefix.
pub fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, ConfigError> {
	let mut url = base.clone();

	url.set_query(None);
	url.set_fragment(None);
	url.path_segments_mut()
		.map_err(|_| ConfigError::InvalidSetting {
			name: "endpoint",
			reason: format!("`{base}` cannot carry a path"),
		})?
		.pop_if_empty()
		.extend(segments);

	Ok(url)
}

/// Returns the path plus query string (no scheme, host, or fragment), as signed.
pub fn path_and_query(url: &Url) -> String {
	url[Position::BeforePath..Position::AfterQuery].to_owned()
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Signed requests must not follow redirects: the signature binds the original path, so a
/// redirected request would arrive with a signature for a different resource.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client with redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`]. Configure it to disable redirects.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl std::ops::Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn execute(&self, request: OutboundRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let OutboundRequest { method, url, headers, body, target } = request;
			let method = match method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
			};
			let mut builder = self.0.request(method, url);

			for (name, value) in headers {
				builder = builder.header(name, value);
			}
			if !body.is_empty() {
				builder = builder.body(body);
			}

			let response =
				builder.send().await.map_err(|e| TransportError::network(target, e))?;
			let status = response.status().as_u16();
			let body =
				response.bytes().await.map_err(|e| TransportError::network(target, e))?.to_vec();

			Ok(HttpReply { status, body })
		})
	}
}
