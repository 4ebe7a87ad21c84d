//! Broker-level error types shared across token exchange, signing, and API operations.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request could not be signed; nothing was transmitted.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Upstream replied with a body the broker cannot interpret.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),

	/// Token endpoint rejected the client-credentials exchange.
	#[error("Token exchange failed with HTTP {status}: {body_preview}.")]
	AuthExchange {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Truncated response body for diagnostics.
		body_preview: String,
	},
	/// Business API call returned a non-2xx status.
	#[error("Upstream API returned HTTP {status}: {body_preview}.")]
	UpstreamApi {
		/// HTTP status code returned by the API.
		status: u16,
		/// Truncated response body for diagnostics.
		body_preview: String,
	},
	/// A value built by the broker could not be encoded for the wire.
	#[error("Could not encode the {what}: {reason}.")]
	Encoding {
		/// What was being encoded.
		what: &'static str,
		/// Encoder diagnostic.
		reason: String,
	},
	/// Caller-supplied argument failed validation before any request was built.
	#[error("Invalid `{field}`: {reason}.")]
	InvalidInput {
		/// Offending argument name.
		field: &'static str,
		/// Human-readable validation failure.
		reason: String,
	},
}
impl Error {
	/// Builds an [`Error::AuthExchange`] from a raw token endpoint reply.
	pub fn auth_exchange(status: u16, body: &[u8]) -> Self {
		Self::AuthExchange { status, body_preview: body_preview(body) }
	}

	/// Builds an [`Error::UpstreamApi`] from a raw API reply.
	pub fn upstream_api(status: u16, body: &[u8]) -> Self {
		Self::UpstreamApi { status, body_preview: body_preview(body) }
	}

	/// Returns the HTTP status code carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthExchange { status, .. } | Self::UpstreamApi { status, .. } => Some(*status),
			Self::MalformedResponse(
				MalformedResponseError::InvalidJson { status, .. }
				| MalformedResponseError::TrailingData { status, .. },
			) => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while assembling the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required environment variable is absent or blank.
	#[error("Environment variable `{name}` is required.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// Setting value cannot be interpreted.
	#[error("Setting `{name}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting or variable name.
		name: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Endpoint URL cannot be parsed.
	#[error("Endpoint `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Endpoint label.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint uses plain HTTP against a non-loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Private key file could not be read.
	#[error("Private key file could not be read.")]
	PrivateKeyFile(#[from] std::io::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Short label of the endpoint being called.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		target: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}

/// Failures raised while computing a request signature.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum SigningError {
	/// Credential carries an empty key identifier.
	#[error("Signing key identifier is empty.")]
	MissingKeyId,
	/// Private key material is not a valid P-521 PEM document.
	#[error("Private key material is malformed: {reason}.")]
	InvalidPrivateKey {
		/// Parser diagnostic.
		reason: String,
	},
	/// Header name is empty or contains characters that break the signed payload.
	#[error("Header `{name}` cannot be signed.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Same header name appears twice (case-insensitively).
	#[error("Header `{name}` is present more than once.")]
	DuplicateHeader {
		/// Offending header name.
		name: String,
	},
	/// ECDSA backend refused to produce a signature.
	#[error("Signature could not be produced: {reason}.")]
	Backend {
		/// Backend diagnostic.
		reason: String,
	},
}

/// Upstream responses that cannot be interpreted.
#[derive(Debug, ThisError)]
pub enum MalformedResponseError {
	/// Body is not valid JSON (or not the expected shape).
	#[error("Response from {target} is not valid JSON.")]
	InvalidJson {
		/// Short label of the endpoint being called.
		target: &'static str,
		/// HTTP status code of the reply.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A complete JSON value is followed by further non-whitespace bytes.
	#[error("Response from {target} carries data after the JSON value.")]
	TrailingData {
		/// Short label of the endpoint being called.
		target: &'static str,
		/// HTTP status code of the reply.
		status: u16,
		/// Tokenizer failure at the first trailing byte.
		#[source]
		source: serde_json::Error,
	},
	/// Body parsed but lacks a required field.
	#[error("Response from {target} is missing `{field}`.")]
	MissingField {
		/// Short label of the endpoint being called.
		target: &'static str,
		/// Required field name.
		field: &'static str,
	},
}

/// Parses a JSON body while preserving the failing path for diagnostics.
pub(crate) fn parse_json<T>(target: &'static str, status: u16, body: &[u8]) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	let mut de = serde_json::Deserializer::from_slice(body);
	let value = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| MalformedResponseError::InvalidJson { target, status, source })?;

	de.end().map_err(|source| MalformedResponseError::TrailingData { target, status, source })?;

	Ok(value)
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
		return trimmed.to_owned();
	}

	let mut preview = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	preview.push('…');

	preview
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn body_preview_truncates_long_bodies() {
		let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let Error::UpstreamApi { status, body_preview } = Error::upstream_api(502, body.as_bytes())
		else {
			panic!("Expected an upstream API error.");
		};

		assert_eq!(status, 502);
		assert_eq!(body_preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(body_preview.ends_with('…'));
	}

	#[test]
	fn parse_json_reports_status_on_failure() {
		let err = parse_json::<serde_json::Value>("token endpoint", 200, b"<html>")
			.expect_err("HTML bodies must not parse as JSON.");

		assert!(matches!(err, Error::MalformedResponse(MalformedResponseError::InvalidJson { .. })));
		assert_eq!(err.status(), Some(200));
	}

	#[test]
	fn parse_json_rejects_trailing_data() {
		let err = parse_json::<serde_json::Value>("api", 200, br#"{"id":"a"} trailing"#)
			.expect_err("Trailing bytes must fail the parse.");

		assert!(matches!(
			err,
			Error::MalformedResponse(MalformedResponseError::TrailingData { target: "api", .. })
		));
		assert_eq!(err.status(), Some(200));
		assert!(parse_json::<serde_json::Value>("api", 200, b"{\"id\":\"a\"}\n  ").is_ok());
	}
}
