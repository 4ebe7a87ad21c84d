//! Credentials, endpoints, and tunables loaded once at startup.
//!
//! Values come either from explicit constructors or from `PAYMENTS_*` environment variables.
//! The loaders accept an injectable lookup function so callers (and tests) can source values
//! from anywhere without mutating the process environment.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Environment variable holding the signing key identifier.
pub const ENV_KEY_ID: &str = "PAYMENTS_KEY_ID";
/// Environment variable holding the PEM-encoded P-521 private key.
pub const ENV_PRIVATE_KEY: &str = "PAYMENTS_PRIVATE_KEY";
/// Environment variable pointing at a PEM file (used when [`ENV_PRIVATE_KEY`] is unset).
pub const ENV_PRIVATE_KEY_PATH: &str = "PAYMENTS_PRIVATE_KEY_PATH";
/// Environment variable holding the OAuth client identifier.
pub const ENV_CLIENT_ID: &str = "PAYMENTS_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "PAYMENTS_CLIENT_SECRET";
/// Environment variable holding the default merchant account identifier.
pub const ENV_MERCHANT_ACCOUNT_ID: &str = "PAYMENTS_MERCHANT_ACCOUNT_ID";
/// Environment variable selecting `sandbox` or `production` endpoints.
pub const ENV_ENVIRONMENT: &str = "PAYMENTS_ENVIRONMENT";
/// Environment variable overriding the authorization endpoint.
pub const ENV_AUTH_URI: &str = "PAYMENTS_AUTH_URI";
/// Environment variable overriding the API endpoint.
pub const ENV_API_URI: &str = "PAYMENTS_API_URI";
/// Environment variable overriding the requested token scope.
pub const ENV_SCOPE: &str = "PAYMENTS_SCOPE";
/// Environment variable overriding the outbound `User-Agent`.
pub const ENV_USER_AGENT: &str = "PAYMENTS_USER_AGENT";
/// Environment variable overriding the payment link lifetime, in hours.
pub const ENV_PAYMENT_LINK_TTL_HOURS: &str = "PAYMENTS_PAYMENT_LINK_TTL_HOURS";

/// Upstream deployment whose endpoints should be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
	/// Sandbox endpoints; no real money moves.
	#[default]
	Sandbox,
	/// Production endpoints.
	Production,
}
impl Environment {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Sandbox => "sandbox",
			Environment::Production => "production",
		}
	}

	/// Returns the preset endpoints for this environment.
	pub fn endpoints(self) -> Result<Endpoints, ConfigError> {
		match self {
			Environment::Sandbox => Endpoints::parse(
				"https://auth.truelayer-sandbox.com",
				"https://api.truelayer-sandbox.com",
			),
			Environment::Production =>
				Endpoints::parse("https://auth.truelayer.com", "https://api.truelayer.com"),
		}
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"sandbox" => Ok(Self::Sandbox),
			"production" | "live" => Ok(Self::Production),
			other => Err(ConfigError::InvalidSetting {
				name: ENV_ENVIRONMENT,
				reason: format!("expected `sandbox` or `production`, got `{other}`"),
			}),
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Authorization and API base endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	/// Base URL of the authorization server (token exchange target).
	pub auth: Url,
	/// Base URL of the business API.
	pub api: Url,
}
impl Endpoints {
	/// Validates and wraps the provided endpoints.
	pub fn new(auth: Url, api: Url) -> Result<Self, ConfigError> {
		validate_endpoint("auth", &auth)?;
		validate_endpoint("api", &api)?;

		Ok(Self { auth, api })
	}

	/// Parses and validates both endpoints.
	pub fn parse(auth: &str, api: &str) -> Result<Self, ConfigError> {
		let auth =
			Url::parse(auth).map_err(|source| ConfigError::InvalidUrl { name: "auth", source })?;
		let api = Url::parse(api).map_err(|source| ConfigError::InvalidUrl { name: "api", source })?;

		Self::new(auth, api)
	}
}

/// Immutable signing + client credentials.
///
/// Secrets are wrapped in [`Secret`] so `Debug` output never reveals them.
#[derive(Clone)]
pub struct Credential {
	/// Identifier of the public key registered upstream (`kid`).
	pub key_id: String,
	/// PEM-encoded P-521 private key (SEC1 or PKCS#8).
	pub private_key: Secret,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Endpoints the credential is valid for.
	pub endpoints: Endpoints,
}
impl Credential {
	/// Bundles credential material with its endpoints.
	pub fn new(
		key_id: impl Into<String>,
		private_key: impl Into<Secret>,
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
		endpoints: Endpoints,
	) -> Self {
		Self {
			key_id: key_id.into(),
			private_key: private_key.into(),
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			endpoints,
		}
	}

	/// Loads the credential from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(process_env)
	}

	/// Loads the credential through `lookup`, which maps variable names to values.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let lookup = non_blank(lookup);
		let environment = match lookup(ENV_ENVIRONMENT) {
			Some(value) => value.parse::<Environment>()?,
			None => Environment::default(),
		};
		let preset = environment.endpoints()?;
		let endpoints = match (lookup(ENV_AUTH_URI), lookup(ENV_API_URI)) {
			(None, None) => preset,
			(auth, api) => Endpoints::parse(
				auth.as_deref().unwrap_or(preset.auth.as_str()),
				api.as_deref().unwrap_or(preset.api.as_str()),
			)?,
		};
		let private_key = match lookup(ENV_PRIVATE_KEY) {
			Some(pem) => pem,
			None => {
				let path = lookup(ENV_PRIVATE_KEY_PATH)
					.ok_or(ConfigError::MissingVar { name: ENV_PRIVATE_KEY })?;

				std::fs::read_to_string(path)?
			},
		};

		Ok(Self::new(
			require(&lookup, ENV_KEY_ID)?,
			private_key,
			require(&lookup, ENV_CLIENT_ID)?,
			require(&lookup, ENV_CLIENT_SECRET)?,
			endpoints,
		))
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("key_id", &self.key_id)
			.field("private_key", &"<redacted>")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

/// Tunables shared by the token manager and API operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSettings {
	/// Merchant account used when an operation does not name one.
	pub merchant_account_id: String,
	/// `User-Agent` sent (and signed) on every request.
	pub user_agent: String,
	/// Space-delimited scope requested during token exchange.
	pub scope: String,
	/// Cached tokens expiring within this window are refreshed early.
	pub token_buffer: Duration,
	/// Lifetime assumed when the token endpoint omits `expires_in`.
	pub fallback_expires_in: Duration,
	/// Lifetime of generated payment links.
	pub payment_link_ttl: Duration,
	/// Trailing window used by transaction listing when no range is given.
	pub transactions_window: Duration,
}
impl ClientSettings {
	/// Default scope requested during token exchange.
	pub const DEFAULT_SCOPE: &'static str = "payments paylink";
	/// Default token refresh buffer.
	pub const DEFAULT_TOKEN_BUFFER: Duration = Duration::seconds(60);
	/// Default lifetime when `expires_in` is missing.
	pub const DEFAULT_FALLBACK_EXPIRES_IN: Duration = Duration::seconds(1800);
	/// Default payment link lifetime.
	pub const DEFAULT_PAYMENT_LINK_TTL: Duration = Duration::hours(24);
	/// Default transaction listing window.
	pub const DEFAULT_TRANSACTIONS_WINDOW: Duration = Duration::days(30);

	/// Creates settings with defaults for everything except the merchant account.
	pub fn new(merchant_account_id: impl Into<String>) -> Self {
		Self {
			merchant_account_id: merchant_account_id.into(),
			user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
			scope: Self::DEFAULT_SCOPE.into(),
			token_buffer: Self::DEFAULT_TOKEN_BUFFER,
			fallback_expires_in: Self::DEFAULT_FALLBACK_EXPIRES_IN,
			payment_link_ttl: Self::DEFAULT_PAYMENT_LINK_TTL,
			transactions_window: Self::DEFAULT_TRANSACTIONS_WINDOW,
		}
	}

	/// Overrides the `User-Agent`.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Overrides the requested scope.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Overrides the refresh buffer (negative values clamp to zero).
	pub fn with_token_buffer(mut self, buffer: Duration) -> Self {
		self.token_buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Overrides the lifetime assumed when `expires_in` is missing.
	pub fn with_fallback_expires_in(mut self, lifetime: Duration) -> Self {
		self.fallback_expires_in = lifetime;

		self
	}

	/// Overrides the payment link lifetime.
	pub fn with_payment_link_ttl(mut self, ttl: Duration) -> Self {
		self.payment_link_ttl = ttl;

		self
	}

	/// Overrides the transaction listing window.
	pub fn with_transactions_window(mut self, window: Duration) -> Self {
		self.transactions_window = window;

		self
	}

	/// Loads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(process_env)
	}

	/// Loads settings through `lookup`, which maps variable names to values.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let lookup = non_blank(lookup);
		let mut settings = Self::new(require(&lookup, ENV_MERCHANT_ACCOUNT_ID)?);

		if let Some(scope) = lookup(ENV_SCOPE) {
			settings = settings.with_scope(scope);
		}
		if let Some(user_agent) = lookup(ENV_USER_AGENT) {
			settings = settings.with_user_agent(user_agent);
		}
		if let Some(hours) = lookup(ENV_PAYMENT_LINK_TTL_HOURS) {
			let hours = hours.trim().parse::<u16>().ok().filter(|h| *h > 0).ok_or_else(|| {
				ConfigError::InvalidSetting {
					name: ENV_PAYMENT_LINK_TTL_HOURS,
					reason: format!("expected a positive number of hours, got `{hours}`"),
				}
			})?;

			settings = settings.with_payment_link_ttl(Duration::hours(hours.into()));
		}

		Ok(settings)
	}
}

fn process_env(name: &str) -> Option<String> {
	std::env::var(name).ok()
}

fn non_blank<F>(lookup: F) -> impl Fn(&str) -> Option<String>
where
	F: Fn(&str) -> Option<String>,
{
	move |name| lookup(name).filter(|value| !value.trim().is_empty())
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	lookup(name).ok_or(ConfigError::MissingVar { name })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}
