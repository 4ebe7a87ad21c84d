//! Client-credentials token lifecycle with caching + singleflight guard.
//!
//! [`TokenManager::access_token`] reuses the cached bearer token while it outlives the
//! configured buffer and otherwise performs a signed `client_credentials` exchange against
//! `<auth>/connect/token`. Callers that find the cache stale at the same time queue on one
//! guard, so only the first performs the exchange and the rest reuse its token. Failed
//! exchanges leave the cache untouched.

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenCache, TokenGrant, token::TokenResponse},
	config::{ClientSettings, Credential},
	error::{self, MalformedResponseError},
	http::{self, ApiHttpClient, OutboundRequest},
	obs::{self, CallKind},
	sign::{self, Method, SigningInput},
};

const TARGET: &str = "token endpoint";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Owns the cached bearer token for one credential.
pub struct TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	credential: Arc<Credential>,
	settings: Arc<ClientSettings>,
	http_client: Arc<C>,
	cache: TokenCache,
	refresh_guard: AsyncMutex<()>,
}
impl<C> TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a manager with an empty (already expired) cache.
	pub fn new(
		credential: Arc<Credential>,
		settings: Arc<ClientSettings>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			credential,
			settings,
			http_client: http_client.into(),
			cache: TokenCache::default(),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Returns the token cache for inspection.
	pub fn cache(&self) -> &TokenCache {
		&self.cache
	}

	/// Drops the cached token so the next call exchanges a new one.
	pub fn invalidate(&self) {
		self.cache.clear();
	}

	/// Returns a bearer token valid for at least the configured buffer.
	pub async fn access_token(&self) -> Result<Secret> {
		let buffer = self.settings.token_buffer;

		if let Some(token) = self.cache.fresh_at(OffsetDateTime::now_utc(), buffer) {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Another caller may have refreshed while this one waited on the guard.
		if let Some(token) = self.cache.fresh_at(OffsetDateTime::now_utc(), buffer) {
			return Ok(token);
		}

		let grant = self.exchange_token().await?;
		let expires_at =
			OffsetDateTime::now_utc() + grant.lifetime(self.settings.fallback_expires_in);

		self.cache.store(grant.access_token.clone(), expires_at);

		Ok(grant.access_token)
	}

	/// Performs one signed `client_credentials` exchange without touching the cache.
	pub async fn exchange_token(&self) -> Result<TokenGrant> {
		obs::observe(CallKind::TokenExchange, "exchange_token", async move {
			let url = http::endpoint_url(&self.credential.endpoints.auth, &["connect", "token"])?;
			let form = url::form_urlencoded::Serializer::new(String::new())
				.append_pair("client_id", &self.credential.client_id)
				.append_pair("client_secret", self.credential.client_secret.expose())
				.append_pair("scope", &self.settings.scope)
				.append_pair("grant_type", "client_credentials")
				.finish();
			let input = SigningInput::new(Method::Post, http::path_and_query(&url))
				.header("Content-Type", FORM_CONTENT_TYPE)
				.header("User-Agent", self.settings.user_agent.as_str())
				.body(form);
			let signed = sign::build_signed_request(&self.credential, input)?;
			let reply = self.http_client.execute(OutboundRequest::new(url, signed, TARGET)).await?;

			if !reply.is_success() {
				return Err(Error::auth_exchange(reply.status, &reply.body));
			}

			let response: TokenResponse = error::parse_json(TARGET, reply.status, &reply.body)?;
			let access_token = response
				.access_token
				.filter(|token| !token.is_empty())
				.ok_or(MalformedResponseError::MissingField {
					target: TARGET,
					field: "access_token",
				})?;

			Ok(TokenGrant {
				access_token,
				expires_in: response.expires_in,
				token_type: response.token_type.unwrap_or_else(|| "Bearer".into()),
			})
		})
		.await
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("client_id", &self.credential.client_id)
			.field("cache", &self.cache.snapshot())
			.finish()
	}
}
