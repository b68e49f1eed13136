//! [`AuthTransport`] implementation speaking HTTP to the authorization server.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, TokenResponse,
	basic::{BasicErrorResponse, BasicTokenResponse},
	http::{
		HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EncodedClientCredentials, TokenPair, TokenSecret, Username},
	config::BootstrapClientSpec,
	error::{ConfigError, TransientError},
	http::{AuthHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{GrantType, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind, ProviderStrategy},
	transport::{
		AuthTransport, BootstrapToken, DynamicClientDescriptor, Exchange, TokenForm,
		TransportErrorMapper, TransportFuture,
	},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, provider::DefaultProviderStrategy, transport::ReqwestTransportErrorMapper};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP transport specialized for the crate's default reqwest stack.
#[cfg(feature = "reqwest")]
pub type ReqwestAuthTransport = HttpAuthTransport<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Source of the assertion presented in the JWT bearer bootstrap grant.
pub trait AssertionProvider
where
	Self: Send + Sync,
{
	/// Produces the signed assertion for the registered dynamic client.
	fn assertion(&self, client: &DynamicClientDescriptor) -> Result<TokenSecret, ConfigError>;
}

/// Assertion minted out of band and reused for every bootstrap grant.
#[derive(Clone, Debug)]
pub struct StaticAssertion(TokenSecret);
impl StaticAssertion {
	/// Wraps a pre-signed assertion.
	pub fn new(assertion: impl Into<String>) -> Self {
		Self(TokenSecret::new(assertion))
	}
}
impl AssertionProvider for StaticAssertion {
	fn assertion(&self, _client: &DynamicClientDescriptor) -> Result<TokenSecret, ConfigError> {
		if self.0.is_empty() {
			return Err(ConfigError::MissingAssertion { reason: "static assertion is empty".into() });
		}

		Ok(self.0.clone())
	}
}

/// Talks to the registration, tenant registration, and token endpoints of one
/// [`ProviderDescriptor`].
pub struct HttpAuthTransport<C, M>
where
	C: ?Sized + AuthHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Endpoint and grant metadata.
	pub descriptor: ProviderDescriptor,
	/// Request decoration and error classification hooks.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// Dynamic client registration parameters.
	pub bootstrap: BootstrapClientSpec,
	/// Source of bootstrap assertions.
	pub assertion: Arc<dyn AssertionProvider>,
	http_client: Arc<C>,
	mapper: Arc<M>,
}
impl<C, M> HttpAuthTransport<C, M>
where
	C: ?Sized + AuthHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a transport over a caller-provided HTTP client and error mapper.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		bootstrap: BootstrapClientSpec,
		assertion: Arc<dyn AssertionProvider>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			descriptor,
			strategy,
			bootstrap,
			assertion,
			http_client: http_client.into(),
			mapper: mapper.into(),
		}
	}

	fn ensure_grant(&self, grant: GrantType) -> Result<()> {
		if self.descriptor.supports(grant) {
			Ok(())
		} else {
			Err(ConfigError::UnsupportedGrant {
				descriptor: self.descriptor.id.to_string(),
				grant: grant.label(),
			}
			.into())
		}
	}

	fn token_request(
		&self,
		grant: GrantType,
		mut form: TokenForm,
		authorization: String,
	) -> Result<HttpRequest> {
		self.strategy.augment_token_request(grant, &mut form);

		let request = Request::builder()
			.method(Method::POST)
			.uri(self.descriptor.endpoints.token.as_str())
			.header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
			.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE))
			.header(AUTHORIZATION, authorization)
			.body(form.encode().into_bytes())
			.map_err(ConfigError::from)?;

		Ok(request)
	}

	/// Sends `request`, returning the body of a 2xx response (`None` when blank) or
	/// the classified failure.
	async fn dispatch(&self, exchange: Exchange, request: HttpRequest) -> Result<Option<Vec<u8>>> {
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let response = match handle.call(request).await {
			Ok(response) => response,
			Err(e) => {
				let meta = slot.take();

				return Err(self.mapper.map_transport_error(
					self.strategy.as_ref(),
					exchange,
					meta.as_ref(),
					e,
				));
			},
		};
		let meta = slot.take().unwrap_or(ResponseMetadata {
			status: Some(response.status().as_u16()),
			retry_after: None,
		});

		if !response.status().is_success() {
			return Err(self.server_error(exchange, &meta, response.body()));
		}

		let body = response.into_body();

		Ok((!body.iter().all(u8::is_ascii_whitespace)).then_some(body))
	}

	fn server_error(&self, exchange: Exchange, meta: &ResponseMetadata, body: &[u8]) -> Error {
		let mut ctx = ProviderErrorContext::new(exchange);

		if let Some(status) = meta.status {
			ctx = ctx.with_http_status(status);
		}

		match serde_json::from_slice::<BasicErrorResponse>(body) {
			Ok(response) => {
				ctx = ctx.with_oauth_error(response.error().as_ref());

				if let Some(description) = response.error_description() {
					ctx = ctx.with_error_description(description.as_str());
				}
			},
			Err(_) if !body.is_empty() => {
				ctx = ctx.with_body_preview(String::from_utf8_lossy(body));
			},
			Err(_) => {},
		}

		let reason = ctx.reason();

		match self.strategy.classify_error(&ctx) {
			ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason },
			ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
			ProviderErrorKind::Transient => TransientError::Endpoint {
				message: reason,
				status: meta.status,
				retry_after: meta.retry_after,
			}
			.into(),
		}
	}

	async fn token_exchange(
		&self,
		grant: GrantType,
		form: TokenForm,
		authorization: String,
		fallback_refresh: Option<&TokenSecret>,
	) -> Result<Option<TokenPair>> {
		self.ensure_grant(grant)?;

		let request = self.token_request(grant, form, authorization)?;
		let Some(body) = self.dispatch(Exchange::Token(grant), request).await? else {
			return Ok(None);
		};
		let Some(response) = parse_token_response(&body)? else {
			return Ok(None);
		};
		let refresh = match response.refresh_token() {
			Some(token) if !token.secret().is_empty() => TokenSecret::new(token.secret().as_str()),
			_ => match fallback_refresh {
				Some(current) => current.clone(),
				None => return Ok(None),
			},
		};
		let mut pair = TokenPair {
			access_token: TokenSecret::new(response.access_token().secret().as_str()),
			refresh_token: refresh,
			expires_at: None,
		};

		if let Some(lifetime) = lifetime(&response)? {
			pair = pair.with_expires_in(OffsetDateTime::now_utc(), lifetime);
		}

		Ok(Some(pair))
	}
}
#[cfg(feature = "reqwest")]
impl HttpAuthTransport<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a transport with a redirect-free reqwest client, the default mapper, and
	/// the default strategy.
	pub fn new(
		descriptor: ProviderDescriptor,
		bootstrap: BootstrapClientSpec,
		assertion: Arc<dyn AssertionProvider>,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			descriptor,
			Arc::new(DefaultProviderStrategy),
			bootstrap,
			assertion,
			ReqwestHttpClient::without_timeout()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> AuthTransport for HttpAuthTransport<C, M>
where
	C: ?Sized + AuthHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn dynamic_client_descriptor(&self) -> TransportFuture<'_, DynamicClientDescriptor> {
		Box::pin(async move {
			let spec = &self.bootstrap;
			let payload = RegistrationRequest {
				callback_url: &spec.callback_url,
				client_name: &spec.client_name,
				token_scope: &spec.token_scope,
				owner: &spec.owner,
				grant_type: spec
					.grant_types
					.iter()
					.map(|grant| grant.as_str())
					.collect::<Vec<_>>()
					.join(" "),
				saas_app: spec.saas_app,
			};
			let body = serde_json::to_vec(&payload).map_err(|e| TransientError::Endpoint {
				message: format!("Failed to encode the registration request: {e}"),
				status: None,
				retry_after: None,
			})?;
			let request = Request::builder()
				.method(Method::POST)
				.uri(self.descriptor.endpoints.registration.as_str())
				.header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
				.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE))
				.body(body)
				.map_err(ConfigError::from)?;
			let Some(body) = self.dispatch(Exchange::Registration, request).await? else {
				return Ok(None);
			};

			Ok(parse_json::<ClientPayload>(&body)?
				.into_credentials()
				.map(|credentials| DynamicClientDescriptor { credentials }))
		})
	}

	fn exchange_bootstrap_grant<'a>(
		&'a self,
		client: &'a DynamicClientDescriptor,
	) -> TransportFuture<'a, BootstrapToken> {
		Box::pin(async move {
			let grant = GrantType::JwtBearer;

			self.ensure_grant(grant)?;

			let assertion = self.assertion.assertion(client)?;
			let mut form = TokenForm::for_grant(grant);

			form.push("assertion", assertion.expose());

			let request =
				self.token_request(grant, form, client.credentials.encode().basic_authorization())?;
			let Some(body) = self.dispatch(Exchange::Token(grant), request).await? else {
				return Ok(None);
			};
			let Some(response) = parse_token_response(&body)? else {
				return Ok(None);
			};
			let mut token = BootstrapToken::new(response.access_token().secret().as_str());

			if let Some(lifetime) = lifetime(&response)? {
				token.expires_at = Some(OffsetDateTime::now_utc() + lifetime);
			}

			Ok(Some(token))
		})
	}

	fn exchange_tenant_credentials<'a>(
		&'a self,
		username: &'a Username,
		bootstrap: &'a BootstrapToken,
	) -> TransportFuture<'a, ClientCredentials> {
		Box::pin(async move {
			let tenant = username.tenant();
			let mut url = self.descriptor.endpoints.tenant_registration.clone();

			url.query_pairs_mut()
				.append_pair("tenantDomain", tenant.as_str())
				.append_pair("applicationName", &self.bootstrap.application_name(&tenant));

			let request = Request::builder()
				.method(Method::POST)
				.uri(url.as_str())
				.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE))
				.header(AUTHORIZATION, bootstrap.bearer_authorization())
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let Some(body) = self.dispatch(Exchange::TenantRegistration, request).await? else {
				return Ok(None);
			};

			Ok(parse_json::<ClientPayload>(&body)?.into_credentials())
		})
	}

	fn exchange_password_grant<'a>(
		&'a self,
		username: &'a Username,
		encoded_password: &'a str,
		credentials: &'a EncodedClientCredentials,
		scope: &'a str,
	) -> TransportFuture<'a, TokenPair> {
		Box::pin(async move {
			let mut form = TokenForm::for_grant(GrantType::Password);

			form.push("username", username.as_str())
				.push_encoded("password", encoded_password)
				.push("scope", scope);

			self.token_exchange(GrantType::Password, form, credentials.basic_authorization(), None)
				.await
		})
	}

	fn exchange_saml_grant<'a>(
		&'a self,
		assertion: &'a str,
		credentials: &'a EncodedClientCredentials,
		mode: &'a str,
	) -> TransportFuture<'a, TokenPair> {
		Box::pin(async move {
			let mut form = TokenForm::for_grant(GrantType::Saml2Bearer);

			form.push("assertion", assertion).push("scope", mode);

			self.token_exchange(GrantType::Saml2Bearer, form, credentials.basic_authorization(), None)
				.await
		})
	}

	fn exchange_refresh_grant<'a>(
		&'a self,
		current: &'a TokenPair,
		credentials: &'a EncodedClientCredentials,
	) -> TransportFuture<'a, TokenPair> {
		Box::pin(async move {
			let mut form = TokenForm::for_grant(GrantType::RefreshToken);

			form.push("refresh_token", current.refresh_token.expose());

			self.token_exchange(
				GrantType::RefreshToken,
				form,
				credentials.basic_authorization(),
				Some(&current.refresh_token),
			)
			.await
		})
	}
}
impl<C, M> Debug for HttpAuthTransport<C, M>
where
	C: ?Sized + AuthHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpAuthTransport")
			.field("descriptor", &self.descriptor)
			.field("bootstrap", &self.bootstrap)
			.finish_non_exhaustive()
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequest<'a> {
	callback_url: &'a str,
	client_name: &'a str,
	token_scope: &'a str,
	owner: &'a str,
	grant_type: String,
	saas_app: bool,
}

#[derive(Deserialize)]
struct ClientPayload {
	#[serde(default, alias = "clientId")]
	client_id: Option<String>,
	#[serde(default, alias = "clientSecret")]
	client_secret: Option<String>,
}
impl ClientPayload {
	fn into_credentials(self) -> Option<ClientCredentials> {
		match (self.client_id, self.client_secret) {
			(Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() =>
				Some(ClientCredentials::new(id, secret)),
			_ => None,
		}
	}
}

fn parse_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TransientError::ResponseParse { source, status: None }.into())
}

/// Parses a 2xx token response; a body without an access token yields `None`.
fn parse_token_response(body: &[u8]) -> Result<Option<BasicTokenResponse>> {
	let value = parse_json::<serde_json::Value>(body)?;
	let has_token = value
		.get("access_token")
		.and_then(serde_json::Value::as_str)
		.is_some_and(|token| !token.is_empty());

	if !has_token {
		return Ok(None);
	}

	serde_path_to_error::deserialize(value)
		.map(Some)
		.map_err(|source| TransientError::ResponseParse { source, status: None }.into())
}

fn lifetime(response: &BasicTokenResponse) -> Result<Option<Duration>> {
	let Some(expires_in) = response.expires_in() else {
		return Ok(None);
	};
	let secs = i64::try_from(expires_in.as_secs()).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if secs <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(Some(Duration::seconds(secs)))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_response_without_access_token_is_absent() {
		assert!(parse_token_response(b"{}").expect("Empty object should parse.").is_none());
		assert!(
			parse_token_response(br#"{"access_token":"","token_type":"bearer"}"#)
				.expect("Blank token should parse.")
				.is_none()
		);

		let response = parse_token_response(
			br#"{"access_token":"a","refresh_token":"r","token_type":"bearer","expires_in":60}"#,
		)
		.expect("Token response should parse.")
		.expect("Token response should carry an access token.");

		assert_eq!(response.access_token().secret(), "a");
		assert_eq!(lifetime(&response).expect("Lifetime should be valid."), Some(Duration::seconds(60)));
	}

	#[test]
	fn malformed_bodies_are_transient_parse_errors() {
		let err = parse_token_response(b"<html>").expect_err("HTML must not parse.");

		assert!(matches!(err, Error::Transient(TransientError::ResponseParse { .. })));

		let err = parse_token_response(br#"{"access_token":"a"}"#)
			.expect_err("Missing token_type must be reported.");

		assert!(matches!(err, Error::Transient(TransientError::ResponseParse { .. })));
	}

	#[test]
	fn client_payload_accepts_both_casings() {
		let snake: ClientPayload = serde_json::from_str(r#"{"client_id":"a","client_secret":"b"}"#)
			.expect("Snake-case payload should parse.");
		let camel: ClientPayload = serde_json::from_str(r#"{"clientId":"a","clientSecret":"b"}"#)
			.expect("Camel-case payload should parse.");
		let partial: ClientPayload =
			serde_json::from_str(r#"{"client_id":"a"}"#).expect("Partial payload should parse.");

		assert_eq!(snake.into_credentials(), Some(ClientCredentials::new("a", "b")));
		assert_eq!(camel.into_credentials(), Some(ClientCredentials::new("a", "b")));
		assert_eq!(partial.into_credentials(), None);
	}
}
