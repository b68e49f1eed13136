//! Authorization-server transport contract used by the broker.
//!
//! [`AuthTransport`] is the broker's only view of the authorization server. Every
//! operation resolves to `Ok(None)` when the server answered without the expected
//! payload and to `Err` for classified transport or server failures; the broker maps
//! both onto its own stage-specific errors.

pub mod http;
pub mod mapper;

pub use http::*;
pub use mapper::*;

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EncodedClientCredentials, TokenPair, TokenSecret, Username},
	provider::GrantType,
};

/// Boxed future returned by [`AuthTransport`] operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Option<T>>> + 'a + Send>>;

/// Calls the broker makes against the authorization server.
pub trait AuthTransport
where
	Self: Send + Sync,
{
	/// Registers (or looks up) the dynamic client used for the bootstrap grant.
	fn dynamic_client_descriptor(&self) -> TransportFuture<'_, DynamicClientDescriptor>;

	/// Exchanges the dynamic client for a trusted bootstrap token (JWT bearer grant).
	fn exchange_bootstrap_grant<'a>(
		&'a self,
		client: &'a DynamicClientDescriptor,
	) -> TransportFuture<'a, BootstrapToken>;

	/// Obtains client credentials scoped to the username's tenant.
	fn exchange_tenant_credentials<'a>(
		&'a self,
		username: &'a Username,
		bootstrap: &'a BootstrapToken,
	) -> TransportFuture<'a, ClientCredentials>;

	/// Runs the resource owner password grant.
	///
	/// `encoded_password` is already form-urlencoded and must be sent as is.
	fn exchange_password_grant<'a>(
		&'a self,
		username: &'a Username,
		encoded_password: &'a str,
		credentials: &'a EncodedClientCredentials,
		scope: &'a str,
	) -> TransportFuture<'a, TokenPair>;

	/// Runs the SAML 2.0 bearer grant with the deployment-mode flag `mode`.
	fn exchange_saml_grant<'a>(
		&'a self,
		assertion: &'a str,
		credentials: &'a EncodedClientCredentials,
		mode: &'a str,
	) -> TransportFuture<'a, TokenPair>;

	/// Exchanges the refresh token held in `current` for a new pair.
	fn exchange_refresh_grant<'a>(
		&'a self,
		current: &'a TokenPair,
		credentials: &'a EncodedClientCredentials,
	) -> TransportFuture<'a, TokenPair>;
}

/// Exchange performed against the authorization server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Exchange {
	/// Dynamic client registration.
	Registration,
	/// Tenant application credential issuance.
	TenantRegistration,
	/// Token endpoint call for a grant.
	Token(GrantType),
}
impl Display for Exchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Exchange::Registration => f.write_str("client registration"),
			Exchange::TenantRegistration => f.write_str("tenant registration"),
			Exchange::Token(grant) => write!(f, "{grant} grant"),
		}
	}
}

/// Dynamic client registered to bootstrap credential derivation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DynamicClientDescriptor {
	/// Credentials issued by the registration endpoint.
	pub credentials: ClientCredentials,
}
impl DynamicClientDescriptor {
	/// Wraps registration credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { credentials: ClientCredentials::new(client_id, client_secret) }
	}
}

/// Trusted token obtained through the JWT bearer grant.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapToken {
	/// Bearer token authorizing tenant credential issuance.
	pub access_token: TokenSecret,
	/// Expiry instant, when reported.
	pub expires_at: Option<OffsetDateTime>,
}
impl BootstrapToken {
	/// Wraps a bearer token without expiry metadata.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at: None }
	}

	/// Renders the `Authorization` header value.
	pub fn bearer_authorization(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for BootstrapToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BootstrapToken")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Ordered `application/x-www-form-urlencoded` body for token endpoint requests.
///
/// Values are stored encoded; [`push_encoded`](Self::push_encoded) accepts values the
/// caller already encoded so they are not encoded twice.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenForm(Vec<(String, String)>);
impl TokenForm {
	/// Starts a form with the `grant_type` of `grant`.
	pub fn for_grant(grant: GrantType) -> Self {
		let mut form = Self::default();

		form.push("grant_type", grant.as_str());

		form
	}

	/// Appends a raw value, encoding it.
	pub fn push(&mut self, name: &str, value: &str) -> &mut Self {
		self.push_encoded(name, &encode_component(value))
	}

	/// Appends a value that is already form-urlencoded.
	pub fn push_encoded(&mut self, name: &str, encoded: &str) -> &mut Self {
		self.0.push((encode_component(name), encoded.to_owned()));

		self
	}

	/// Encoded value of the first parameter named `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		let name = encode_component(name);

		self.0.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
	}

	/// Renders the request body.
	pub fn encode(&self) -> String {
		self.0.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&")
	}
}
impl Debug for TokenForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_list().entries(self.0.iter().map(|(key, _)| key)).finish()
	}
}

/// Form-urlencodes a single component (`application/x-www-form-urlencoded` byte serialization).
pub fn encode_component(value: &str) -> String {
	form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn form_encodes_once() {
		let mut form = TokenForm::for_grant(GrantType::Password);

		form.push("username", "alice@acme.com")
			.push_encoded("password", &encode_component("p@ss word&"))
			.push("scope", "read write ");

		assert_eq!(
			form.encode(),
			"grant_type=password&username=alice%40acme.com&password=p%40ss+word%26&scope=read+write+"
		);
		assert_eq!(form.get("password"), Some("p%40ss+word%26"));
		assert_eq!(format!("{form:?}"), "[\"grant_type\", \"username\", \"password\", \"scope\"]");
	}

	#[test]
	fn exchange_labels_are_readable() {
		assert_eq!(Exchange::Token(GrantType::Saml2Bearer).to_string(), "saml2-bearer grant");
		assert_eq!(Exchange::TenantRegistration.to_string(), "tenant registration");
	}
}
