//! Tenant-scoped client credentials and their Basic-Auth encoding.

// crates.io
use base64::{
	Engine as _,
	engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// OAuth client id/secret pair issued for one tenant and user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
	/// Public client identifier.
	pub client_id: String,
	/// Client secret; never printed.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Creates a credential pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: TokenSecret::new(client_secret) }
	}

	/// Encodes `client_id:client_secret` with the padded standard base64 alphabet.
	pub fn encode(&self) -> EncodedClientCredentials {
		let raw = format!("{}:{}", self.client_id, self.client_secret.expose());

		EncodedClientCredentials(TokenSecret::new(STANDARD.encode(raw)))
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

/// Base64 `client_id:client_secret` value used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedClientCredentials(TokenSecret);
impl EncodedClientCredentials {
	/// Wraps an already encoded value read back from a session.
	pub fn from_encoded(value: impl Into<String>) -> Self {
		Self(TokenSecret::new(value))
	}

	/// Returns the encoded value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Renders the `Authorization` header value.
	pub fn basic_authorization(&self) -> String {
		format!("Basic {}", self.0.expose())
	}

	/// Decodes the value back into its id/secret pair, if well formed.
	pub fn decode(&self) -> Option<ClientCredentials> {
		let bytes = STANDARD.decode(self.0.expose()).ok()?;
		let raw = String::from_utf8(bytes).ok()?;
		let (id, secret) = raw.split_once(':')?;

		Some(ClientCredentials::new(id, secret))
	}

	/// Stable, non-reversible fingerprint suitable for log correlation.
	///
	/// Base64 (no padding) of the SHA-256 digest of the encoded value.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.0.expose().as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}
}
impl Debug for EncodedClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("EncodedClientCredentials").field(&"<redacted>").finish()
	}
}
