//! Broker configuration: requested scopes, SAML deployment mode, credential policy,
//! and the dynamic client registered to bootstrap credential derivation.

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, TenantId},
	error::ConfigError,
	provider::GrantType,
};

/// Deployment-mode flag forwarded with every SAML bearer exchange unless overridden.
pub const DEFAULT_SAML_MODE: &str = "PRODUCTION";

/// Controls whether tenant credentials are re-derived on every setup call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPolicy {
	/// Run the full derivation pipeline for every setup call.
	#[default]
	AlwaysDerive,
	/// Cache encoded credentials per tenant and username for the broker's lifetime.
	///
	/// A grant that fails with a cached credential invalidates the entry and retries
	/// once with a fresh derivation.
	ReuseWithinBroker,
}

/// Dynamic client registered with the authorization server before the bootstrap grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapClientSpec {
	/// Client name sent to the registration endpoint.
	pub client_name: String,
	/// Owner of the registered client.
	pub owner: String,
	/// Callback URL recorded for the client; unused by the grants the broker runs.
	pub callback_url: String,
	/// Scope requested for the bootstrap token.
	pub token_scope: String,
	/// Grants the registered client may use.
	pub grant_types: Vec<GrantType>,
	/// Whether the client is shared across tenants.
	pub saas_app: bool,
	/// Prefix combined with the tenant domain to name tenant applications.
	pub application_prefix: String,
}
impl BootstrapClientSpec {
	/// Name of the application that tenant-scoped credentials are issued for.
	pub fn application_name(&self, tenant: &TenantId) -> String {
		format!("{}{tenant}", self.application_prefix)
	}
}
impl Default for BootstrapClientSpec {
	fn default() -> Self {
		Self {
			client_name: "session-broker".into(),
			owner: "admin".into(),
			callback_url: String::new(),
			token_scope: "default".into(),
			grant_types: vec![GrantType::Password, GrantType::RefreshToken, GrantType::JwtBearer],
			saas_app: true,
			application_prefix: "webapp_".into(),
		}
	}
}

/// Configuration consumed by [`Broker`](crate::flows::Broker) operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
	/// Scopes requested by the password grant, in transmission order.
	pub scopes: ScopeList,
	/// Deployment-mode flag passed verbatim to the SAML bearer exchange.
	pub saml_mode: String,
	/// Credential derivation policy.
	pub credential_policy: CredentialPolicy,
	/// Dynamic client registration parameters.
	pub bootstrap: BootstrapClientSpec,
}
impl BrokerConfig {
	/// Parses a JSON configuration document, reporting the path of the failing field.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut de).map_err(|e| ConfigError::InvalidConfig {
			path: e.path().to_string(),
			source: e.into_inner(),
		})
	}

	/// Replaces the requested scopes.
	pub fn with_scopes(mut self, scopes: ScopeList) -> Self {
		self.scopes = scopes;

		self
	}

	/// Replaces the SAML deployment mode.
	pub fn with_saml_mode(mut self, mode: impl Into<String>) -> Self {
		self.saml_mode = mode.into();

		self
	}

	/// Replaces the credential policy.
	pub fn with_credential_policy(mut self, policy: CredentialPolicy) -> Self {
		self.credential_policy = policy;

		self
	}

	/// Replaces the dynamic client registration parameters.
	pub fn with_bootstrap(mut self, bootstrap: BootstrapClientSpec) -> Self {
		self.bootstrap = bootstrap;

		self
	}
}
impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			scopes: ScopeList::default(),
			saml_mode: DEFAULT_SAML_MODE.into(),
			credential_policy: CredentialPolicy::default(),
			bootstrap: BootstrapClientSpec::default(),
		}
	}
}
