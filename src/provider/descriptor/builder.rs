// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{GrantType, ProviderDescriptor, ProviderEndpoints, SupportedGrants},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Dynamic client registration endpoint is required to bootstrap derivation.
	#[error("Missing registration endpoint.")]
	MissingRegistrationEndpoint,
	/// Token endpoint is mandatory for all grants.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Tenant registration endpoint is required to issue tenant credentials.
	#[error("Missing tenant registration endpoint.")]
	MissingTenantRegistrationEndpoint,
	/// At least one grant must be supported.
	#[error("Descriptor must enable at least one grant type.")]
	NoSupportedGrants,
	/// Credential derivation cannot run without the JWT bearer grant.
	#[error("Descriptor must enable the jwt-bearer grant used for credential derivation.")]
	MissingBootstrapGrant,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// Dynamic client registration endpoint.
	pub registration_endpoint: Option<Url>,
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Option<Url>,
	/// Tenant-scoped application registration endpoint.
	pub tenant_registration_endpoint: Option<Url>,
	/// Grants enabled for the server.
	pub supported_grants: SupportedGrants,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			registration_endpoint: None,
			token_endpoint: None,
			tenant_registration_endpoint: None,
			supported_grants: SupportedGrants::default(),
		}
	}

	/// Sets the dynamic client registration endpoint.
	pub fn registration_endpoint(mut self, url: Url) -> Self {
		self.registration_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the tenant registration endpoint.
	pub fn tenant_registration_endpoint(mut self, url: Url) -> Self {
		self.tenant_registration_endpoint = Some(url);

		self
	}

	/// Marks a single grant type as supported.
	pub fn support_grant(mut self, grant: GrantType) -> Self {
		self.supported_grants = self.supported_grants.enable(grant);

		self
	}

	/// Marks multiple grants as supported.
	pub fn support_grants<I>(mut self, grants: I) -> Self
	where
		I: IntoIterator<Item = GrantType>,
	{
		self.supported_grants = grants.into_iter().fold(self.supported_grants, SupportedGrants::enable);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let registration = self
			.registration_endpoint
			.ok_or(ProviderDescriptorError::MissingRegistrationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let tenant_registration = self
			.tenant_registration_endpoint
			.ok_or(ProviderDescriptorError::MissingTenantRegistrationEndpoint)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { registration, token, tenant_registration },
			supported_grants: self.supported_grants,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	pub fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if self.supported_grants.is_empty() {
			return Err(ProviderDescriptorError::NoSupportedGrants);
		}
		if !self.supports(GrantType::JwtBearer) {
			return Err(ProviderDescriptorError::MissingBootstrapGrant);
		}

		validate_endpoint("registration", &self.endpoints.registration)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("tenant registration", &self.endpoints.tenant_registration)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() != "https" {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(path: &str) -> Url {
		Url::parse(&format!("https://iam.example.com{path}")).expect("Fixture URL should parse.")
	}

	fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptor::builder(ProviderId::new("iam").expect("Provider id should be valid."))
			.registration_endpoint(url("/client-registration/register"))
			.token_endpoint(url("/oauth2/token"))
			.tenant_registration_endpoint(url("/api-application-registration/register/tenants"))
	}

	#[test]
	fn builder_accepts_complete_https_descriptor() {
		let descriptor = builder()
			.support_grants([GrantType::JwtBearer, GrantType::Password, GrantType::RefreshToken])
			.build()
			.expect("Complete descriptor should build.");

		assert!(descriptor.supports(GrantType::Password));
		assert!(!descriptor.supports(GrantType::Saml2Bearer));
	}

	#[test]
	fn builder_rejects_missing_pieces() {
		assert_eq!(
			builder().build().expect_err("Descriptor without grants must fail."),
			ProviderDescriptorError::NoSupportedGrants
		);
		assert_eq!(
			builder()
				.support_grant(GrantType::Password)
				.build()
				.expect_err("Descriptor without jwt-bearer must fail."),
			ProviderDescriptorError::MissingBootstrapGrant
		);
		assert_eq!(
			ProviderDescriptor::builder(
				ProviderId::new("iam").expect("Provider id should be valid.")
			)
			.token_endpoint(url("/oauth2/token"))
			.build()
			.expect_err("Descriptor without registration endpoint must fail."),
			ProviderDescriptorError::MissingRegistrationEndpoint
		);
	}

	#[test]
	fn builder_rejects_plain_http() {
		let err = builder()
			.token_endpoint(Url::parse("http://iam.example.com/oauth2/token").expect("URL should parse."))
			.support_grant(GrantType::JwtBearer)
			.build()
			.expect_err("Plain HTTP token endpoint must fail.");

		assert!(matches!(err, ProviderDescriptorError::InsecureEndpoint { endpoint: "token", .. }));
	}
}
