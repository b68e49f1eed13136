// self
use crate::_prelude::*;

/// Grant types the broker exchanges at the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// JWT bearer grant (RFC 7523) used to obtain the bootstrap token.
	JwtBearer,
	/// Resource owner password credentials grant.
	Password,
	/// SAML 2.0 bearer assertion grant (RFC 7522).
	Saml2Bearer,
	/// Refresh token grant.
	RefreshToken,
}
impl GrantType {
	/// All grants, in the order the broker uses them.
	pub const ALL: [GrantType; 4] =
		[GrantType::JwtBearer, GrantType::Password, GrantType::Saml2Bearer, GrantType::RefreshToken];

	/// Returns the `grant_type` form value for the grant.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
			GrantType::Password => "password",
			GrantType::Saml2Bearer => "urn:ietf:params:oauth:grant-type:saml2-bearer",
			GrantType::RefreshToken => "refresh_token",
		}
	}

	/// Short label used in errors, spans, and metrics.
	pub const fn label(self) -> &'static str {
		match self {
			GrantType::JwtBearer => "jwt-bearer",
			GrantType::Password => "password",
			GrantType::Saml2Bearer => "saml2-bearer",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.label())
	}
}

/// Collection of grant flags wired into the descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportedGrants {
	/// Indicates whether the JWT bearer grant is enabled.
	pub jwt_bearer: bool,
	/// Indicates whether the password grant is enabled.
	pub password: bool,
	/// Indicates whether the SAML bearer grant is enabled.
	pub saml2_bearer: bool,
	/// Indicates whether the refresh token grant is enabled.
	pub refresh_token: bool,
}
impl SupportedGrants {
	/// Every grant enabled.
	pub fn all() -> Self {
		GrantType::ALL.into_iter().fold(Self::default(), Self::enable)
	}

	/// Returns true if the provided grant is supported.
	pub fn supports(self, grant: GrantType) -> bool {
		match grant {
			GrantType::JwtBearer => self.jwt_bearer,
			GrantType::Password => self.password,
			GrantType::Saml2Bearer => self.saml2_bearer,
			GrantType::RefreshToken => self.refresh_token,
		}
	}

	/// Marks a grant as supported.
	pub fn enable(mut self, grant: GrantType) -> Self {
		match grant {
			GrantType::JwtBearer => self.jwt_bearer = true,
			GrantType::Password => self.password = true,
			GrantType::Saml2Bearer => self.saml2_bearer = true,
			GrantType::RefreshToken => self.refresh_token = true,
		}

		self
	}

	/// Returns true when no grants are enabled.
	pub fn is_empty(self) -> bool {
		!GrantType::ALL.into_iter().any(|grant| self.supports(grant))
	}

	/// Space-delimited `grant_type` values, as sent during client registration.
	pub fn to_registration_string(self) -> String {
		GrantType::ALL
			.into_iter()
			.filter(|grant| self.supports(*grant))
			.map(GrantType::as_str)
			.collect::<Vec<_>>()
			.join(" ")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn registration_string_lists_enabled_grants() {
		let grants = SupportedGrants::default().enable(GrantType::Password).enable(GrantType::RefreshToken);

		assert_eq!(grants.to_registration_string(), "password refresh_token");
		assert!(SupportedGrants::default().is_empty());
		assert!(!SupportedGrants::all().is_empty());
		assert_eq!(
			SupportedGrants::all().to_registration_string(),
			"urn:ietf:params:oauth:grant-type:jwt-bearer password \
			 urn:ietf:params:oauth:grant-type:saml2-bearer refresh_token"
		);
	}
}
