//! Authorization-server descriptor data structures shared by the HTTP transport.

/// Builder API for assembling descriptors.
pub mod builder;
/// Grant identifiers and support flags.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{_prelude::*, auth::ProviderId};

/// Endpoint set declared by a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Dynamic client registration endpoint used to mint the bootstrap client.
	pub registration: Url,
	/// Token endpoint used by every grant exchange and refresh.
	pub token: Url,
	/// Endpoint issuing tenant-scoped application credentials.
	pub tenant_registration: Url,
}

/// Immutable authorization-server descriptor consumed by the HTTP transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the server.
	pub endpoints: ProviderEndpoints,
	/// Supported grant flags.
	pub supported_grants: SupportedGrants,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Checks whether the descriptor supports a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}
}
