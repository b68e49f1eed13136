//! Broker-level error types shared across flows, transports, and session stores.
//!
//! Precondition and derivation failures surface as [`Error`] values. A failed remote
//! refresh is deliberately not part of this taxonomy; it is reported through
//! [`RefreshOutcome::Retained`](crate::flows::RefreshOutcome::Retained) instead.

// self
use crate::{_prelude::*, auth::IdentifierError};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A required argument was missing, empty, or malformed.
	#[error("Required input `{field}` is missing or invalid.")]
	InvalidInput {
		/// Name of the offending argument.
		field: &'static str,
		/// Identifier validation failure, when the input is an identifier.
		#[source]
		source: Option<IdentifierError>,
	},
	/// Tenant credential derivation aborted at one of its stages.
	#[error(transparent)]
	Derivation(#[from] DerivationError),
	/// The chosen grant exchange produced no token pair.
	#[error("The {grant} grant exchange did not yield a token pair.")]
	GrantExchangeFailure {
		/// Grant label.
		grant: &'static str,
		/// Underlying transport or server failure, if one was reported.
		#[source]
		source: Option<Box<Error>>,
	},
	/// Encoded client credentials are absent from the session after derivation.
	#[error("Encoded client credentials are missing from the session.")]
	MissingCredentials,
	/// Refresh was attempted before a grant populated the session.
	#[error("Session is missing the {missing} required for a refresh.")]
	MissingSessionState {
		/// Which slot(s) were empty.
		missing: &'static str,
	},

	/// Session storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::session::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Authorization server rejected the grant or assertion.
	#[error("Authorization server rejected the grant: {reason}.")]
	InvalidGrant {
		/// Server- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Server- or broker-supplied reason string.
		reason: String,
	},
}
impl Error {
	pub(crate) fn invalid_input(field: &'static str) -> Self {
		Self::InvalidInput { field, source: None }
	}

	pub(crate) fn grant_failure(grant: &'static str, source: Option<Error>) -> Self {
		Self::GrantExchangeFailure { grant, source: source.map(Box::new) }
	}
}

/// Stage-specific failures of the tenant credential derivation pipeline.
#[derive(Debug, ThisError)]
pub enum DerivationError {
	/// Authorization server returned no dynamic client descriptor.
	#[error("Unable to obtain a dynamic client descriptor from the authorization server.")]
	DynamicClientUnavailable {
		/// Underlying failure, if the transport reported one.
		#[source]
		source: Option<Box<Error>>,
	},
	/// The bootstrap JWT grant yielded no token.
	#[error("Unable to obtain a bootstrap token through the JWT bearer grant.")]
	BootstrapTokenFailure {
		/// Underlying failure, if the transport reported one.
		#[source]
		source: Option<Box<Error>>,
	},
	/// Tenant-scoped application credentials could not be issued.
	#[error("Unable to obtain tenant-scoped client credentials for tenant `{tenant}`.")]
	TenantCredentialFailure {
		/// Tenant domain the request was made for.
		tenant: String,
		/// Underlying failure, if the transport reported one.
		#[source]
		source: Option<Box<Error>>,
	},
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Broker configuration document could not be parsed.
	#[error("Broker configuration is invalid at `{path}`.")]
	InvalidConfig {
		/// Path to the offending field.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Server descriptor does not enable the requested grant.
	#[error("Descriptor `{descriptor}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Server identifier string.
		descriptor: String,
		/// Disabled grant label.
		grant: &'static str,
	},
	/// Assertion source could not produce a bootstrap assertion.
	#[error("No bootstrap assertion is available: {reason}.")]
	MissingAssertion {
		/// Human-readable reason.
		reason: String,
	},
	/// Token endpoint returned a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an excessively large lifetime.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
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

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Server returned an unexpected but non-fatal response.
	#[error("Authorization server returned an unexpected response: {message}.")]
	Endpoint {
		/// Server- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Server responded with malformed JSON that could not be parsed.
	#[error("Authorization server returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the authorization server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the authorization server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
