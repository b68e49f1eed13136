//! Session-scoped token lifecycle operations powered by the broker facade.
//!
//! Every public operation takes a [`SessionContext`] and runs under that session's
//! guard, so concurrent setup and refresh calls on one session never interleave
//! their read-modify-write sequences.

pub mod common;
pub mod refresh;

mod credentials;
mod grant;

pub use common::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{EncodedClientCredentials, SessionId, TenantId, Username},
	config::BrokerConfig,
	session::SessionContext,
	transport::AuthTransport,
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	provider::ProviderDescriptor,
	transport::{AssertionProvider, HttpAuthTransport, ReqwestAuthTransport},
};

type CredentialCacheKey = (TenantId, Username);

/// Broker specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestBroker = Broker<ReqwestAuthTransport>;

/// Coordinates credential derivation, grant exchanges, and refreshes for sessions.
///
/// The broker owns the transport and configuration; session state lives entirely in
/// the caller's [`SessionContext`]. Clones share guards, caches, and metrics.
pub struct Broker<T>
where
	T: ?Sized + AuthTransport,
{
	/// Transport used for every authorization-server call.
	pub transport: Arc<T>,
	/// Scopes, SAML mode, and credential policy.
	pub config: BrokerConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	session_guards: Arc<Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>>,
	credential_cache: Arc<RwLock<HashMap<CredentialCacheKey, EncodedClientCredentials>>>,
}
impl<T> Broker<T>
where
	T: ?Sized + AuthTransport,
{
	/// Creates a broker over a caller-provided transport.
	pub fn with_transport(transport: impl Into<Arc<T>>, config: BrokerConfig) -> Self {
		Self {
			transport: transport.into(),
			config,
			refresh_metrics: Default::default(),
			session_guards: Default::default(),
			credential_cache: Default::default(),
		}
	}

	/// Drops the cached credentials for `username`, returning whether an entry existed.
	///
	/// Only meaningful under [`CredentialPolicy::ReuseWithinBroker`](crate::config::CredentialPolicy::ReuseWithinBroker).
	pub fn invalidate_credentials(&self, username: &str) -> Result<bool> {
		let username = common::parse_username(username)?;

		Ok(self.forget_credentials(&username))
	}

	/// Removes both broker-owned slots from the session.
	pub async fn clear_session(&self, session: &SessionContext) -> Result<()> {
		let guard = common::session_guard(self, &session.id);
		let _serialized = guard.lock().await;

		session.binder().clear().await?;

		Ok(())
	}

	fn cached_credentials(&self, username: &Username) -> Option<EncodedClientCredentials> {
		self.credential_cache.read().get(&(username.tenant(), username.clone())).cloned()
	}

	fn remember_credentials(&self, username: &Username, credentials: &EncodedClientCredentials) {
		self.credential_cache
			.write()
			.insert((username.tenant(), username.clone()), credentials.clone());
	}

	fn forget_credentials(&self, username: &Username) -> bool {
		self.credential_cache.write().remove(&(username.tenant(), username.clone())).is_some()
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestAuthTransport> {
	/// Creates a broker with the default reqwest transport for `descriptor`.
	pub fn new(
		descriptor: ProviderDescriptor,
		config: BrokerConfig,
		assertion: Arc<dyn AssertionProvider>,
	) -> Result<Self, ConfigError> {
		let transport = HttpAuthTransport::new(descriptor, config.bootstrap.clone(), assertion)?;

		Ok(Self::with_transport(transport, config))
	}
}
impl<T> Clone for Broker<T>
where
	T: ?Sized + AuthTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			session_guards: self.session_guards.clone(),
			credential_cache: self.credential_cache.clone(),
		}
	}
}
impl<T> Debug for Broker<T>
where
	T: ?Sized + AuthTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("config", &self.config)
			.field("cached_credentials", &self.credential_cache.read().len())
			.finish_non_exhaustive()
	}
}
