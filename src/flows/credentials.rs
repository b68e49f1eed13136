//! Tenant credential derivation: dynamic client, bootstrap grant, tenant credentials.

// self
use crate::{
	_prelude::*,
	auth::{EncodedClientCredentials, Username},
	config::CredentialPolicy,
	error::DerivationError,
	flows::{Broker, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionContext,
	transport::AuthTransport,
};

impl<T> Broker<T>
where
	T: ?Sized + AuthTransport,
{
	/// Derives tenant-scoped client credentials for `username` and binds them to the session.
	///
	/// The three stages run strictly in order and each one depends on the previous
	/// result; any failure aborts before the session is written.
	pub async fn derive_tenant_credentials(
		&self,
		session: &SessionContext,
		username: &str,
	) -> Result<EncodedClientCredentials> {
		const KIND: FlowKind = FlowKind::Credentials;

		let username = common::parse_username(username)?;
		let span = FlowSpan::new(KIND, "derive_tenant_credentials", &session.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let guard = common::session_guard(self, &session.id);
				let _serialized = guard.lock().await;

				self.derive_and_bind(session, &username).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Derives credentials and writes them to the session; the caller holds the guard.
	pub(crate) async fn derive_and_bind(
		&self,
		session: &SessionContext,
		username: &Username,
	) -> Result<EncodedClientCredentials> {
		let encoded = self.derive_encoded(username).await?;

		session.binder().bind_credentials(&encoded).await?;

		if self.config.credential_policy == CredentialPolicy::ReuseWithinBroker {
			self.remember_credentials(username, &encoded);
		}

		Ok(encoded)
	}

	/// Places credentials in the session according to the configured policy.
	///
	/// Returns `true` when a cached entry was used instead of a fresh derivation.
	pub(crate) async fn provision_credentials(
		&self,
		session: &SessionContext,
		username: &Username,
	) -> Result<bool> {
		let cached = match self.config.credential_policy {
			CredentialPolicy::ReuseWithinBroker => self.cached_credentials(username),
			CredentialPolicy::AlwaysDerive => None,
		};

		if let Some(cached) = cached {
			session.binder().bind_credentials(&cached).await?;

			return Ok(true);
		}

		self.derive_and_bind(session, username).await?;

		Ok(false)
	}

	async fn derive_encoded(&self, username: &Username) -> Result<EncodedClientCredentials> {
		let client = stage(self.transport.dynamic_client_descriptor().await, |source| {
			DerivationError::DynamicClientUnavailable { source }
		})?;

		obs::report_stage("dynamic_client");

		let bootstrap = stage(self.transport.exchange_bootstrap_grant(&client).await, |source| {
			DerivationError::BootstrapTokenFailure { source }
		})?;

		obs::report_stage("bootstrap_token");

		let credentials =
			stage(self.transport.exchange_tenant_credentials(username, &bootstrap).await, |source| {
				DerivationError::TenantCredentialFailure {
					tenant: username.tenant().to_string(),
					source,
				}
			})?;

		obs::report_stage("tenant_credentials");

		Ok(credentials.encode())
	}
}

fn stage<V>(
	outcome: Result<Option<V>>,
	failure: impl FnOnce(Option<Box<Error>>) -> DerivationError,
) -> Result<V> {
	match outcome {
		Ok(Some(value)) => Ok(value),
		Ok(None) => Err(failure(None).into()),
		Err(e) => Err(failure(Some(Box::new(e))).into()),
	}
}
