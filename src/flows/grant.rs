//! Password and SAML bearer grant setup.

// self
use crate::{
	_prelude::*,
	auth::{EncodedClientCredentials, TokenPair, Username},
	flows::{Broker, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
	session::SessionContext,
	transport::AuthTransport,
};

enum GrantRequest<'a> {
	Password { username: &'a Username, encoded_password: String, scope: String },
	Saml { assertion: &'a str, mode: &'a str },
}
impl GrantRequest<'_> {
	fn grant(&self) -> GrantType {
		match self {
			GrantRequest::Password { .. } => GrantType::Password,
			GrantRequest::Saml { .. } => GrantType::Saml2Bearer,
		}
	}
}

impl<T> Broker<T>
where
	T: ?Sized + AuthTransport,
{
	/// Derives tenant credentials and stores the pair issued by the password grant.
	///
	/// The password is form-urlencoded before it reaches the transport and the
	/// configured scopes are sent as `"<scope> "` repeated in order.
	pub async fn setup_by_password(
		&self,
		session: &SessionContext,
		username: &str,
		password: &str,
	) -> Result<TokenPair> {
		const KIND: FlowKind = FlowKind::Password;

		let username = common::parse_username(username)?;

		common::require_non_empty("password", password)?;

		let request = GrantRequest::Password {
			username: &username,
			encoded_password: common::encode_password(password),
			scope: self.config.scopes.to_request_string(' '),
		};
		let span = FlowSpan::new(KIND, "setup_by_password", &session.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.setup(session, &username, &request)).await;

		obs::record_result(KIND, &result);

		result
	}

	/// Derives tenant credentials and stores the pair issued by the SAML bearer grant.
	///
	/// The configured `saml_mode` is forwarded verbatim.
	pub async fn setup_by_saml(
		&self,
		session: &SessionContext,
		username: &str,
		saml_assertion: &str,
	) -> Result<TokenPair> {
		const KIND: FlowKind = FlowKind::Saml;

		let username = common::parse_username(username)?;

		common::require_non_empty("saml_assertion", saml_assertion)?;

		let request =
			GrantRequest::Saml { assertion: saml_assertion, mode: self.config.saml_mode.as_str() };
		let span = FlowSpan::new(KIND, "setup_by_saml", &session.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.setup(session, &username, &request)).await;

		obs::record_result(KIND, &result);

		result
	}

	async fn setup(
		&self,
		session: &SessionContext,
		username: &Username,
		request: &GrantRequest<'_>,
	) -> Result<TokenPair> {
		let guard = common::session_guard(self, &session.id);
		let _serialized = guard.lock().await;
		let binder = session.binder();
		let reused = self.provision_credentials(session, username).await?;
		let credentials = binder.encoded_credentials().await?.ok_or(Error::MissingCredentials)?;
		let pair = match self.exchange(request, &credentials).await {
			Ok(Some(pair)) => pair,
			_ if reused => {
				let grant = request.grant().label();

				obs::report_stale_credentials(&credentials.fingerprint(), grant);
				self.forget_credentials(username);
				self.derive_and_bind(session, username).await?;

				let credentials =
					binder.encoded_credentials().await?.ok_or(Error::MissingCredentials)?;

				issued(grant, self.exchange(request, &credentials).await)?
			},
			outcome => issued(request.grant().label(), outcome)?,
		};

		binder.bind_token_pair(&pair).await?;

		Ok(pair)
	}

	async fn exchange(
		&self,
		request: &GrantRequest<'_>,
		credentials: &EncodedClientCredentials,
	) -> Result<Option<TokenPair>> {
		match request {
			GrantRequest::Password { username, encoded_password, scope } =>
				self.transport
					.exchange_password_grant(username, encoded_password, credentials, scope)
					.await,
			GrantRequest::Saml { assertion, mode } =>
				self.transport.exchange_saml_grant(assertion, credentials, mode).await,
		}
	}
}

fn issued(grant: &'static str, outcome: Result<Option<TokenPair>>) -> Result<TokenPair> {
	match outcome {
		Ok(Some(pair)) => Ok(pair),
		Ok(None) => Err(Error::grant_failure(grant, None)),
		Err(e) => Err(Error::grant_failure(grant, Some(e))),
	}
}
