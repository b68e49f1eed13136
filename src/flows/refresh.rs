//! Fail-soft refresh of the session token pair.
//!
//! [`Broker::refresh`] raises only for local precondition failures. When the
//! authorization server does not issue a new pair the session keeps its current one,
//! the failure is logged at error level, and the caller receives
//! [`RefreshOutcome::Retained`].

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	flows::{Broker, common},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionContext,
	transport::AuthTransport,
};

/// Result of a refresh that passed its local preconditions.
#[derive(Debug)]
pub enum RefreshOutcome {
	/// The session now holds this pair.
	Refreshed(TokenPair),
	/// The server did not refresh; the session pair is unchanged.
	Retained(RemoteRefreshFailure),
}
impl RefreshOutcome {
	/// Returns `true` when a new pair was stored.
	pub fn is_refreshed(&self) -> bool {
		matches!(self, RefreshOutcome::Refreshed(_))
	}

	/// The newly stored pair, if any.
	pub fn pair(&self) -> Option<&TokenPair> {
		match self {
			RefreshOutcome::Refreshed(pair) => Some(pair),
			RefreshOutcome::Retained(_) => None,
		}
	}
}

/// Remote refresh failure reported without raising.
#[derive(Debug, ThisError)]
#[error("The refresh grant did not yield a new token pair.")]
pub struct RemoteRefreshFailure {
	/// Classified transport or server failure, when one was reported.
	#[source]
	pub cause: Option<Error>,
}

impl<T> Broker<T>
where
	T: ?Sized + AuthTransport,
{
	/// Exchanges the session's refresh token for a new pair.
	///
	/// Missing session state is raised as [`Error::MissingSessionState`]; a remote
	/// failure is returned as [`RefreshOutcome::Retained`] and leaves the session untouched.
	pub async fn refresh(&self, session: &SessionContext) -> Result<RefreshOutcome> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh", &session.id);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let guard = common::session_guard(self, &session.id);
				let _serialized = guard.lock().await;

				self.refresh_metrics.record_attempt();

				self.refresh_locked(session)
					.await
					.inspect_err(|_| self.refresh_metrics.record_failure())
			})
			.await;

		match &result {
			Ok(RefreshOutcome::Refreshed(_)) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Ok(RefreshOutcome::Retained(_)) => obs::record_flow_outcome(KIND, FlowOutcome::Retained),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn refresh_locked(&self, session: &SessionContext) -> Result<RefreshOutcome> {
		let binder = session.binder();
		let current = binder.token_pair().await?;
		let credentials = binder.encoded_credentials().await?;
		let (current, credentials) = match (current, credentials) {
			(Some(current), Some(credentials)) => (current, credentials),
			(None, Some(_)) => return Err(Error::MissingSessionState { missing: "access token pair" }),
			(Some(_), None) =>
				return Err(Error::MissingSessionState { missing: "encoded client credentials" }),
			(None, None) =>
				return Err(Error::MissingSessionState {
					missing: "access token pair and encoded client credentials",
				}),
		};

		match self.transport.exchange_refresh_grant(&current, &credentials).await {
			Ok(Some(pair)) => {
				binder.bind_token_pair(&pair).await?;
				self.refresh_metrics.record_success();

				Ok(RefreshOutcome::Refreshed(pair))
			},
			outcome => {
				let failure = RemoteRefreshFailure { cause: outcome.err() };

				match &failure.cause {
					Some(cause) => obs::report_refresh_retained(&session.id, cause),
					None => obs::report_refresh_retained(&session.id, &failure),
				}

				self.refresh_metrics.record_retained();

				Ok(RefreshOutcome::Retained(failure))
			},
		}
	}
}
