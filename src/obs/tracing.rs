// self
use crate::{_prelude::*, auth::SessionId, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one broker operation on one session.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a span tagged with the operation kind, call site, and session.
	pub fn new(kind: FlowKind, stage: &'static str, session: &SessionId) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"oauth2_session_broker.flow",
				flow = kind.as_str(),
				stage,
				session = session.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, session);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Reports a refresh that failed remotely while the session kept its previous pair.
pub fn report_refresh_retained(session: &SessionId, reason: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::error!(
		session = session.as_str(),
		%reason,
		"Error in refreshing tokens; the session keeps its current access token pair."
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (session, reason);
}

/// Reports that a cached tenant credential was dropped after a failed grant.
pub fn report_stale_credentials(fingerprint: &str, grant: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		credential = fingerprint,
		grant,
		"Cached tenant credentials were rejected; re-deriving once."
	);

	#[cfg(not(feature = "tracing"))]
	let _ = (fingerprint, grant);
}

/// Reports a completed derivation stage.
pub fn report_stage(stage: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(stage, "Credential derivation stage completed.");

	#[cfg(not(feature = "tracing"))]
	let _ = stage;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let session = SessionId::new("obs-session").expect("Session fixture should be valid.");
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future", &session);
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);

		report_refresh_retained(&session, &"upstream unavailable");
		report_stale_credentials("fp", "password");
		report_stage("bootstrap");
	}
}
