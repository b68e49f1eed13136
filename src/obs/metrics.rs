// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_session_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the terminal outcome of `result`.
pub fn record_result<T, E>(kind: FlowKind, result: &Result<T, E>) {
	record_flow_outcome(kind, if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure });
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_is_a_noop_without_recorder() {
		record_flow_outcome(FlowKind::Refresh, FlowOutcome::Retained);
		record_result::<(), ()>(FlowKind::Saml, &Err(()));
	}
}
