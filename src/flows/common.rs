//! Shared helpers for broker operations (input validation, password encoding, guards).

// self
use crate::{
	_prelude::*,
	auth::{SessionId, Username},
	flows::Broker,
	transport::{AuthTransport, encode_component},
};

/// Form-urlencodes a password before it is handed to the transport.
pub fn encode_password(password: &str) -> String {
	encode_component(password)
}

/// Validates a caller-supplied username.
pub(crate) fn parse_username(raw: &str) -> Result<Username> {
	Username::new(raw).map_err(|e| Error::InvalidInput { field: "username", source: Some(e) })
}

/// Rejects empty secret inputs (passwords, assertions).
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
	if value.is_empty() { Err(Error::invalid_input(field)) } else { Ok(()) }
}

/// Returns (and creates on demand) the guard serializing operations on `session`.
///
/// Guards no other task holds are pruned on the way, so the map tracks live sessions
/// only.
pub(crate) fn session_guard<T>(broker: &Broker<T>, session: &SessionId) -> Arc<AsyncMutex<()>>
where
	T: ?Sized + AuthTransport,
{
	let mut guards = broker.session_guards.lock();

	guards.retain(|id, guard| id == session || Arc::strong_count(guard) > 1);
	guards.entry(session.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn password_is_form_encoded() {
		assert_eq!(encode_password("p@ss word&=1"), "p%40ss+word%26%3D1");
		assert_eq!(encode_password("plain"), "plain");
	}

	#[test]
	fn empty_inputs_are_rejected() {
		assert!(matches!(
			parse_username(""),
			Err(Error::InvalidInput { field: "username", source: Some(_) })
		));
		assert!(matches!(
			require_non_empty("password", ""),
			Err(Error::InvalidInput { field: "password", source: None })
		));
		assert!(require_non_empty("password", "secret").is_ok());
		assert!(parse_username("John Smith").is_ok(), "Only emptiness is rejected.");
	}
}
