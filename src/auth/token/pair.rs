//! Access/refresh token pair bound to a session.

// self
use crate::{_prelude::*, auth::TokenSecret, session::StoreError};

/// Access/refresh token pair issued by a grant exchange or refresh.
///
/// A pair is replaced wholesale on refresh; fields are never merged across
/// pairs. The session representation is a JSON object with camel-cased keys
/// (`accessToken`, `refreshToken`, optional `expiresAt` as a unix timestamp).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret used by the refresh grant.
	pub refresh_token: TokenSecret,
	/// Expiry instant, when the server reported a lifetime.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenPair {
	/// Creates a pair without expiry metadata.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_at: None,
		}
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to `issued_at`.
	pub fn with_expires_in(self, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		self.with_expires_at(issued_at + lifetime)
	}

	/// Returns `true` if the access token is known to be expired at `instant`.
	///
	/// Pairs without expiry metadata are never considered expired.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Serializes the pair into its session string form.
	pub fn to_session_string(&self) -> Result<String, StoreError> {
		serde_json::to_string(self).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize token pair: {e}"),
		})
	}

	/// Parses a pair from its session string form.
	pub fn from_session_string(raw: &str) -> Result<Self, StoreError> {
		let mut de = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut de).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse token pair at `{}`: {}", e.path(), e.inner()),
		})
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn session_string_uses_camel_case_keys() {
		let pair = TokenPair::new("access-1", "refresh-1");
		let raw = pair.to_session_string().expect("Token pair should serialize.");

		assert_eq!(raw, "{\"accessToken\":\"access-1\",\"refreshToken\":\"refresh-1\"}");
		assert_eq!(TokenPair::from_session_string(&raw).expect("Pair should parse back."), pair);
	}

	#[test]
	fn expiry_survives_session_round_trip() {
		let issued = macros::datetime!(2025-03-01 10:00 UTC);
		let pair = TokenPair::new("a", "r").with_expires_in(issued, Duration::hours(1));
		let raw = pair.to_session_string().expect("Token pair should serialize.");
		let parsed = TokenPair::from_session_string(&raw).expect("Pair should parse back.");

		assert_eq!(parsed.expires_at, Some(macros::datetime!(2025-03-01 11:00 UTC)));
		assert!(!parsed.is_expired_at(macros::datetime!(2025-03-01 10:59 UTC)));
		assert!(parsed.is_expired_at(macros::datetime!(2025-03-01 11:00 UTC)));
	}

	#[test]
	fn parse_errors_report_the_failing_path() {
		let err = TokenPair::from_session_string("{\"accessToken\":\"a\",\"refreshToken\":7}")
			.expect_err("Numeric refresh token must be rejected.");

		assert!(matches!(&err, StoreError::Serialization { message } if message.contains("refreshToken")));
	}

	#[test]
	fn debug_redacts_secrets() {
		let rendered = format!("{:?}", TokenPair::new("visible?", "nope"));

		assert!(!rendered.contains("visible?"));
		assert!(rendered.contains("<redacted>"));
	}
}
