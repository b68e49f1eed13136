//! Strategy hooks that customize authorization-server exchanges.
//!
//! Implementations decorate outgoing token forms and normalize error mapping
//! without tying the HTTP transport to any particular server product.

// self
use crate::{
	_prelude::*,
	provider::GrantType,
	transport::{Exchange, TokenForm},
};

/// Strategy hook that lets deployments decorate requests and classify errors.
///
/// Implementors must be `Send + Sync`. The hooks only see crate-owned data types, so
/// strategies never depend on reqwest-specific structures.
pub trait ProviderStrategy: Send + Sync {
	/// Maps an upstream failure into the broker taxonomy.
	fn classify_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds custom form parameters to a token request before dispatch.
	///
	/// The default implementation leaves the form untouched.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut TokenForm) {}
}

/// Canonical error categories produced by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Server rejected the grant, assertion, or refresh token.
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Failure is temporary and may be retried.
	Transient,
}

/// Context passed to strategies when classifying failures.
///
/// Only primitive data is carried (status codes, OAuth fields, body preview).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Exchange that failed.
	pub exchange: Exchange,
	/// HTTP status code returned by the server, when available.
	pub http_status: Option<u16>,
	/// Server-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Server-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Whether the failure originated from the network layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context for `exchange`.
	pub fn new(exchange: Exchange) -> Self {
		Self {
			exchange,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for a network-level failure.
	pub fn network_failure(exchange: Exchange) -> Self {
		Self { network_error: true, ..Self::new(exchange) }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a truncated body preview.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Best available human-readable reason for the failure.
	pub fn reason(&self) -> String {
		self.error_description
			.clone()
			.or_else(|| self.oauth_error.clone())
			.or_else(|| self.body_preview.clone())
			.unwrap_or_else(|| match self.http_status {
				Some(status) => format!("{} failed with HTTP {status}", self.exchange),
				None => format!("{} failed", self.exchange),
			})
	}
}

/// Default strategy following RFC 6749 error codes.
///
/// Structured OAuth fields win, then body hints, then the HTTP status. Network
/// failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(match_error_code)
			.or_else(|| classify_body(ctx.error_description.as_deref()))
			.or_else(|| classify_body(ctx.body_preview.as_deref()))
			.unwrap_or_else(|| classify_status(ctx.exchange, ctx.http_status))
	}
}

fn truncate_preview(body: String) -> String {
	match body.char_indices().nth(ProviderErrorContext::BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &body[..idx]),
		None => body,
	}
}

fn match_error_code(value: &str) -> Option<ProviderErrorKind> {
	const GRANT: [&str; 4] = ["invalid_grant", "access_denied", "invalid_scope", "invalid_request"];
	const CLIENT: [&str; 3] = ["invalid_client", "unauthorized_client", "unsupported_grant_type"];
	const TRANSIENT: [&str; 2] = ["temporarily_unavailable", "server_error"];

	let matches = |codes: &[&str]| codes.iter().any(|code| value.eq_ignore_ascii_case(code));

	if matches(&GRANT) {
		Some(ProviderErrorKind::InvalidGrant)
	} else if matches(&CLIENT) {
		Some(ProviderErrorKind::InvalidClient)
	} else if matches(&TRANSIENT) {
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") => Some(ProviderErrorKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(ProviderErrorKind::InvalidClient),
		text if text.contains("temporarily_unavailable") => Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(exchange: Exchange, status: Option<u16>) -> ProviderErrorKind {
	match (exchange, status) {
		(_, Some(401 | 403)) => ProviderErrorKind::InvalidClient,
		(Exchange::Token(_), Some(400)) => ProviderErrorKind::InvalidGrant,
		(Exchange::Registration | Exchange::TenantRegistration, Some(400 | 404 | 409)) =>
			ProviderErrorKind::InvalidClient,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_error(&ctx)
	}

	#[test]
	fn oauth_codes_win_over_status() {
		let ctx = ProviderErrorContext::new(Exchange::Token(GrantType::Password))
			.with_http_status(503)
			.with_oauth_error("invalid_grant");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidGrant);
		assert_eq!(
			classify(
				ProviderErrorContext::new(Exchange::Token(GrantType::RefreshToken))
					.with_http_status(400)
					.with_oauth_error("invalid_client")
			),
			ProviderErrorKind::InvalidClient
		);
	}

	#[test]
	fn status_fallback_depends_on_exchange() {
		assert_eq!(
			classify(
				ProviderErrorContext::new(Exchange::Token(GrantType::Saml2Bearer)).with_http_status(400)
			),
			ProviderErrorKind::InvalidGrant
		);
		assert_eq!(
			classify(ProviderErrorContext::new(Exchange::TenantRegistration).with_http_status(400)),
			ProviderErrorKind::InvalidClient
		);
		assert_eq!(
			classify(ProviderErrorContext::new(Exchange::Registration).with_http_status(502)),
			ProviderErrorKind::Transient
		);
		assert_eq!(
			classify(ProviderErrorContext::network_failure(Exchange::Token(GrantType::Password))),
			ProviderErrorKind::Transient
		);
	}

	#[test]
	fn body_preview_is_truncated_and_used_as_reason() {
		let ctx = ProviderErrorContext::new(Exchange::Registration).with_body_preview("x".repeat(300));
		let preview = ctx.body_preview.clone().expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(ctx.reason(), preview);
		assert_eq!(
			ProviderErrorContext::new(Exchange::Registration).with_http_status(500).reason(),
			"client registration failed with HTTP 500"
		);
	}
}
