//! Translation of HTTP client failures into broker errors.

// crates.io
use oauth2::HttpClientError;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError, TransportError},
	http::ResponseMetadata,
	provider::{ProviderErrorContext, ProviderErrorKind, ProviderStrategy},
	transport::Exchange,
};

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] raised while performing `exchange`.
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		exchange: Exchange,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		exchange: Exchange,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(strategy, exchange, meta, *inner),
			other => map_generic_error(exchange, meta, other),
		}
	}
}

/// Fallback mapping shared by every mapper for the non transport-specific variants.
pub fn map_generic_error<E>(
	exchange: Exchange,
	meta: Option<&ResponseMetadata>,
	err: HttpClientError<E>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Other(message) => TransientError::Endpoint {
			message: format!("HTTP client error during {exchange}: {message}"),
			status: meta.and_then(|m| m.status),
			retry_after: meta.and_then(|m| m.retry_after),
		}
		.into(),
		_ => TransientError::Endpoint {
			message: format!("HTTP client error during {exchange}"),
			status: meta.and_then(|m| m.status),
			retry_after: meta.and_then(|m| m.retry_after),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	strategy: &dyn ProviderStrategy,
	exchange: Exchange,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	let status = meta.and_then(|m| m.status).or_else(|| err.status().map(|code| code.as_u16()));

	if err.is_timeout() {
		return TransientError::Endpoint {
			message: format!("Request timed out during {exchange}"),
			status,
			retry_after: meta.and_then(|m| m.retry_after),
		}
		.into();
	}

	let mut ctx = ProviderErrorContext::network_failure(exchange);

	if let Some(status) = status {
		ctx = ctx.with_http_status(status);
	}

	match strategy.classify_error(&ctx) {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason: ctx.reason() },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason: ctx.reason() },
		ProviderErrorKind::Transient => TransportError::from(err).into(),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// self
	use super::*;
	use crate::provider::GrantType;

	#[test]
	fn generic_variants_map_to_broker_taxonomy() {
		let exchange = Exchange::Token(GrantType::Password);
		let io_error = map_generic_error::<io::Error>(
			exchange,
			None,
			HttpClientError::Io(io::Error::other("connection reset")),
		);
		let other = map_generic_error::<io::Error>(
			exchange,
			Some(&ResponseMetadata { status: Some(502), retry_after: None }),
			HttpClientError::Other("bad gateway".into()),
		);

		assert!(matches!(io_error, Error::Transport(TransportError::Io(_))));
		assert!(matches!(
			other,
			Error::Transient(TransientError::Endpoint { status: Some(502), .. })
		));
	}
}
