//! Session storage contracts, built-in stores, and the typed slot binder.
//!
//! A [`SessionStore`] is a string key/value map scoped to one end-user session.
//! The broker only ever touches two slots, named by [`ENCODED_CLIENT_KEYS_IDENTIFIER`]
//! and [`ACCESS_TOKEN_PAIR_IDENTIFIER`]; [`SessionBinder`] gives those slots typed
//! accessors so strings only appear at the storage boundary.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

// self
use crate::{
	_prelude::*,
	auth::{EncodedClientCredentials, SessionId, TokenPair},
};

/// Session key holding the base64 tenant client credentials.
pub const ENCODED_CLIENT_KEYS_IDENTIFIER: &str = "encodedClientKey";
/// Session key holding the serialized access/refresh token pair.
pub const ACCESS_TOKEN_PAIR_IDENTIFIER: &str = "accessTokenPair";

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend for one session's string slots.
///
/// A successful `put` must be visible to every later `get` on the same store.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn put<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes the value under `key`, returning it when present.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;
}

/// Error type produced by [`SessionStore`] implementations and slot codecs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A slot value could not be serialized or parsed.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Handle to one end-user session passed into every broker operation.
#[derive(Clone)]
pub struct SessionContext {
	/// Identifier used to serialize concurrent operations on this session.
	pub id: SessionId,
	/// Backing store for the session's slots.
	pub store: Arc<dyn SessionStore>,
}
impl SessionContext {
	/// Binds a session identifier to its backing store.
	pub fn new(id: SessionId, store: Arc<dyn SessionStore>) -> Self {
		Self { id, store }
	}

	/// Returns the typed slot accessor for this session.
	pub fn binder(&self) -> SessionBinder<'_> {
		SessionBinder::new(self.store.as_ref())
	}
}
impl Debug for SessionContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionContext").field("id", &self.id).finish_non_exhaustive()
	}
}

/// Typed accessor over the two broker-owned session slots.
#[derive(Clone, Copy)]
pub struct SessionBinder<'a> {
	store: &'a dyn SessionStore,
}
impl<'a> SessionBinder<'a> {
	/// Wraps a store reference.
	pub fn new(store: &'a dyn SessionStore) -> Self {
		Self { store }
	}

	/// Reads the encoded client credentials slot.
	pub async fn encoded_credentials(&self) -> Result<Option<EncodedClientCredentials>, StoreError> {
		let raw = self.store.get(ENCODED_CLIENT_KEYS_IDENTIFIER).await?;

		Ok(raw.filter(|value| !value.is_empty()).map(EncodedClientCredentials::from_encoded))
	}

	/// Writes the encoded client credentials slot.
	pub async fn bind_credentials(
		&self,
		credentials: &EncodedClientCredentials,
	) -> Result<(), StoreError> {
		self.store.put(ENCODED_CLIENT_KEYS_IDENTIFIER, credentials.expose().to_owned()).await
	}

	/// Reads and parses the token pair slot.
	pub async fn token_pair(&self) -> Result<Option<TokenPair>, StoreError> {
		match self.store.get(ACCESS_TOKEN_PAIR_IDENTIFIER).await? {
			Some(raw) if !raw.is_empty() => TokenPair::from_session_string(&raw).map(Some),
			_ => Ok(None),
		}
	}

	/// Serializes and writes the token pair slot.
	///
	/// Serialization happens before the store is touched, so a failure leaves the
	/// previous pair in place.
	pub async fn bind_token_pair(&self, pair: &TokenPair) -> Result<(), StoreError> {
		let raw = pair.to_session_string()?;

		self.store.put(ACCESS_TOKEN_PAIR_IDENTIFIER, raw).await
	}

	/// Clears both broker-owned slots.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.store.remove(ACCESS_TOKEN_PAIR_IDENTIFIER).await?;
		self.store.remove(ENCODED_CLIENT_KEYS_IDENTIFIER).await?;

		Ok(())
	}
}
impl Debug for SessionBinder<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SessionBinder(..)")
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::auth::ClientCredentials;

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error = StoreError::Backend { message: "session backend unreachable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("session backend unreachable"));

		let source = StdError::source(&broker_error)
			.expect("Broker error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[tokio::test]
	async fn binder_round_trips_typed_slots() {
		let store = MemorySessionStore::default();
		let binder = SessionBinder::new(&store);
		let credentials = ClientCredentials::new("client", "secret").encode();
		let pair = TokenPair::new("access", "refresh");

		assert!(binder.encoded_credentials().await.expect("Read should succeed.").is_none());
		assert!(binder.token_pair().await.expect("Read should succeed.").is_none());

		binder.bind_credentials(&credentials).await.expect("Credential write should succeed.");
		binder.bind_token_pair(&pair).await.expect("Pair write should succeed.");

		assert_eq!(
			store.snapshot().get(ENCODED_CLIENT_KEYS_IDENTIFIER).map(String::as_str),
			Some("Y2xpZW50OnNlY3JldA==")
		);
		assert_eq!(binder.encoded_credentials().await.expect("Read should succeed."), Some(credentials));
		assert_eq!(binder.token_pair().await.expect("Read should succeed."), Some(pair));

		binder.clear().await.expect("Clearing the session should succeed.");

		assert!(store.snapshot().is_empty());
	}

	#[tokio::test]
	async fn binder_treats_empty_slots_as_absent() {
		let store = MemorySessionStore::default();

		store.put(ENCODED_CLIENT_KEYS_IDENTIFIER, String::new()).await.expect("Seed should succeed.");
		store.put(ACCESS_TOKEN_PAIR_IDENTIFIER, String::new()).await.expect("Seed should succeed.");

		let binder = SessionBinder::new(&store);

		assert!(binder.encoded_credentials().await.expect("Read should succeed.").is_none());
		assert!(binder.token_pair().await.expect("Read should succeed.").is_none());
	}

	#[tokio::test]
	async fn corrupted_pair_surfaces_serialization_error() {
		let store = MemorySessionStore::default();

		store.put(ACCESS_TOKEN_PAIR_IDENTIFIER, "not-json".into()).await.expect("Seed should succeed.");

		let err = SessionBinder::new(&store)
			.token_pair()
			.await
			.expect_err("Corrupted pair must not parse.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}
}
