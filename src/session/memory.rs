//! Thread-safe in-memory [`SessionStore`] for single-process hosts and tests.

// self
use crate::{
	_prelude::*,
	session::{SessionStore, StoreError, StoreFuture},
};

type SlotMap = Arc<RwLock<BTreeMap<String, String>>>;

/// In-process session backed by a shared map; clones share the same slots.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(SlotMap);
impl MemorySessionStore {
	/// Returns a copy of every slot currently held by the session.
	pub fn snapshot(&self) -> BTreeMap<String, String> {
		self.0.read().clone()
	}

	/// Number of populated slots.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true if the session holds no slots.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn put_now(map: SlotMap, key: String, value: String) -> Result<(), StoreError> {
		map.write().insert(key, value);

		Ok(())
	}
}
impl SessionStore for MemorySessionStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let value = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(value) })
	}

	fn put<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::put_now(map, key, value) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(key)) })
	}
}
