//! Scripted [`AuthTransport`] double that records every call.

// std
use std::{
	collections::VecDeque,
	sync::atomic::{AtomicUsize, Ordering},
	task::{Context, Poll},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, EncodedClientCredentials, TokenPair, Username},
	error::TransientError,
	transport::{AuthTransport, BootstrapToken, DynamicClientDescriptor, TransportFuture},
};

/// Scripted reply for one transport call.
#[derive(Clone, Debug)]
pub enum MockReply<T> {
	/// Server answered with a value.
	Value(T),
	/// Server answered without the expected payload.
	Nothing,
	/// Server rejected the request (`Error::InvalidGrant`).
	Reject(&'static str),
	/// Server was unavailable (`Error::Transient`).
	Unavailable,
}
impl<T> MockReply<T> {
	fn resolve(self) -> Result<Option<T>> {
		match self {
			MockReply::Value(value) => Ok(Some(value)),
			MockReply::Nothing => Ok(None),
			MockReply::Reject(reason) => Err(Error::InvalidGrant { reason: reason.into() }),
			MockReply::Unavailable => Err(TransientError::Endpoint {
				message: "mock authorization server unavailable".into(),
				status: Some(503),
				retry_after: None,
			}
			.into()),
		}
	}
}

/// Call observed by [`MockAuthTransport`], with secrets exposed for assertions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
	/// `dynamic_client_descriptor`.
	DynamicClient,
	/// `exchange_bootstrap_grant`.
	Bootstrap {
		/// Dynamic client id.
		client_id: String,
	},
	/// `exchange_tenant_credentials`.
	TenantCredentials {
		/// Username the credentials were requested for.
		username: String,
		/// Bootstrap bearer token.
		bootstrap: String,
	},
	/// `exchange_password_grant`.
	Password {
		/// Username.
		username: String,
		/// Password as handed to the transport.
		encoded_password: String,
		/// Encoded client credentials.
		credentials: String,
		/// Scope string.
		scope: String,
	},
	/// `exchange_saml_grant`.
	Saml {
		/// Assertion.
		assertion: String,
		/// Encoded client credentials.
		credentials: String,
		/// Deployment mode.
		mode: String,
	},
	/// `exchange_refresh_grant`.
	Refresh {
		/// Refresh token presented.
		refresh_token: String,
		/// Encoded client credentials.
		credentials: String,
	},
}

#[derive(Debug)]
struct Responder<T> {
	queue: VecDeque<MockReply<T>>,
	fallback: MockReply<T>,
}
impl<T> Responder<T>
where
	T: Clone,
{
	fn seeded(fallback: T) -> Mutex<Self> {
		Mutex::new(Self { queue: VecDeque::new(), fallback: MockReply::Value(fallback) })
	}

	fn next(&mut self) -> MockReply<T> {
		self.queue.pop_front().unwrap_or_else(|| self.fallback.clone())
	}
}

/// In-memory [`AuthTransport`] with scripted replies.
///
/// Each operation answers from its queue first and falls back to a default reply.
/// Every call yields once before resolving so concurrent callers interleave, and the
/// peak number of overlapping calls is tracked.
#[derive(Debug)]
pub struct MockAuthTransport {
	dynamic_client: Mutex<Responder<DynamicClientDescriptor>>,
	bootstrap: Mutex<Responder<BootstrapToken>>,
	tenant_credentials: Mutex<Responder<ClientCredentials>>,
	password: Mutex<Responder<TokenPair>>,
	saml: Mutex<Responder<TokenPair>>,
	refresh: Mutex<Responder<TokenPair>>,
	calls: Mutex<Vec<MockCall>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl MockAuthTransport {
	/// Sets the fallback reply of `dynamic_client_descriptor`.
	pub fn with_dynamic_client(self, reply: MockReply<DynamicClientDescriptor>) -> Self {
		self.dynamic_client.lock().fallback = reply;

		self
	}

	/// Sets the fallback reply of `exchange_bootstrap_grant`.
	pub fn with_bootstrap(self, reply: MockReply<BootstrapToken>) -> Self {
		self.bootstrap.lock().fallback = reply;

		self
	}

	/// Sets the fallback reply of `exchange_tenant_credentials`.
	pub fn with_tenant_credentials(self, reply: MockReply<ClientCredentials>) -> Self {
		self.tenant_credentials.lock().fallback = reply;

		self
	}

	/// Sets the fallback reply of `exchange_password_grant`.
	pub fn with_password(self, reply: MockReply<TokenPair>) -> Self {
		self.password.lock().fallback = reply;

		self
	}

	/// Sets the fallback reply of `exchange_saml_grant`.
	pub fn with_saml(self, reply: MockReply<TokenPair>) -> Self {
		self.saml.lock().fallback = reply;

		self
	}

	/// Sets the fallback reply of `exchange_refresh_grant`.
	pub fn with_refresh(self, reply: MockReply<TokenPair>) -> Self {
		self.refresh.lock().fallback = reply;

		self
	}

	/// Queues a one-shot reply for `exchange_tenant_credentials`.
	pub fn queue_tenant_credentials(&self, reply: MockReply<ClientCredentials>) {
		self.tenant_credentials.lock().queue.push_back(reply);
	}

	/// Queues a one-shot reply for `exchange_password_grant`.
	pub fn queue_password(&self, reply: MockReply<TokenPair>) {
		self.password.lock().queue.push_back(reply);
	}

	/// Queues a one-shot reply for `exchange_saml_grant`.
	pub fn queue_saml(&self, reply: MockReply<TokenPair>) {
		self.saml.lock().queue.push_back(reply);
	}

	/// Queues a one-shot reply for `exchange_refresh_grant`.
	pub fn queue_refresh(&self, reply: MockReply<TokenPair>) {
		self.refresh.lock().queue.push_back(reply);
	}

	/// Every call observed so far, in order.
	pub fn calls(&self) -> Vec<MockCall> {
		self.calls.lock().clone()
	}

	/// Number of observed calls matching `predicate`.
	pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
		self.calls.lock().iter().filter(|call| predicate(call)).count()
	}

	/// Highest number of transport calls that were in flight at once.
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	fn record(&self, call: MockCall) {
		self.calls.lock().push(call);
	}

	async fn settle<T>(&self, reply: MockReply<T>) -> Result<Option<T>> {
		let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

		self.max_in_flight.fetch_max(current, Ordering::SeqCst);

		YieldNow::default().await;

		self.in_flight.fetch_sub(1, Ordering::SeqCst);

		reply.resolve()
	}
}
impl Default for MockAuthTransport {
	fn default() -> Self {
		Self {
			dynamic_client: Responder::seeded(DynamicClientDescriptor::new("dyn-client", "dyn-secret")),
			bootstrap: Responder::seeded(BootstrapToken::new("bootstrap-token")),
			tenant_credentials: Responder::seeded(ClientCredentials::new(
				"tenant-client",
				"tenant-secret",
			)),
			password: Responder::seeded(TokenPair::new("access-password", "refresh-password")),
			saml: Responder::seeded(TokenPair::new("access-saml", "refresh-saml")),
			refresh: Responder::seeded(TokenPair::new("access-refreshed", "refresh-refreshed")),
			calls: Default::default(),
			in_flight: Default::default(),
			max_in_flight: Default::default(),
		}
	}
}
impl AuthTransport for MockAuthTransport {
	fn dynamic_client_descriptor(&self) -> TransportFuture<'_, DynamicClientDescriptor> {
		self.record(MockCall::DynamicClient);

		let reply = self.dynamic_client.lock().next();

		Box::pin(self.settle(reply))
	}

	fn exchange_bootstrap_grant<'a>(
		&'a self,
		client: &'a DynamicClientDescriptor,
	) -> TransportFuture<'a, BootstrapToken> {
		self.record(MockCall::Bootstrap { client_id: client.credentials.client_id.clone() });

		let reply = self.bootstrap.lock().next();

		Box::pin(self.settle(reply))
	}

	fn exchange_tenant_credentials<'a>(
		&'a self,
		username: &'a Username,
		bootstrap: &'a BootstrapToken,
	) -> TransportFuture<'a, ClientCredentials> {
		self.record(MockCall::TenantCredentials {
			username: username.to_string(),
			bootstrap: bootstrap.access_token.expose().to_owned(),
		});

		let reply = self.tenant_credentials.lock().next();

		Box::pin(self.settle(reply))
	}

	fn exchange_password_grant<'a>(
		&'a self,
		username: &'a Username,
		encoded_password: &'a str,
		credentials: &'a EncodedClientCredentials,
		scope: &'a str,
	) -> TransportFuture<'a, TokenPair> {
		self.record(MockCall::Password {
			username: username.to_string(),
			encoded_password: encoded_password.to_owned(),
			credentials: credentials.expose().to_owned(),
			scope: scope.to_owned(),
		});

		let reply = self.password.lock().next();

		Box::pin(self.settle(reply))
	}

	fn exchange_saml_grant<'a>(
		&'a self,
		assertion: &'a str,
		credentials: &'a EncodedClientCredentials,
		mode: &'a str,
	) -> TransportFuture<'a, TokenPair> {
		self.record(MockCall::Saml {
			assertion: assertion.to_owned(),
			credentials: credentials.expose().to_owned(),
			mode: mode.to_owned(),
		});

		let reply = self.saml.lock().next();

		Box::pin(self.settle(reply))
	}

	fn exchange_refresh_grant<'a>(
		&'a self,
		current: &'a TokenPair,
		credentials: &'a EncodedClientCredentials,
	) -> TransportFuture<'a, TokenPair> {
		self.record(MockCall::Refresh {
			refresh_token: current.refresh_token.expose().to_owned(),
			credentials: credentials.expose().to_owned(),
		});

		let reply = self.refresh.lock().next();

		Box::pin(self.settle(reply))
	}
}

#[derive(Default)]
struct YieldNow(bool);
impl Future for YieldNow {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.0 {
			return Poll::Ready(());
		}

		self.0 = true;
		cx.waker().wake_by_ref();

		Poll::Pending
	}
}
