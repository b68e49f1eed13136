// self
use oauth2_session_broker::{
	_preludet::*,
	auth::{ClientCredentials, ScopeList, TokenPair},
	config::{BrokerConfig, CredentialPolicy},
	error::DerivationError,
	flows::{Broker, RefreshOutcome},
	session::{
		ACCESS_TOKEN_PAIR_IDENTIFIER, ENCODED_CLIENT_KEYS_IDENTIFIER, SessionBinder, SessionStore,
	},
};

type MockBroker = Broker<MockAuthTransport>;

fn broker_with(transport: MockAuthTransport, config: BrokerConfig) -> MockBroker {
	Broker::with_transport(transport, config)
}

fn scoped_config() -> BrokerConfig {
	BrokerConfig::default()
		.with_scopes(ScopeList::new(["read", "write"]).expect("Scope fixture should be valid."))
}

const TENANT_KEY: &str = "dGVuYW50LWNsaWVudDp0ZW5hbnQtc2VjcmV0";

#[tokio::test]
async fn empty_inputs_fail_without_side_effects() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, store) = memory_session("empty-inputs");

	for (username, password) in [("", "secret"), ("alice", ""), ("", "")] {
		let err = broker
			.setup_by_password(&session, username, password)
			.await
			.expect_err("Empty password grant inputs must be rejected.");

		assert!(matches!(err, Error::InvalidInput { .. }));
	}

	let err = broker
		.setup_by_saml(&session, "alice", "")
		.await
		.expect_err("Empty SAML assertions must be rejected.");

	assert!(matches!(err, Error::InvalidInput { field: "saml_assertion", .. }));

	let err = broker
		.derive_tenant_credentials(&session, "")
		.await
		.expect_err("Empty usernames must be rejected.");

	assert!(matches!(err, Error::InvalidInput { field: "username", .. }));
	assert!(store.is_empty());
	assert!(broker.transport.calls().is_empty());
}

#[tokio::test]
async fn non_empty_usernames_reach_the_transport() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, _) = memory_session("free-form-username");
	let long = "u".repeat(300);

	broker
		.setup_by_password(&session, "John Smith", "secret")
		.await
		.expect("Usernames with spaces should be accepted.");
	broker
		.setup_by_saml(&session, &long, "assertion")
		.await
		.expect("Long usernames should be accepted.");

	assert!(broker.transport.calls().contains(&MockCall::TenantCredentials {
		username: "John Smith".into(),
		bootstrap: "bootstrap-token".into(),
	}));
	assert!(broker.transport.calls().contains(&MockCall::Password {
		username: "John Smith".into(),
		encoded_password: "secret".into(),
		credentials: TENANT_KEY.into(),
		scope: "read write ".into(),
	}));
	assert_eq!(
		broker.transport.count(|call| {
			matches!(call, MockCall::TenantCredentials { username, .. } if *username == long)
		}),
		1
	);
	assert!(
		!broker.invalidate_credentials("John Smith").expect("Spaced usernames should be accepted.")
	);
}

#[tokio::test]
async fn derivation_stage_failures_leave_session_untouched() {
	let cases = [
		MockAuthTransport::default().with_dynamic_client(MockReply::Nothing),
		MockAuthTransport::default().with_bootstrap(MockReply::Nothing),
		MockAuthTransport::default().with_tenant_credentials(MockReply::Unavailable),
	];

	for (idx, transport) in cases.into_iter().enumerate() {
		let broker = broker_with(transport, scoped_config());
		let (session, store) = memory_session("derivation-failure");
		let err = broker
			.setup_by_password(&session, "alice@acme.com", "secret")
			.await
			.expect_err("Derivation failures must abort the setup.");

		match (idx, err) {
			(0, Error::Derivation(DerivationError::DynamicClientUnavailable { source: None })) => {},
			(1, Error::Derivation(DerivationError::BootstrapTokenFailure { source: None })) => {},
			(
				2,
				Error::Derivation(DerivationError::TenantCredentialFailure {
					tenant,
					source: Some(source),
				}),
			) => {
				assert_eq!(tenant, "acme.com");
				assert!(matches!(*source, Error::Transient(_)));
			},
			(idx, other) => panic!("Unexpected error for case {idx}: {other:?}"),
		}

		assert!(store.is_empty(), "Case {idx} must not write to the session.");
		assert_eq!(
			broker.transport.count(|call| matches!(call, MockCall::Password { .. })),
			0,
			"Case {idx} must not reach the password grant."
		);
	}
}

#[tokio::test]
async fn password_setup_stores_exact_pair() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, store) = memory_session("password-setup");
	let pair = broker
		.setup_by_password(&session, "alice@acme.com", "p@ss word")
		.await
		.expect("Password setup should succeed.");

	assert_eq!(pair, TokenPair::new("access-password", "refresh-password"));

	let slots = store.snapshot();
	let stored = TokenPair::from_session_string(
		slots.get(ACCESS_TOKEN_PAIR_IDENTIFIER).expect("Token pair slot should be populated."),
	)
	.expect("Stored pair should parse.");

	assert_eq!(stored.access_token.expose(), "access-password");
	assert_eq!(stored.refresh_token.expose(), "refresh-password");
	assert_eq!(slots.get(ENCODED_CLIENT_KEYS_IDENTIFIER).map(String::as_str), Some(TENANT_KEY));
	assert_eq!(
		broker.transport.calls(),
		vec![
			MockCall::DynamicClient,
			MockCall::Bootstrap { client_id: "dyn-client".into() },
			MockCall::TenantCredentials {
				username: "alice@acme.com".into(),
				bootstrap: "bootstrap-token".into(),
			},
			MockCall::Password {
				username: "alice@acme.com".into(),
				encoded_password: "p%40ss+word".into(),
				credentials: TENANT_KEY.into(),
				scope: "read write ".into(),
			},
		]
	);
}

#[tokio::test]
async fn saml_setup_passes_production_mode() {
	let broker = broker_with(MockAuthTransport::default(), BrokerConfig::default());
	let (session, store) = memory_session("saml-setup");

	broker
		.setup_by_saml(&session, "bob", "PHNhbWw+")
		.await
		.expect("SAML setup should succeed.");

	assert!(broker.transport.calls().contains(&MockCall::Saml {
		assertion: "PHNhbWw+".into(),
		credentials: TENANT_KEY.into(),
		mode: "PRODUCTION".into(),
	}));
	assert_eq!(
		SessionBinder::new(store.as_ref())
			.token_pair()
			.await
			.expect("Session read should succeed."),
		Some(TokenPair::new("access-saml", "refresh-saml"))
	);
}

#[tokio::test]
async fn failed_grant_keeps_previous_pair() {
	let transport = MockAuthTransport::default().with_password(MockReply::Nothing);
	let broker = broker_with(transport, scoped_config());
	let (session, store) = memory_session("failed-grant");
	let previous = TokenPair::new("old-access", "old-refresh");

	SessionBinder::new(store.as_ref())
		.bind_token_pair(&previous)
		.await
		.expect("Seeding the session should succeed.");

	let err = broker
		.setup_by_password(&session, "alice", "secret")
		.await
		.expect_err("A grant without a pair must fail.");

	assert!(matches!(err, Error::GrantExchangeFailure { grant: "password", source: None }));
	assert_eq!(
		SessionBinder::new(store.as_ref()).token_pair().await.expect("Session read should succeed."),
		Some(previous)
	);

	broker.transport.queue_password(MockReply::Reject("bad credentials"));

	let err = broker
		.setup_by_password(&session, "alice", "secret")
		.await
		.expect_err("A rejected grant must fail.");

	match err {
		Error::GrantExchangeFailure { grant: "password", source: Some(source) } =>
			assert!(matches!(*source, Error::InvalidGrant { .. })),
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn refresh_without_state_raises_and_writes_nothing() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, store) = memory_session("refresh-empty");
	let err = broker.refresh(&session).await.expect_err("Refresh without state must fail.");

	assert!(matches!(err, Error::MissingSessionState { .. }));
	assert!(store.is_empty());

	store
		.put(ENCODED_CLIENT_KEYS_IDENTIFIER, TENANT_KEY.into())
		.await
		.expect("Seeding credentials should succeed.");

	let err = broker.refresh(&session).await.expect_err("Refresh without a pair must fail.");

	assert!(matches!(err, Error::MissingSessionState { missing: "access token pair" }));
	assert_eq!(store.len(), 1);

	let (paired, paired_store) = memory_session("refresh-pair-only");

	SessionBinder::new(paired_store.as_ref())
		.bind_token_pair(&TokenPair::new("access", "refresh"))
		.await
		.expect("Seeding the pair should succeed.");

	let before = paired_store.snapshot();
	let err = broker.refresh(&paired).await.expect_err("Refresh without credentials must fail.");

	assert!(matches!(err, Error::MissingSessionState { missing: "encoded client credentials" }));
	assert_eq!(paired_store.snapshot(), before);
	assert!(broker.transport.calls().is_empty());
	assert_eq!(broker.refresh_metrics.failures(), 3);
}

#[tokio::test]
async fn remote_refresh_failure_is_fail_soft() {
	let transport = MockAuthTransport::default().with_refresh(MockReply::Nothing);
	let broker = broker_with(transport, scoped_config());
	let (session, store) = memory_session("refresh-fail-soft");

	broker
		.setup_by_password(&session, "alice", "secret")
		.await
		.expect("Password setup should succeed.");

	let before = store.snapshot();
	let outcome = broker.refresh(&session).await.expect("Remote failures must not raise.");

	assert!(matches!(outcome, RefreshOutcome::Retained(ref failure) if failure.cause.is_none()));
	assert_eq!(store.snapshot(), before, "Session must be byte-identical after a failed refresh.");

	broker.transport.queue_refresh(MockReply::Unavailable);

	let outcome = broker.refresh(&session).await.expect("Transport errors must not raise.");

	match outcome {
		RefreshOutcome::Retained(failure) =>
			assert!(matches!(failure.cause, Some(Error::Transient(_)))),
		other => panic!("Unexpected outcome: {other:?}"),
	}

	assert_eq!(store.snapshot(), before);
	assert_eq!(broker.refresh_metrics.retained(), 2);
	assert_eq!(broker.refresh_metrics.successes(), 0);
}

#[tokio::test]
async fn refresh_replaces_pair_with_current_credentials() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, store) = memory_session("refresh-success");

	broker
		.setup_by_password(&session, "alice", "secret")
		.await
		.expect("Password setup should succeed.");

	let outcome = broker.refresh(&session).await.expect("Refresh should succeed.");

	assert_eq!(outcome.pair(), Some(&TokenPair::new("access-refreshed", "refresh-refreshed")));
	assert!(broker.transport.calls().contains(&MockCall::Refresh {
		refresh_token: "refresh-password".into(),
		credentials: TENANT_KEY.into(),
	}));
	assert_eq!(
		SessionBinder::new(store.as_ref()).token_pair().await.expect("Session read should succeed."),
		Some(TokenPair::new("access-refreshed", "refresh-refreshed"))
	);
	assert_eq!(broker.refresh_metrics.attempts(), 1);
	assert_eq!(broker.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn default_policy_rederives_on_every_setup() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, _store) = memory_session("always-derive");

	for _ in 0..2 {
		broker
			.setup_by_password(&session, "alice", "secret")
			.await
			.expect("Password setup should succeed.");
	}

	assert_eq!(broker.transport.count(|call| *call == MockCall::DynamicClient), 2);
	assert_eq!(broker.transport.count(|call| matches!(call, MockCall::Password { .. })), 2);
}

#[tokio::test]
async fn reuse_policy_retries_once_after_stale_credentials() {
	let config = scoped_config().with_credential_policy(CredentialPolicy::ReuseWithinBroker);
	let broker = broker_with(MockAuthTransport::default(), config);
	let (first, _) = memory_session("reuse-first");
	let (second, second_store) = memory_session("reuse-second");

	broker
		.setup_by_password(&first, "alice@acme.com", "secret")
		.await
		.expect("First setup should derive credentials.");
	broker
		.setup_by_password(&second, "alice@acme.com", "secret")
		.await
		.expect("Second setup should reuse cached credentials.");

	assert_eq!(broker.transport.count(|call| *call == MockCall::DynamicClient), 1);

	let rotated = ClientCredentials::new("rotated-client", "rotated-secret").encode();

	broker.transport.queue_password(MockReply::Reject("invalid_client"));
	broker
		.transport
		.queue_tenant_credentials(MockReply::Value(ClientCredentials::new("rotated-client", "rotated-secret")));

	broker
		.setup_by_password(&second, "alice@acme.com", "secret")
		.await
		.expect("A stale cached credential must be replaced transparently.");

	assert_eq!(broker.transport.count(|call| *call == MockCall::DynamicClient), 2);
	assert_eq!(
		SessionBinder::new(second_store.as_ref())
			.encoded_credentials()
			.await
			.expect("Session read should succeed."),
		Some(rotated)
	);
	assert!(
		!broker.invalidate_credentials("bob").expect("Valid usernames should be accepted."),
		"Unknown users have no cached entry."
	);
	assert!(broker.invalidate_credentials("alice@acme.com").expect("Valid usernames should be accepted."));
}

#[tokio::test]
async fn reuse_policy_surfaces_failure_after_single_retry() {
	let config = scoped_config().with_credential_policy(CredentialPolicy::ReuseWithinBroker);
	let broker = broker_with(MockAuthTransport::default(), config);
	let (session, _) = memory_session("reuse-exhausted");

	broker
		.setup_by_password(&session, "carol", "secret")
		.await
		.expect("Initial setup should succeed.");
	broker.transport.queue_password(MockReply::Reject("first"));
	broker.transport.queue_password(MockReply::Reject("second"));

	let err = broker
		.setup_by_password(&session, "carol", "secret")
		.await
		.expect_err("A second rejection must surface.");

	assert!(matches!(err, Error::GrantExchangeFailure { grant: "password", .. }));
	assert_eq!(broker.transport.count(|call| matches!(call, MockCall::Password { .. })), 3);
}

#[tokio::test]
async fn operations_on_one_session_are_serialized() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, _) = memory_session("serialized");
	let (first, second) = tokio::join!(
		broker.setup_by_password(&session, "alice", "secret"),
		broker.setup_by_saml(&session, "alice", "assertion"),
	);

	first.expect("Password setup should succeed.");
	second.expect("SAML setup should succeed.");

	assert_eq!(broker.transport.max_in_flight(), 1);
}

#[tokio::test]
async fn distinct_sessions_run_concurrently() {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (alice, _) = memory_session("concurrent-alice");
	let (bob, _) = memory_session("concurrent-bob");
	let (first, second) = tokio::join!(
		broker.setup_by_password(&alice, "alice", "secret"),
		broker.setup_by_password(&bob, "bob", "secret"),
	);

	first.expect("Alice's setup should succeed.");
	second.expect("Bob's setup should succeed.");

	assert_eq!(broker.transport.max_in_flight(), 2);
}

#[tokio::test]
async fn clear_session_removes_broker_slots() -> color_eyre::Result<()> {
	let broker = broker_with(MockAuthTransport::default(), scoped_config());
	let (session, store) = memory_session("clear");

	store.put("unrelated", "kept".into()).await?;
	broker.setup_by_password(&session, "alice", "secret").await?;
	broker.clear_session(&session).await?;

	assert_eq!(store.snapshot().into_iter().collect::<Vec<_>>(), vec![(
		"unrelated".to_owned(),
		"kept".to_owned()
	)]);

	let err = broker.refresh(&session).await.expect_err("Cleared sessions cannot refresh.");

	assert!(matches!(err, Error::MissingSessionState { .. }));

	Ok(())
}
