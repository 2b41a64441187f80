//! Unit tests for request dispatch, retry, and fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use url::Url;

use super::{DispatcherConfig, DispatcherPorts, RequestDispatcher};
use crate::domain::auth::LoginCredentials;
use crate::domain::backend_probe::{BackendProbe, SourceDecision};
use crate::domain::credential::{BearerCredential, TokenClaims, synthesize_unsigned_token};
use crate::domain::error::ErrorKind;
use crate::domain::ids::{ListingId, ReviewId};
use crate::domain::operation::{
    AuthGrant, DispatchOptions, Operation, OperationOutput,
};
use crate::domain::ports::{
    DataSource, DataSourceError, MockDataSource, TransportError, TransportResponse,
};
use crate::domain::session::{Role, Session, SessionProfile};
use crate::domain::review::{Rating, ReviewDraft};
use crate::domain::session_store::SessionStore;
use crate::outbound::simulation::SimulationStore;
use crate::outbound::storage::MemorySlotStorage;
use crate::test_support::{
    MutableClock, RecordingSleeper, ScriptedSource, ScriptedTransport, json_response,
};

struct Harness {
    dispatcher: RequestDispatcher,
    backend: Arc<ScriptedSource>,
    simulation: Arc<ScriptedSource>,
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<RecordingSleeper>,
    sessions: Arc<SessionStore>,
}

fn probe_result(backend_present: bool) -> Result<TransportResponse, TransportError> {
    if backend_present {
        Ok(json_response(200, serde_json::json!([])))
    } else {
        Err(TransportError::connect("connection refused"))
    }
}

fn harness_with(
    backend_present: bool,
    backend: ScriptedSource,
    simulation: ScriptedSource,
    config: DispatcherConfig,
) -> Harness {
    let clock = Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let transport = Arc::new(ScriptedTransport::new(vec![probe_result(backend_present)]));
    let probe = Arc::new(BackendProbe::new(
        transport.clone(),
        Url::parse("http://127.0.0.1:5000/api/v1/places").expect("url"),
        Duration::from_millis(100),
    ));
    let sessions = Arc::new(SessionStore::new(
        Arc::new(MemorySlotStorage::default()),
        clock.clone(),
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let backend = Arc::new(backend);
    let simulation = Arc::new(simulation);
    let dispatcher = RequestDispatcher::new(
        DispatcherPorts {
            backend: backend.clone(),
            simulation: simulation.clone(),
        },
        probe,
        sessions.clone(),
        clock,
        sleeper.clone(),
        config,
    );
    Harness {
        dispatcher,
        backend,
        simulation,
        transport,
        sleeper,
        sessions,
    }
}

fn harness(
    backend_present: bool,
    backend: Vec<Result<OperationOutput, DataSourceError>>,
    simulation: Vec<Result<OperationOutput, DataSourceError>>,
) -> Harness {
    harness_with(
        backend_present,
        ScriptedSource::new(backend),
        ScriptedSource::new(simulation),
        DispatcherConfig::default(),
    )
}

fn signed_in(harness: &Harness) -> BearerCredential {
    let credential = synthesize_unsigned_token(&TokenClaims {
        user_id: Some("u1".to_owned()),
        name: Some("Demo User".to_owned()),
        ..TokenClaims::default()
    })
    .expect("encode");
    harness
        .sessions
        .set(Session::from_credential(credential.clone(), Utc::now()));
    credential
}

fn delete_review() -> Operation {
    Operation::DeleteReview {
        id: ReviewId::new("r1").expect("id"),
    }
}

#[fixture]
fn auth_required() -> DispatchOptions {
    DispatchOptions {
        requires_auth: true,
    }
}

#[rstest]
#[tokio::test]
async fn auth_precheck_skips_probe_and_transport(auth_required: DispatchOptions) {
    let h = harness(true, vec![], vec![]);
    let failure = h
        .dispatcher
        .execute(delete_review(), auth_required)
        .await
        .expect_err("no session");

    assert_eq!(failure.kind(), ErrorKind::Unauthenticated);
    assert!(!failure.is_retryable());
    assert_eq!(h.transport.calls(), 0);
    assert_eq!(h.backend.calls(), 0);
    assert_eq!(h.simulation.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn network_failures_retry_with_doubling_delay(auth_required: DispatchOptions) {
    let h = harness(
        true,
        vec![
            Err(DataSourceError::network("refused")),
            Err(DataSourceError::timeout("slow")),
            Err(DataSourceError::network("refused")),
        ],
        vec![],
    );
    signed_in(&h);

    let failure = h
        .dispatcher
        .execute(delete_review(), auth_required)
        .await
        .expect_err("budget exhausted");

    assert_eq!(failure.kind(), ErrorKind::Network);
    assert!(!failure.is_retryable());
    assert_eq!(h.backend.calls(), 3);
    assert_eq!(
        h.sleeper.recorded(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(h.simulation.calls(), 0);
}

#[rstest]
#[case(1, vec![Duration::from_secs(1)])]
#[case(2, vec![Duration::from_secs(1), Duration::from_secs(2)])]
#[tokio::test]
async fn transient_failures_then_success_returns_output(
    #[case] failures: usize,
    #[case] delays: Vec<Duration>,
) {
    let mut script: Vec<_> = (0..failures)
        .map(|_| Err(DataSourceError::network("refused")))
        .collect();
    script.push(Ok(OperationOutput::Listings(vec![])));
    let h = harness(true, script, vec![]);

    let listings = h.dispatcher.read_listings().await.expect("final attempt");
    assert!(listings.is_empty());
    assert_eq!(h.backend.calls(), failures + 1);
    let recorded = h.sleeper.recorded();
    assert!(recorded.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(recorded, delays);
}

#[rstest]
#[case(400)]
#[case(404)]
#[case(409)]
#[tokio::test]
async fn application_rejections_are_not_retried(
    auth_required: DispatchOptions,
    #[case] status: u16,
) {
    let h = harness(
        true,
        vec![Err(DataSourceError::rejected(status, "rejected"))],
        vec![],
    );
    signed_in(&h);

    let failure = h
        .dispatcher
        .execute(delete_review(), auth_required)
        .await
        .expect_err("rejected");
    assert_eq!(failure.kind(), ErrorKind::Server);
    assert_eq!(failure.status(), Some(status));
    assert_eq!(h.backend.calls(), 1);
    assert!(h.sleeper.recorded().is_empty());
    assert!(h.sessions.get().is_some(), "session survives non-auth errors");
}

#[rstest]
#[case(401)]
#[case(403)]
#[tokio::test]
async fn auth_rejections_clear_the_session(auth_required: DispatchOptions, #[case] status: u16) {
    let h = harness(
        true,
        vec![Err(DataSourceError::rejected(status, "token expired"))],
        vec![],
    );
    signed_in(&h);

    let failure = h
        .dispatcher
        .execute(delete_review(), auth_required)
        .await
        .expect_err("rejected");
    assert_eq!(failure.status(), Some(status));
    assert!(h.sessions.get().is_none());
}

#[tokio::test]
async fn bearer_is_attached_when_signed_in() {
    let h = harness(true, vec![Ok(OperationOutput::Listings(vec![]))], vec![]);
    let credential = signed_in(&h);
    h.dispatcher.read_listings().await.expect("listings");
    assert_eq!(h.backend.bearers(), vec![Some(credential)]);
}

#[tokio::test]
async fn backend_fault_falls_back_to_simulation_once() {
    let h = harness(
        true,
        vec![Err(DataSourceError::fault("undecodable body"))],
        vec![Ok(OperationOutput::Listings(vec![]))],
    );

    h.dispatcher.read_listings().await.expect("simulation answers");
    assert_eq!(h.backend.calls(), 1);
    assert_eq!(h.simulation.calls(), 1);
    assert_eq!(
        h.dispatcher.probe().cached(),
        Some(SourceDecision::Backend),
        "fallback must not flip the cached decision"
    );
}

#[tokio::test]
async fn absent_backend_routes_to_simulation() {
    let h = harness(
        false,
        vec![],
        vec![
            Ok(OperationOutput::Listings(vec![])),
            Ok(OperationOutput::Listings(vec![])),
        ],
    );

    h.dispatcher.read_listings().await.expect("first");
    h.dispatcher.read_listings().await.expect("second");
    assert_eq!(h.backend.calls(), 0);
    assert_eq!(h.simulation.calls(), 2);
    assert_eq!(h.transport.calls(), 1, "detection runs once and is cached");
}

#[tokio::test]
async fn authenticate_installs_session() {
    let credential = synthesize_unsigned_token(&TokenClaims {
        user_id: Some("a1".to_owned()),
        name: Some("Admin User".to_owned()),
        is_admin: true,
        ..TokenClaims::default()
    })
    .expect("encode");
    let h = harness(
        false,
        vec![],
        vec![Ok(OperationOutput::Authenticated(AuthGrant {
            credential,
            profile: SessionProfile::default(),
        }))],
    );

    let credentials =
        LoginCredentials::try_from_parts("admin@example.com", "AdminPass123").expect("creds");
    let session = h.dispatcher.authenticate(credentials).await.expect("signed in");
    assert_eq!(session.role(), Role::Admin);
    assert!(h.sessions.has_role(Role::Admin));
}

#[tokio::test]
async fn mismatched_output_is_a_server_failure() {
    let h = harness(false, vec![], vec![Ok(OperationOutput::Deleted)]);
    let failure = h
        .dispatcher
        .read_listing(ListingId::new("p1").expect("id"))
        .await
        .expect_err("wrong variant");
    assert_eq!(failure.kind(), ErrorKind::Server);
}

struct HangingSource;

#[async_trait]
impl DataSource for HangingSource {
    async fn execute(
        &self,
        _operation: &Operation,
        _bearer: Option<BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn timed_out_attempts_count_toward_the_budget() {
    let clock = Arc::new(MutableClock::new(Utc::now()));
    let transport = Arc::new(ScriptedTransport::new(vec![probe_result(true)]));
    let probe = Arc::new(BackendProbe::new(
        transport,
        Url::parse("http://127.0.0.1:5000/api/v1/places").expect("url"),
        Duration::from_millis(100),
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let dispatcher = RequestDispatcher::new(
        DispatcherPorts {
            backend: Arc::new(HangingSource),
            simulation: Arc::new(ScriptedSource::new(vec![])),
        },
        probe,
        Arc::new(SessionStore::new(
            Arc::new(MemorySlotStorage::default()),
            clock.clone(),
        )),
        clock,
        sleeper.clone(),
        DispatcherConfig {
            request_timeout: Duration::from_millis(10),
            ..DispatcherConfig::default()
        },
    );

    let failure = dispatcher
        .read_listings()
        .await
        .expect_err("every attempt times out");
    assert_eq!(failure.kind(), ErrorKind::Network);
    assert_eq!(sleeper.recorded().len(), 2);
}

#[tokio::test]
async fn mocked_source_sees_the_operation_verbatim() {
    let place_id = ListingId::new("p2").expect("id");
    let expected = place_id.clone();
    let mut backend = MockDataSource::new();
    backend
        .expect_execute()
        .withf(move |operation, bearer| {
            *operation
                == Operation::ReadReviewsForPlace {
                    place_id: expected.clone(),
                }
                && bearer.is_none()
        })
        .times(1)
        .returning(|_, _| Ok(OperationOutput::Reviews(vec![])));

    let clock = Arc::new(MutableClock::new(Utc::now()));
    let dispatcher = RequestDispatcher::new(
        DispatcherPorts {
            backend: Arc::new(backend),
            simulation: Arc::new(ScriptedSource::new(vec![])),
        },
        Arc::new(BackendProbe::new(
            Arc::new(ScriptedTransport::new(vec![probe_result(true)])),
            Url::parse("http://127.0.0.1:5000/api/v1/places").expect("url"),
            Duration::from_millis(100),
        )),
        Arc::new(SessionStore::new(
            Arc::new(MemorySlotStorage::default()),
            clock.clone(),
        )),
        clock,
        Arc::new(RecordingSleeper::default()),
        DispatcherConfig::default(),
    );

    let reviews = dispatcher
        .read_reviews_for_place(place_id)
        .await
        .expect("reviews");
    assert!(reviews.is_empty());
}

#[tokio::test]
async fn fallback_auth_rejection_keeps_the_backend_session() {
    let clock = Arc::new(MutableClock::new(Utc::now()));
    let sessions = Arc::new(SessionStore::new(
        Arc::new(MemorySlotStorage::default()),
        clock.clone(),
    ));
    let dispatcher = RequestDispatcher::new(
        DispatcherPorts {
            backend: Arc::new(ScriptedSource::new(vec![Err(DataSourceError::fault(
                "undecodable body",
            ))])),
            simulation: Arc::new(SimulationStore::new(clock.clone())),
        },
        Arc::new(BackendProbe::new(
            Arc::new(ScriptedTransport::new(vec![probe_result(true)])),
            Url::parse("http://127.0.0.1:5000/api/v1/places").expect("url"),
            Duration::from_millis(100),
        )),
        sessions.clone(),
        clock,
        Arc::new(RecordingSleeper::default()),
        DispatcherConfig::default(),
    );
    let credential = synthesize_unsigned_token(&TokenClaims {
        user_id: Some("backend-user-42".to_owned()),
        name: Some("Backend User".to_owned()),
        ..TokenClaims::default()
    })
    .expect("encode");
    sessions.set(Session::from_credential(credential, Utc::now()));

    let failure = dispatcher
        .create_review(ReviewDraft {
            place_id: ListingId::new("p1").expect("id"),
            text: "Quiet street and a friendly host.".to_owned(),
            rating: Rating::try_new(5).expect("rating"),
        })
        .await
        .expect_err("simulation does not know the subject");

    assert_eq!(failure.status(), Some(401));
    assert!(
        sessions.get().is_some(),
        "only the selected source may invalidate the session"
    );
}
