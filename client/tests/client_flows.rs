//! End-to-end flows through [`ListingsClient`] with scripted HTTP traffic.
//!
//! Each test scripts the health-check response first, then the responses for the
//! calls under test.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use listings_client::ClientSettings;
use listings_client::domain::ports::{HttpMethod, SlotStorage, TransportError, TransportResponse};
use listings_client::domain::{
    ErrorKind, ListingFilter, RetrySleeper, ReviewId, Role, SourceDecision,
};
use listings_client::inbound::{ClientPorts, ListingsClient};
use listings_client::outbound::simulation::{DEMO_EMAIL, DEMO_PASSWORD};
use listings_client::outbound::storage::MemorySlotStorage;
use listings_client::test_support::storage::TempSlotDir;
use listings_client::test_support::{
    ImmediateSleeper, MutableClock, RecordingSleeper, ScriptedTransport, json_response,
};
use rstest::rstest;
use serde_json::json;

fn client_over(
    transport: Arc<ScriptedTransport>,
    storage: Arc<dyn SlotStorage>,
    sleeper: Arc<dyn RetrySleeper>,
) -> ListingsClient {
    let ports = ClientPorts {
        transport,
        storage,
        clock: Arc::new(MutableClock::new(Utc::now())),
        sleeper,
    };
    ListingsClient::with_ports(ports, &ClientSettings::default()).expect("client should build")
}

fn places_body() -> serde_json::Value {
    json!({
        "places": [
            {"id": 11, "name": "Harbour loft", "price_per_night": "95", "amenities": ["WiFi"]},
            {"id": "12", "title": "Forest cabin", "pricePerNight": 180},
            {"id": "13", "title": "No price"}
        ]
    })
}

#[rstest]
#[tokio::test]
async fn backend_listings_are_decoded_and_cached() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(json_response(200, json!([]))),
        Ok(json_response(200, places_body())),
    ]));
    let client = client_over(
        transport.clone(),
        Arc::new(MemorySlotStorage::default()),
        Arc::new(ImmediateSleeper),
    );

    assert_eq!(client.init().await, SourceDecision::Backend);
    let listings = client
        .listings(&ListingFilter::any().with_max_price(100.0))
        .await
        .expect("listings");

    let titles: Vec<&str> = listings.iter().map(|l| l.title()).collect();
    assert_eq!(titles, vec!["Harbour loft"]);
    assert_eq!(client.cached_listings(&ListingFilter::any()).len(), 2);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].method, HttpMethod::Get);
    assert_eq!(requests[1].url.path(), "/api/v1/places");
    assert!(requests[1].bearer.is_none());
}

#[rstest]
#[tokio::test]
async fn malformed_backend_body_is_served_from_the_simulation() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(json_response(200, json!([]))),
        Ok(TransportResponse {
            status: 200,
            status_text: "OK".to_owned(),
            body: b"<html>maintenance</html>".to_vec(),
        }),
    ]));
    let client = client_over(
        transport.clone(),
        Arc::new(MemorySlotStorage::default()),
        Arc::new(ImmediateSleeper),
    );

    let listings = client
        .listings(&ListingFilter::any())
        .await
        .expect("simulation fallback");
    assert_eq!(listings.len(), 4);
    assert_eq!(transport.calls(), 2);
}

#[rstest]
#[tokio::test]
async fn unreachable_backend_exhausts_retries_with_backoff() {
    // Health check succeeds, then the script runs dry and every call is refused.
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(json_response(
        200,
        json!([]),
    ))]));
    let sleeper = Arc::new(RecordingSleeper::default());
    let client = client_over(
        transport.clone(),
        Arc::new(MemorySlotStorage::default()),
        sleeper.clone(),
    );

    let failure = client
        .listings(&ListingFilter::any())
        .await
        .expect_err("network failure");
    assert_eq!(failure.kind(), ErrorKind::Network);
    assert!(!failure.is_retryable());
    assert_eq!(transport.calls(), 4);
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert!(client.cached_listings(&ListingFilter::any()).is_empty());
}

#[rstest]
#[tokio::test]
async fn rejected_credential_clears_the_session() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(json_response(200, json!([]))),
        Ok(json_response(
            200,
            json!({
                "access_token": "opaque-token",
                "user": {"id": 7, "first_name": "Ada", "last_name": "Lovelace"}
            }),
        )),
        Ok(json_response(401, json!({"error": "Token expired"}))),
    ]));
    let client = client_over(
        transport.clone(),
        Arc::new(MemorySlotStorage::default()),
        Arc::new(ImmediateSleeper),
    );

    let session = client
        .login("ada@example.com", "analytical")
        .await
        .expect("login");
    assert_eq!(session.display_name(), Some("Ada Lovelace"));
    assert!(client.has_role(Role::User));

    let failure = client
        .delete_review(ReviewId::new("r1").expect("id"))
        .await
        .expect_err("credential rejected");
    assert_eq!(failure.kind(), ErrorKind::Server);
    assert_eq!(failure.status(), Some(401));
    assert_eq!(failure.message(), "Token expired");
    assert!(client.session().is_none());

    let delete = &transport.requests()[2];
    assert_eq!(delete.method, HttpMethod::Delete);
    assert_eq!(delete.url.path(), "/api/v1/reviews/r1");
    assert_eq!(
        delete.bearer.as_ref().map(|bearer| bearer.as_str()),
        Some("opaque-token")
    );
}

#[rstest]
#[tokio::test]
async fn session_and_cache_survive_a_restart() {
    let dir = TempSlotDir::new().expect("temp dir");

    let first = client_over(
        Arc::new(ScriptedTransport::new(vec![])),
        Arc::new(dir.open().expect("storage")),
        Arc::new(ImmediateSleeper),
    );
    first
        .login(DEMO_EMAIL, DEMO_PASSWORD)
        .await
        .expect("demo login");
    first
        .listings(&ListingFilter::any())
        .await
        .expect("listings");
    drop(first);

    let second = client_over(
        Arc::new(ScriptedTransport::new(vec![])),
        Arc::new(dir.open().expect("storage")),
        Arc::new(ImmediateSleeper),
    );
    let session = second.session().expect("restored session");
    assert_eq!(session.display_name(), Some("Demo User"));
    assert_eq!(second.cached_listings(&ListingFilter::any()).len(), 4);

    second.logout();
    let third = client_over(
        Arc::new(ScriptedTransport::new(vec![])),
        Arc::new(dir.open().expect("storage")),
        Arc::new(ImmediateSleeper),
    );
    assert!(third.session().is_none());
}

#[rstest]
#[tokio::test]
async fn redetection_switches_sources() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Err(TransportError::connect("refused")),
        Ok(json_response(404, json!({"error": "Not Found"}))),
    ]));
    let client = client_over(
        transport,
        Arc::new(MemorySlotStorage::default()),
        Arc::new(ImmediateSleeper),
    );

    assert_eq!(client.init().await, SourceDecision::Simulation);
    assert_eq!(client.init().await, SourceDecision::Simulation);
    assert_eq!(client.redetect_backend().await, SourceDecision::Backend);
}
