use crate::db::{sevis, StoreClients};
use crate::domain::sevis::{BatchStatus, ParticipantResult, SevisBatch, SevisBatchParticipant};
use crate::errors::ServerError;
use crate::router::{handle, AppContext};
use crate::tests::utils::{body_string, context, fixture_clients, load_request, FakeGateway};
use astra::Body;
use http::{Method, Request};

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from("name=March+updates"))
        .unwrap()
}

fn stored(clients: &StoreClients) -> (Vec<SevisBatch>, Vec<SevisBatchParticipant>) {
    clients
        .reader()
        .unwrap()
        .with_conn(|c| Ok((sevis::load_batches(c)?, sevis::load_participants(c)?)))
        .unwrap()
}

fn with_gateway(clients: StoreClients, gateway: FakeGateway) -> AppContext {
    AppContext {
        gateway: Some(Box::new(gateway)),
        ..context(clients)
    }
}

#[test]
fn creating_a_batch_claims_ready_items_once() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    let resp = handle(post("/sevis-user/sevis-batches"), &ctx).expect("Handler failed");
    assert_eq!(resp.status(), 303);

    let (batches, participants) = stored(&clients);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].name, "March updates");
    assert_eq!(batches[0].status, BatchStatus::Draft);
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].item_id, "cr-2-a");
    assert_eq!(participants[0].student_id, "stu-1");

    let claimed = load_request(&clients, "cr-2");
    assert_eq!(claimed.items[0].sevis_batch_id.as_deref(), Some(batches[0].id.as_str()));

    // nothing left to claim
    let err = handle(post("/sevis-user/sevis-batches"), &ctx).unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn submitting_records_results_per_participant() {
    let clients = fixture_clients();
    handle(post("/sevis-user/sevis-batches"), &context(clients.clone())).unwrap();
    let (batches, _) = stored(&clients);
    let id = batches[0].id.clone();

    let ctx = with_gateway(clients.clone(), FakeGateway::default());
    let resp = handle(post(&format!("/sevis-user/sevis-batches/{id}/submit")), &ctx).unwrap();
    assert_eq!(resp.status(), 303);

    let (batches, participants) = stored(&clients);
    assert_eq!(batches[0].status, BatchStatus::Completed);
    assert_eq!(batches[0].successful_records, 1);
    assert_eq!(batches[0].failed_records, 0);
    assert!(batches[0].submitted_at.is_some());
    assert_eq!(participants[0].result, ParticipantResult::Success);

    // a completed batch is not sent twice
    let err = handle(post(&format!("/sevis-user/sevis-batches/{id}/submit")), &ctx).unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn participants_missing_from_the_response_are_failed() {
    let clients = fixture_clients();
    handle(post("/sevis-user/sevis-batches"), &context(clients.clone())).unwrap();
    let id = stored(&clients).0[0].id.clone();

    let gateway = FakeGateway {
        silent: true,
        ..Default::default()
    };
    handle(post(&format!("/sevis-user/sevis-batches/{id}/submit")), &with_gateway(clients.clone(), gateway)).unwrap();

    let (batches, participants) = stored(&clients);
    assert_eq!(batches[0].failed_records, 1);
    assert_eq!(participants[0].result, ParticipantResult::Failed);
    assert!(participants[0].message.is_some());
}

#[test]
fn gateway_outage_marks_batch_failed() {
    let clients = fixture_clients();
    handle(post("/sevis-user/sevis-batches"), &context(clients.clone())).unwrap();
    let id = stored(&clients).0[0].id.clone();

    let gateway = FakeGateway {
        down: true,
        ..Default::default()
    };
    let err = handle(post(&format!("/sevis-user/sevis-batches/{id}/submit")), &with_gateway(clients.clone(), gateway))
        .unwrap_err();
    assert!(matches!(err, ServerError::Unavailable(_)));
    assert_eq!(stored(&clients).0[0].status, BatchStatus::Failed);
}

#[test]
fn submit_without_gateway_is_unavailable() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());
    handle(post("/sevis-user/sevis-batches"), &ctx).unwrap();
    let id = stored(&clients).0[0].id.clone();

    let err = handle(post(&format!("/sevis-user/sevis-batches/{id}/submit")), &ctx).unwrap_err();
    assert!(matches!(err, ServerError::Unavailable(_)));
    assert_eq!(stored(&clients).0[0].status, BatchStatus::Draft);
}

#[test]
fn batches_page_shows_counts_from_participants() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());
    handle(post("/sevis-user/sevis-batches"), &ctx).unwrap();

    let req = Request::builder()
        .method(Method::GET)
        .uri("/sevis-user/sevis-batches")
        .body(Body::empty())
        .unwrap();
    let mut resp = handle(req, &ctx).unwrap();
    let body = body_string(&mut resp);
    assert!(body.contains("March updates"));
    assert!(body.contains("Submit to SEVIS"));
    assert!(body.contains(r#"<span class="pending">1</span>"#));
}

#[test]
fn export_unknown_batch_is_not_found() {
    let ctx = context(fixture_clients());
    let req = Request::builder()
        .method(Method::GET)
        .uri("/sevis-user/sevis-batches/sb-missing/export")
        .body(Body::empty())
        .unwrap();
    assert!(matches!(handle(req, &ctx), Err(ServerError::NotFound)));
}
