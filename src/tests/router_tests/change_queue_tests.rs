use crate::db::StoreClients;
use crate::domain::change::{ItemStatus, RequestStatus};
use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::utils::{body_string, context, fixture_clients, form_body, load_request};
use astra::Body;
use http::{Method, Request};
use scraper::{Html, Selector};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, form: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(form_body(form))
        .unwrap()
}

fn request_ids(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("tr.change-request").unwrap();
    doc.select(&sel)
        .filter_map(|tr| tr.value().attr("data-request").map(str::to_string))
        .collect()
}

#[test]
fn queue_lists_newest_first() {
    let ctx = context(fixture_clients());
    let mut resp = handle(get("/sevis-user/change-queue"), &ctx).expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_string(&mut resp);
    assert_eq!(request_ids(&body), vec!["cr-1", "cr-2", "cr-3"]);
    assert!(!body.contains("Showing sample data"));
}

#[test]
fn queue_filters_and_searches() {
    let ctx = context(fixture_clients());

    let mut resp = handle(get("/sevis-user/change-queue?status=pending"), &ctx).unwrap();
    assert_eq!(request_ids(&body_string(&mut resp)), vec!["cr-1"]);

    let mut resp = handle(get("/sevis-user/change-queue?record_type=host_family"), &ctx).unwrap();
    assert_eq!(request_ids(&body_string(&mut resp)), vec!["cr-3"]);

    let mut resp = handle(get("/sevis-user/change-queue?q=SCHOOL"), &ctx).unwrap();
    assert_eq!(request_ids(&body_string(&mut resp)), vec!["cr-2"]);

    let mut resp = handle(get("/sevis-user/change-queue?sort=oldest"), &ctx).unwrap();
    assert_eq!(request_ids(&body_string(&mut resp)), vec!["cr-3", "cr-2", "cr-1"]);
}

#[test]
fn approving_one_item_makes_request_partially_approved() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    let resp = handle(
        post(
            "/sevis-user/change-queue/cr-1/approve",
            &[("items", "cr-1-a"), ("approver", "Kim")],
        ),
        &ctx,
    )
    .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["Location"], "/sevis-user/change-queue");

    let req = load_request(&clients, "cr-1");
    assert_eq!(req.status, RequestStatus::PartiallyApproved);
    assert_eq!(req.items[0].status, ItemStatus::Approved);
    assert_eq!(req.items[0].approved_by.as_deref(), Some("Kim"));
    assert_eq!(req.items[1].status, ItemStatus::Pending);
}

#[test]
fn approve_without_items_takes_every_pending_item() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    handle(post("/sevis-user/change-queue/cr-1/approve", &[("approver", "Kim")]), &ctx).unwrap();

    assert_eq!(load_request(&clients, "cr-1").status, RequestStatus::FullyApproved);
}

#[test]
fn reject_needs_a_reason() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    let err = handle(
        post(
            "/sevis-user/change-queue/cr-1/reject",
            &[("items", "cr-1-b"), ("approver", "Kim"), ("reason", "  ")],
        ),
        &ctx,
    )
    .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)), "{err:?}");
    assert_eq!(load_request(&clients, "cr-1").status, RequestStatus::Pending);
}

#[test]
fn reject_whole_request() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    handle(
        post(
            "/sevis-user/change-queue/cr-1/reject",
            &[("approver", "Kim"), ("reason", "duplicate submission")],
        ),
        &ctx,
    )
    .unwrap();

    let req = load_request(&clients, "cr-1");
    assert_eq!(req.status, RequestStatus::Rejected);
    assert!(req
        .items
        .iter()
        .all(|i| i.rejection_reason.as_deref() == Some("duplicate submission")));
}

#[test]
fn decided_items_cannot_be_decided_again() {
    let ctx = context(fixture_clients());
    let err = handle(
        post(
            "/sevis-user/change-queue/cr-2/approve",
            &[("items", "cr-2-a"), ("approver", "Kim")],
        ),
        &ctx,
    )
    .unwrap_err();
    assert!(matches!(err, ServerError::Conflict(_)), "{err:?}");
}

#[test]
fn cancel_only_open_requests() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    handle(post("/sevis-user/change-queue/cr-1/cancel", &[]), &ctx).unwrap();
    assert_eq!(load_request(&clients, "cr-1").status, RequestStatus::Cancelled);

    let err = handle(post("/sevis-user/change-queue/cr-2/cancel", &[]), &ctx).unwrap_err();
    assert!(matches!(err, ServerError::Conflict(_)));

    // cancelled requests accept no more decisions
    let err = handle(
        post("/sevis-user/change-queue/cr-1/approve", &[("approver", "Kim")]),
        &ctx,
    )
    .unwrap_err();
    assert!(matches!(err, ServerError::Conflict(_)));
}

#[test]
fn unknown_request_is_not_found() {
    let ctx = context(fixture_clients());
    let err = handle(
        post("/sevis-user/change-queue/cr-404/approve", &[("approver", "Kim")]),
        &ctx,
    )
    .unwrap_err();
    assert!(matches!(err, ServerError::NotFound));
}

#[test]
fn comments_are_stored_and_shown() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    let resp = handle(
        post(
            "/sevis-user/change-queue/items/cr-1-b/comments",
            &[("author", "Kim"), ("body", "Called the family to confirm"), ("internal", "1")],
        ),
        &ctx,
    )
    .unwrap();
    assert_eq!(resp.status(), 303);

    let req = load_request(&clients, "cr-1");
    let comments = &req.items[1].comments;
    assert_eq!(comments.len(), 1);
    assert!(comments[0].is_internal);

    let mut page = handle(get("/sevis-user/change-queue"), &ctx).unwrap();
    assert!(body_string(&mut page).contains("Called the family to confirm"));
}

#[test]
fn read_only_store_rejects_writes() {
    let clients = fixture_clients();
    let ro = StoreClients::read_only(clients.db.clone().unwrap());
    let ctx = context(ro);

    let err = handle(
        post("/sevis-user/change-queue/cr-1/approve", &[("approver", "Kim")]),
        &ctx,
    )
    .unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(_)));
    assert_eq!(load_request(&clients, "cr-1").status, RequestStatus::Pending);

    // and the page hides the forms
    let mut page = handle(get("/sevis-user/change-queue"), &ctx).unwrap();
    assert!(!body_string(&mut page).contains("Approve selected"));
}

#[test]
fn export_returns_a_workbook() {
    let ctx = context(fixture_clients());
    let mut resp = handle(get("/sevis-user/change-queue/export?status=pending"), &ctx).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["Content-Type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut resp.body_mut().reader(), &mut bytes).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn undecodable_rows_are_skipped_not_replaced_with_sample_data() {
    let clients = fixture_clients();
    clients
        .admin
        .as_ref()
        .unwrap()
        .with_tx(|tx| {
            tx.execute_batch(
                "insert into change_requests (id, record_type, record_id, requested_by, request_date, status, priority)
                 values ('cr-bad', 'student', 'stu-1', 'import', '2024-03-02T00:00:00Z', 'approved', 'normal');
                 insert into change_items (id, request_id, position, field_path, change_type, status)
                 values ('cr-1-z', 'cr-1', 9, 'data.school', 'mutate', 'pending');",
            )?;
            Ok::<_, ServerError>(())
        })
        .unwrap();
    let ctx = context(clients);

    let mut resp = handle(get("/sevis-user/change-queue"), &ctx).unwrap();
    let body = body_string(&mut resp);
    assert!(!body.contains("Showing sample data"));
    assert_eq!(request_ids(&body), vec!["cr-1", "cr-2", "cr-3"]);
    assert!(!body.contains("cr-1-z"));

    let resp = handle(get("/sevis-user/student-application/stu-1"), &ctx).unwrap();
    assert_eq!(resp.status(), 200);
}
