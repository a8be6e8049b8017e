use crate::db::{people, Upsert};
use crate::domain::profile::Relationship;
use crate::errors::ServerError;
use crate::loaders::{load_coordinators, COORDINATOR_HOST};
use crate::router::handle;
use crate::tests::utils::{body_string, context, fixture_clients, form_body, seed};
use astra::Body;
use http::{Method, Request};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn link(from: &str, to: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/sevis-user/relationships")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(form_body(&[("from_id", from), ("to_id", to), ("kind", COORDINATOR_HOST)]))
        .unwrap()
}

#[test]
fn dashboard_reports_dangling_relationships() {
    let clients = fixture_clients();
    seed(
        &clients,
        vec![Upsert::Relationship(Relationship {
            id: "rel-orphan".to_string(),
            from_id: "lc-1-profile".to_string(),
            to_id: "hf-gone-profile".to_string(),
            kind: COORDINATOR_HOST.to_string(),
            payload: None,
        })],
    );
    let ctx = context(clients);

    let mut resp = handle(get("/sevis-user"), &ctx).expect("Handler failed");
    assert_eq!(resp.status(), 200);
    let body = body_string(&mut resp);
    assert!(body.contains("1 relationship(s) point at a missing profile"));
    assert!(body.contains("<code>rel-orphan</code>"));
    assert!(!body.contains("Showing sample data"));
}

#[test]
fn clean_store_has_no_dangling_relationships() {
    let ctx = context(fixture_clients());
    let mut resp = handle(get("/sevis-user"), &ctx).unwrap();
    assert!(body_string(&mut resp).contains("Every relationship points at an existing profile."));
}

#[test]
fn linking_profiles_adds_a_host_family() {
    let clients = fixture_clients();
    let ctx = context(clients.clone());

    let resp = handle(link("lc-2-profile", "hf-1-profile"), &ctx).unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["Location"], "/sevis-user");

    let rows = load_coordinators(&clients).data;
    let lc2 = rows.iter().find(|r| r.user_id == "lc-2").unwrap();
    assert_eq!(lc2.host_families, 1);
    let dangling = clients
        .reader()
        .unwrap()
        .with_conn(|c| people::dangling_relationships(c))
        .unwrap();
    assert!(dangling.is_empty());
}

#[test]
fn linking_to_a_missing_profile_is_refused() {
    let ctx = context(fixture_clients());
    let err = handle(link("lc-2-profile", "hf-404-profile"), &ctx).unwrap_err();
    assert!(matches!(err, ServerError::NotFound));
}
