use crate::db::StoreClients;
use crate::errors::ServerError;
use crate::responses::html_error_response;
use crate::router::handle;
use crate::tests::utils::{body_string, context};
use astra::Body;
use http::{Method, Request};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[test]
fn pages_render_sample_data_without_a_store() {
    let ctx = context(StoreClients::default());
    for uri in ["/sevis-user", "/sevis-user/change-queue", "/sevis-user/local-coordinators"] {
        let mut resp = handle(get(uri), &ctx).expect("Handler failed");
        assert_eq!(resp.status(), 200, "{uri}");
        assert!(body_string(&mut resp).contains("Showing sample data"), "{uri}");
    }
}

#[test]
fn fallback_pages_are_identical_between_requests() {
    let ctx = context(StoreClients::default());
    let mut a = handle(get("/sevis-user/change-queue"), &ctx).unwrap();
    let mut b = handle(get("/sevis-user/change-queue"), &ctx).unwrap();
    assert_eq!(body_string(&mut a), body_string(&mut b));
}

#[test]
fn batches_page_is_empty_without_a_store() {
    let ctx = context(StoreClients::default());
    let mut resp = handle(get("/sevis-user/sevis-batches"), &ctx).unwrap();
    assert!(body_string(&mut resp).contains("No SEVIS batches yet."));
}

#[test]
fn writes_need_the_admin_client() {
    let ctx = context(StoreClients::default());
    let req = Request::builder()
        .method(Method::POST)
        .uri("/sevis-user/sevis-batches")
        .body(Body::empty())
        .unwrap();
    let err = handle(req, &ctx).unwrap_err();
    assert!(matches!(err, ServerError::Unauthorized(_)));
    assert_eq!(html_error_response(err).status(), 401);
}

#[test]
fn root_redirects_and_unknown_paths_404() {
    let ctx = context(StoreClients::default());

    let resp = handle(get("/"), &ctx).unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["Location"], "/sevis-user");

    let err = handle(get("/nope"), &ctx).unwrap_err();
    let mut resp = html_error_response(err);
    assert_eq!(resp.status(), 404);
    assert!(body_string(&mut resp).contains("Error 404"));
}
