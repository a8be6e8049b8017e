use crate::domain::field_path::EMPTY_VALUE;
use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::utils::{body_string, context, fixture_clients};
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

#[test]
fn diff_shows_current_value_at_each_field_path() {
    let ctx = context(fixture_clients());
    let mut resp = handle(get("/sevis-user/student-application/stu-1"), &ctx).expect("Handler failed");
    assert_eq!(resp.status(), 200);

    let body = body_string(&mut resp);
    let doc = Html::parse_document(&body);
    let row = Selector::parse("tr.diff-row").unwrap();
    let current = Selector::parse("td.current").unwrap();

    let rows: Vec<_> = doc.select(&row).collect();
    // cr-1 has two items, cr-2 one; cr-3 belongs to the host family
    assert_eq!(rows.len(), 3);

    let currents: Vec<String> = rows
        .iter()
        .map(|r| r.select(&current).next().unwrap().text().collect::<String>())
        .collect();
    assert_eq!(currents[0], "1 Old Rd, Madison, WI 53703");
    // no phone on record
    assert_eq!(currents[1], EMPTY_VALUE);
    assert_eq!(currents[2], "Madison East");

    assert!(body.contains("hf-1-profile"));
}

#[test]
fn non_students_are_not_found() {
    let ctx = context(fixture_clients());
    for id in ["hf-1", "nobody"] {
        let err = handle(get(&format!("/sevis-user/student-application/{id}")), &ctx).unwrap_err();
        assert!(matches!(err, ServerError::NotFound));
    }
}
