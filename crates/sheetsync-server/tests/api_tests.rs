use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};
use sheetsync_core::ServiceConfig;
use sheetsync_server::{in_memory_service, routes};
use sheetsync_test_utils::TestContext;
use warp::http::{Response, StatusCode};
use warp::hyper::body::Bytes;
use warp::test::RequestBuilder;

fn request(ctx: &TestContext, method: &str, path: &str) -> RequestBuilder {
    warp::test::request()
        .method(method)
        .path(path)
        .header("authorization", format!("Bearer {}", ctx.license.key))
}

fn body(response: &Response<Bytes>) -> JsonValue {
    serde_json::from_slice(response.body()).unwrap()
}

fn detail(response: &Response<Bytes>) -> String {
    body(response)["detail"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_license_request_and_activation() {
    let api = routes(in_memory_service(ServiceConfig::new()));

    let created = warp::test::request()
        .method("POST")
        .path("/send-license-key")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("email=dev%40example.com&domains=example.com,%20*.example.org")
        .reply(&api)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body(&created);
    let key = created["key"].as_str().unwrap().to_string();
    let id = created["id"].as_str().unwrap().to_string();

    let duplicate = warp::test::request()
        .method("POST")
        .path("/send-license-key")
        .json(&json!({ "email": "dev@example.com" }))
        .reply(&api)
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(&duplicate), "License key already created for 'dev@example.com'.");

    let list = |origin: &'static str| {
        warp::test::request()
            .path("/api/v1/workbooks")
            .header("authorization", format!("Bearer {key}"))
            .header("origin", origin)
    };

    let before = list("https://example.com").reply(&api).await;
    assert_eq!(before.status(), StatusCode::FORBIDDEN);
    assert_eq!(detail(&before), "License key is not valid");

    let activated = warp::test::request()
        .path(&format!("/activate-license-key/{id}"))
        .reply(&api)
        .await;
    assert_eq!(activated.status(), StatusCode::OK);
    assert_eq!(body(&activated), json!({ "key": key }));

    let exact = list("https://example.com").reply(&api).await;
    assert_eq!(exact.status(), StatusCode::OK);
    assert_eq!(body(&exact), json!({ "workbooks": [] }));

    let wildcard = list("http://app.example.org:3000").reply(&api).await;
    assert_eq!(wildcard.status(), StatusCode::OK);

    let foreign = list("https://evil.test").reply(&api).await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_email_is_rejected() {
    let api = routes(in_memory_service(ServiceConfig::new()));
    let response = warp::test::request()
        .method("POST")
        .path("/send-license-key")
        .json(&json!({ "domains": "example.com" }))
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(&response), "You must specify the 'email' field.");
}

#[tokio::test]
async fn test_cell_edits_over_http() {
    let ctx = TestContext::default();
    let api = routes(ctx.service.clone());

    let created = request(&ctx, "POST", "/api/v1/workbooks")
        .json(&json!({}))
        .reply(&api)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body(&created);
    assert_eq!(created["name"], "Book");
    assert_eq!(created["revision"], 1);
    let id = created["id"].as_str().unwrap().to_string();

    for (path, input) in [("1/1", "2"), ("2/1", "7"), ("1/2", "=A1*A2*3")] {
        let response = request(&ctx, "PUT", &format!("/api/v1/workbooks/{id}/sheets/1/cells/{path}"))
            .json(&json!({ "input": input }))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    let cell = request(&ctx, "GET", &format!("/api/v1/workbooks/{id}/sheets/1/cells/1/2"))
        .reply(&api)
        .await;
    assert_eq!(
        body(&cell),
        json!({
            "formatted_value": "42",
            "value": 42,
            "format": "general",
            "type": "number",
            "formula": "=A1*A2*3",
        })
    );

    let detail_response = request(&ctx, "GET", &format!("/api/v1/workbooks/{id}")).reply(&api).await;
    let workbook = body(&detail_response);
    assert_eq!(workbook["revision"], 4);
    assert!(workbook["workbook_json"].is_object());
}

#[tokio::test]
async fn test_sheet_lifecycle_over_http() {
    let ctx = TestContext::default();
    let api = routes(ctx.service.clone());
    let id = ctx.blank_workbook().await.id;
    let sheets = format!("/api/v1/workbooks/{id}/sheets");

    let added = request(&ctx, "POST", &sheets).json(&json!({})).reply(&api).await;
    assert_eq!(added.status(), StatusCode::CREATED);
    assert_eq!(body(&added)["name"], "Sheet2");
    let sheet_id = body(&added)["id"].as_u64().unwrap();

    let renamed = request(&ctx, "PUT", &format!("{sheets}/{sheet_id}"))
        .json(&json!({ "new_name": "Totals" }))
        .reply(&api)
        .await;
    assert_eq!(renamed.status(), StatusCode::OK);
    assert_eq!(body(&renamed)["name"], "Totals");

    let clash = request(&ctx, "PUT", &format!("{sheets}/1"))
        .json(&json!({ "new_name": "Totals" }))
        .reply(&api)
        .await;
    assert_eq!(clash.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(&clash), "Sheet already exists: 'Totals'");

    let missing_name = request(&ctx, "PUT", &format!("{sheets}/1"))
        .json(&json!({}))
        .reply(&api)
        .await;
    assert_eq!(detail(&missing_name), "'new_name' parameter is not provided");

    let deleted = request(&ctx, "DELETE", &format!("{sheets}/{sheet_id}")).reply(&api).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert!(deleted.body().is_empty());

    let last = request(&ctx, "DELETE", &format!("{sheets}/1")).reply(&api).await;
    assert_eq!(last.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(&last), "Cannot delete only sheet");

    let listed = request(&ctx, "GET", &sheets).reply(&api).await;
    assert_eq!(
        body(&listed),
        json!({ "sheets": [{ "id": 1, "name": "Sheet1", "index": 0 }] })
    );
}

#[tokio::test]
async fn test_error_statuses() {
    let ctx = TestContext::default();
    let api = routes(ctx.service.clone());
    let id = ctx.blank_workbook().await.id;

    let anonymous = warp::test::request()
        .path("/api/v1/workbooks")
        .reply(&api)
        .await;
    assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);
    assert_eq!(detail(&anonymous), "Authentication credentials were not provided.");

    let bad_id = request(&ctx, "GET", "/api/v1/workbooks/not-a-uuid").reply(&api).await;
    assert_eq!(bad_id.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(&bad_id), "Workbook not found");

    let bad_id_anonymous = warp::test::request()
        .path("/api/v1/workbooks/not-a-uuid")
        .reply(&api)
        .await;
    assert_eq!(bad_id_anonymous.status(), StatusCode::FORBIDDEN);

    let both = request(&ctx, "PUT", &format!("/api/v1/workbooks/{id}/sheets/1/cells/1/1"))
        .json(&json!({ "input": "1", "value": 1 }))
        .reply(&api)
        .await;
    assert_eq!(both.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        detail(&both),
        "Either 'input' or 'value' parameter needs to be provided, but not both"
    );

    let no_route = request(&ctx, "GET", "/api/v1/nothing").reply(&api).await;
    assert_eq!(no_route.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(&no_route), "Not found.");

    let wrong_method = request(&ctx, "PATCH", "/api/v1/workbooks").reply(&api).await;
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);

    let malformed = request(&ctx, "POST", &format!("/api/v1/workbooks/{id}/simulate"))
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&api)
        .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert!(detail(&malformed).starts_with("JSON parse error"));

    assert_eq!(ctx.store.leases(), 0);
}

#[tokio::test]
async fn test_simulate_over_http() {
    let ctx = TestContext::default();
    let api = routes(ctx.service.clone());
    let doc = ctx.seeded().await;

    let response = request(&ctx, "POST", &format!("/api/v1/workbooks/{}/simulate", doc.id))
        .header("content-type", "application/json")
        .body(r#"{"inputs": {"Sheet1": {"A1": 10}}, "outputs": {"Sheet1": ["B1", "A1:B2"]}}"#)
        .reply(&api)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        std::str::from_utf8(response.body()).unwrap(),
        r#"{"Sheet1":{"B1":210,"A1:B2":[[10,210],[7,null]]}}"#
    );

    let bad_ref = request(&ctx, "POST", &format!("/api/v1/workbooks/{}/simulate", doc.id))
        .json(&json!({ "outputs": { "Sheet1": ["A1:"] } }))
        .reply(&api)
        .await;
    assert_eq!(bad_ref.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(&bad_ref), "\"A1:\" reference cannot be parsed");

    let reversed = request(&ctx, "POST", &format!("/api/v1/workbooks/{}/simulate", doc.id))
        .json(&json!({ "outputs": { "Sheet1": ["B2:A1"] } }))
        .reply(&api)
        .await;
    assert_eq!(reversed.status(), StatusCode::OK);
    assert_eq!(
        std::str::from_utf8(reversed.body()).unwrap(),
        r#"{"Sheet1":{"B2:A1":[[2,42],[7,null]]}}"#
    );

    let deep = format!("={}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let too_long = request(&ctx, "POST", &format!("/api/v1/workbooks/{}/simulate", doc.id))
        .json(&json!({ "inputs": { "Sheet1": { "A1": deep } } }))
        .reply(&api)
        .await;
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(&too_long), "Workbook input too large");

    let nested = request(&ctx, "POST", &format!("/api/v1/workbooks/{}/simulate", doc.id))
        .json(&json!({ "inputs": { "Sheet1": { "A1": format!("={}1", "-".repeat(300)) } }, "outputs": { "Sheet1": ["A1"] } }))
        .reply(&api)
        .await;
    assert_eq!(nested.status(), StatusCode::OK);
    assert_eq!(
        std::str::from_utf8(nested.body()).unwrap(),
        r##"{"Sheet1":{"A1":"#ERROR!"}}"##
    );
    assert_eq!(ctx.store.commits(), 0);
}

#[tokio::test]
async fn test_save_snapshot_over_http() {
    let ctx = TestContext::default();
    let api = routes(ctx.service.clone());
    let blank = ctx.blank_workbook().await;
    let seeded = ctx.seeded().await;
    let snapshot = request(&ctx, "GET", &format!("/api/v1/workbooks/{}", seeded.id))
        .reply(&api)
        .await;
    let workbook_json = body(&snapshot)["workbook_json"].clone();

    let saved = request(&ctx, "PUT", &format!("/api/v1/workbooks/{}", blank.id))
        .json(&json!({ "workbook_json": workbook_json }))
        .reply(&api)
        .await;
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(body(&saved), json!({ "revision": 2 }));

    let garbage = request(&ctx, "PUT", &format!("/api/v1/workbooks/{}", blank.id))
        .json(&json!({ "workbook_json": "{oops" }))
        .reply(&api)
        .await;
    assert_eq!(detail(&garbage), "Could not parse workbook JSON");
}

#[tokio::test(start_paused = true)]
async fn test_long_poll_over_http() {
    let ctx = TestContext::new(
        ServiceConfig::new()
            .with_wait_attempts(3)
            .with_wait_interval(Duration::from_millis(100)),
    );
    let api = routes(ctx.service.clone());
    let doc = ctx.seeded().await;

    let current = request(&ctx, "GET", &format!("/get-updated-workbook/{}/0", doc.id))
        .reply(&api)
        .await;
    assert_eq!(current.status(), StatusCode::OK);
    assert_eq!(body(&current)["revision"], 1);
    assert!(body(&current)["workbook_json"].is_object());

    let unchanged = request(&ctx, "GET", &format!("/get-updated-workbook/{}/1", doc.id))
        .reply(&api)
        .await;
    assert_eq!(unchanged.status(), StatusCode::NO_CONTENT);
    assert!(unchanged.body().is_empty());

    let ahead = request(&ctx, "GET", &format!("/get-updated-workbook/{}/9", doc.id))
        .reply(&api)
        .await;
    assert_eq!(ahead.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_echoes_origin() {
    let ctx = TestContext::default();
    let api = routes(ctx.service.clone());

    let preflight = warp::test::request()
        .method("OPTIONS")
        .path("/api/v1/workbooks")
        .header("origin", "https://app.example.com")
        .reply(&api)
        .await;
    assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        preflight.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );

    let listed = request(&ctx, "GET", "/api/v1/workbooks")
        .header("origin", "https://app.example.com")
        .reply(&api)
        .await;
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(listed.headers()["access-control-allow-credentials"], "true");

    let failed = warp::test::request()
        .path("/api/v1/workbooks")
        .header("origin", "https://app.example.com")
        .reply(&api)
        .await;
    assert_eq!(failed.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        failed.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );
}
