//! Integration tests for the `/api/v1/courses` resource.

mod common;

use axum::http::StatusCode;
use common::{body_json, course_json, get, post_json, put_json};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EDITION: &str = "/api/v1/courses/CS101/editions/2024";

async fn seeded(pool: SqlitePool) -> axum::Router {
    let app = common::build_test_app(pool);
    let response = post_json(app.clone(), "/api/v1/courses", course_json()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    app
}

fn child_ids(node: &Value) -> Vec<String> {
    node["children"]
        .as_array()
        .map(|c| c.iter().map(|n| n["id"].as_str().unwrap_or_default().to_string()).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn import_then_list_and_load(pool: SqlitePool) {
    let app = common::build_test_app(pool);

    let response = post_json(app.clone(), "/api/v1/courses", course_json()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = body_json(response).await;
    assert_eq!(stored["data"]["id"], "CS101");
    assert_eq!(child_ids(&stored["data"]), ["2024"]);

    let list = body_json(get(app.clone(), "/api/v1/courses").await).await;
    assert_eq!(
        list["data"],
        json!([{ "id": "CS101", "name": "Introduction to Programming", "editions": ["2024"] }])
    );

    let edition = body_json(get(app, EDITION).await).await;
    let g1 = &edition["data"]["children"][0]["children"][0];
    assert_eq!(g1["id"], "g1");
    assert_eq!(g1["children"][0]["id"], "alice");
    assert_eq!(g1["children"][0]["subtype"], "ta");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn import_rejects_tree_without_course_root(pool: SqlitePool) {
    let app = common::build_test_app(pool);
    let tree = json!({ "type": "group", "id": "g1", "subtype": "group", "children": [] });

    let response = post_json(app, "/api/v1/courses", tree).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn add_edition_to_existing_course(pool: SqlitePool) {
    let app = seeded(pool).await;

    let response = post_json(
        app.clone(),
        "/api/v1/courses/CS101/editions",
        json!({ "name": "2025" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let tree = body_json(response).await;
    assert_eq!(child_ids(&tree["data"]), ["2025"]);
    assert!(child_ids(&tree["data"]["children"][0]).is_empty());

    let list = body_json(get(app, "/api/v1/courses").await).await;
    assert_eq!(list["data"][0]["editions"], json!(["2024", "2025"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn add_edition_validates_input(pool: SqlitePool) {
    let app = seeded(pool).await;

    let blank = post_json(
        app.clone(),
        "/api/v1/courses/CS101/editions",
        json!({ "name": "  " }),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let missing = post_json(
        app,
        "/api/v1/courses/CS999/editions",
        json!({ "name": "2024" }),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_edition_returns_404(pool: SqlitePool) {
    let app = seeded(pool).await;

    let response = get(app, "/api/v1/courses/CS101/editions/1999").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn transactions_return_stored_tree(pool: SqlitePool) {
    let app = seeded(pool).await;
    let log = json!({ "log": [
        { "type": "ADD", "payload": { "path": "./CS101/2024", "data": { "type": "group", "id": "g2" } } },
        { "type": "RENAME", "payload": { "path": "./CS101/2024/g1", "name": "team1", "type": "group" } },
    ]});

    let response = post_json(app, &format!("{EDITION}/transactions"), log).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["applied"], 2);
    assert_eq!(child_ids(&json["data"]["tree"]["children"][0]), ["g2", "team1"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_transaction_returns_canonical_tree(pool: SqlitePool) {
    let app = seeded(pool).await;
    let log = json!({ "log": [
        { "type": "ADD", "payload": { "path": "./CS101/2024", "data": { "type": "group", "id": "g2" } } },
        { "type": "RENAME", "payload": { "path": "./CS101/2024/ghost", "name": "g9", "type": "group" } },
        { "type": "ADD", "payload": { "path": "./CS101/2024", "data": { "type": "group", "id": "g3" } } },
    ]});

    let response = post_json(app, &format!("{EDITION}/transactions"), log).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["index"], 1);
    assert!(json["error"].is_string());
    assert_eq!(child_ids(&json["result"]["children"][0]), ["g1", "g2"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_transaction_type_is_rejected(pool: SqlitePool) {
    let app = seeded(pool).await;
    let log = json!({ "log": [{ "type": "MOVE", "payload": {} }] });

    let response = post_json(app, &format!("{EDITION}/transactions"), log).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNKNOWN_TRANSACTION");
    assert_eq!(child_ids(&json["result"]["children"][0]), ["g1"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_node_in_log_is_a_validation_error(pool: SqlitePool) {
    let app = seeded(pool).await;
    let log = json!({ "log": [
        { "type": "ADD", "payload": { "path": "./CS101/2024", "data": { "type": "group", "id": "a/b" } } },
        { "type": "ADD", "payload": { "path": "./CS101/2024", "data": { "type": "group", "id": "g2" } } },
    ]});

    let response = post_json(app, &format!("{EDITION}/transactions"), log).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["index"], 0);
    assert_eq!(child_ids(&json["result"]["children"][0]), ["g1"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn renamed_edition_is_returned_after_replay(pool: SqlitePool) {
    let app = seeded(pool).await;
    let log = json!({ "log": [
        { "type": "RENAME", "payload": { "path": "./CS101/2024", "name": "2025", "type": "group" } },
    ]});

    let response = post_json(app.clone(), &format!("{EDITION}/transactions"), log).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["tree"]["children"][0]["id"], "2025");

    let response = get(app, "/api/v1/courses/CS101/editions/2025").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Project settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn project_settings_default_then_upsert(pool: SqlitePool) {
    let app = seeded(pool).await;
    let uri = format!("{EDITION}/project-settings");

    let defaults = body_json(get(app.clone(), &uri).await).await;
    assert_eq!(defaults["data"]["import_kind"], "empty");

    let settings = json!({
        "import_kind": "url",
        "import_url": "https://example.org/template.git",
        "push_rules": { "branch_name_regex": "^main$" }
    });
    let response = put_json(app.clone(), &uri, settings).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = body_json(get(app, &uri).await).await;
    assert_eq!(stored["data"]["import_kind"], "url");
    assert_eq!(stored["data"]["push_rules"]["branch_name_regex"], "^main$");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn project_settings_reject_bad_regex(pool: SqlitePool) {
    let app = seeded(pool).await;
    let settings = json!({ "push_rules": { "file_name_regex": "(unclosed" } });

    let response = put_json(app, &format!("{EDITION}/project-settings"), settings).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// TA roster
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn ta_roster_put_then_get(pool: SqlitePool) {
    let app = seeded(pool).await;
    let uri = format!("{EDITION}/tas");

    let empty = body_json(get(app.clone(), &uri).await).await;
    assert_eq!(empty["data"], json!({ "normalTas": [], "headTas": [] }));

    let roster = json!({ "normalTas": ["alice", "bob"], "headTas": ["carol"] });
    let response = put_json(app.clone(), &uri, roster.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], roster);

    let stored = body_json(get(app.clone(), &uri).await).await;
    assert_eq!(stored["data"], roster);

    let edition = body_json(get(app, EDITION).await).await;
    let carol = &edition["data"]["children"][0]["children"][1];
    assert_eq!(carol["id"], "carol");
    assert_eq!(carol["subtype"], "head_ta");
    assert_eq!(carol["email"], "carol@uni.example");
    assert_eq!(carol["rights"], json!({ "edit": true, "share": true, "work": true }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dropping_a_ta_removes_their_groups(pool: SqlitePool) {
    let app = seeded(pool).await;
    let uri = format!("{EDITION}/tas");
    put_json(app.clone(), &uri, json!({ "normalTas": ["alice"] })).await;

    let response = put_json(app.clone(), &uri, json!({ "normalTas": [] })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let edition = body_json(get(app, EDITION).await).await;
    let g1 = &edition["data"]["children"][0]["children"][0];
    assert_eq!(g1["id"], "g1");
    assert!(child_ids(g1).is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ta_roster_of_unknown_edition_is_404(pool: SqlitePool) {
    let app = seeded(pool).await;

    let response = get(app.clone(), "/api/v1/courses/CS101/editions/1999/tas").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = put_json(app, &format!("{EDITION}/tas"), json!({ "normalTas": ["a/b"] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn provision_creates_edition_on_gitlab(pool: SqlitePool) {
    let gitlab = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v4/groups/[^/]+$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&gitlab)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/groups"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 10 })))
        .expect(3)
        .mount(&gitlab)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&gitlab)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/users"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 7, "username": "alice" })),
        )
        .expect(1)
        .mount(&gitlab)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/groups/10/members"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&gitlab)
        .await;

    let app = common::build_test_app_with_gitlab(pool, &gitlab.uri());
    post_json(app.clone(), "/api/v1/courses", course_json()).await;

    let response = post_json(app, &format!("{EDITION}/provision"), json!({})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["url"], format!("{}/CS101/2024", gitlab.uri()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn provision_outage_reports_no_url(pool: SqlitePool) {
    let gitlab = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&gitlab)
        .await;

    let app = common::build_test_app_with_gitlab(pool, &gitlab.uri());
    post_json(app.clone(), "/api/v1/courses", course_json()).await;

    let response = post_json(app, &format!("{EDITION}/provision"), json!({})).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PLATFORM_UNAVAILABLE");
    assert!(json.get("data").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn provision_unreachable_gitlab_is_bad_gateway(pool: SqlitePool) {
    let app = seeded(pool).await;

    let response = post_json(app, &format!("{EDITION}/provision"), json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "PLATFORM_ERROR");
}
