//! End-to-end tests: the full router against an in-memory SQLite database.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sql_gateway::config::{
    ApiSettings, AppEnv, DatabaseSettings, DatabaseTarget, LoggingSettings, ServerSettings, Settings,
};
use sql_gateway::database::{Database, SqliteDatabase};
use sql_gateway::{app, AppState, Backend};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        age INTEGER,
        active BOOLEAN NOT NULL DEFAULT 1
    )",
    "CREATE TABLE secrets (id INTEGER PRIMARY KEY, value TEXT)",
    "CREATE TABLE pairs (a INTEGER NOT NULL, b INTEGER NOT NULL, PRIMARY KEY (a, b))",
    "INSERT INTO users (email, name, age, active) VALUES
        ('a@x', 'ann', 30, 1),
        ('b@x', 'bob', 25, 0),
        ('c@x', 'cy', 30, 1),
        ('d@x', 'dee', 41, 1),
        ('e@x', 'eve', 19, 0)",
    "INSERT INTO secrets (value) VALUES ('s3cret')",
    "INSERT INTO pairs (a, b) VALUES (1, 2)",
];

fn api_settings() -> ApiSettings {
    ApiSettings {
        hidden_tables: vec!["secrets".into()],
        allowed_origins: vec!["http://admin.local".into()],
        rate_limit_per_minute: 0,
        ..ApiSettings::default()
    }
}

async fn setup(api: ApiSettings) -> Router {
    setup_with_db(api).await.0
}

async fn setup_with_db(api: ApiSettings) -> (Router, Arc<dyn Database>) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::from_pool(pool));
    for stmt in SCHEMA {
        db.execute(stmt, &[]).await.unwrap();
    }
    let settings = Settings {
        database: DatabaseSettings {
            backend: Backend::Sqlite,
            target: DatabaseTarget::Url("sqlite::memory:".into()),
            max_connections: 1,
        },
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 5000,
            env: AppEnv::Development,
        },
        api,
        logging: LoggingSettings::default(),
    };
    (app(AppState::new(db.clone(), settings)), db)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, &[]).await
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_ready_version_favicon() {
    let app = setup(api_settings()).await;
    assert_eq!(get(&app, "/health").await, (StatusCode::OK, json!({"status": "ok"})));
    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], json!("SQLite"));
    let (status, body) = get(&app, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("sql-gateway"));
    assert_eq!(get(&app, "/favicon.ico").await.0, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn table_list_respects_visibility() {
    let app = setup(api_settings()).await;
    let (status, body) = get(&app, "/api/v1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["pairs", "users"]));

    let (_, body) = send(&app, Method::GET, "/api/v1", None, &[("origin", "http://admin.local")]).await;
    assert_eq!(body["data"], json!(["pairs", "secrets", "users"]));
}

#[tokio::test]
async fn hidden_table_is_denied_unless_trusted() {
    let app = setup(api_settings()).await;
    let (status, body) = get(&app, "/api/v1/secrets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("table_permission_denied"));

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/secrets",
        None,
        &[("referer", "http://admin.local/dashboard")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["value"], json!("s3cret"));
}

#[tokio::test]
async fn select_envelope_uses_default_limit() {
    let app = setup(api_settings()).await;
    let (status, body) = get(&app, "/api/v1/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["status"], json!({"success": true, "type": "info"}));
    assert_eq!(body["query"]["sql"]["type"], json!("select"));
    assert_eq!(body["result_group"], json!(true));
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"][0]["active"], json!(true));
    assert_eq!(
        body["meta"],
        json!({"total_records": 5, "page": 1, "per_page": 100, "total_pages": 1})
    );
    assert_eq!(body["links"]["self"], json!("/api/v1/users?offset=0&limit=100"));
}

#[tokio::test]
async fn unlimited_select_has_plain_links() {
    let app = setup(api_settings()).await;
    let (_, body) = get(&app, "/api/v1/users?limit=-1&offset=3").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["meta"]["per_page"], json!(5));
    assert_eq!(body["links"]["self"], json!("/api/v1/users"));
    assert_eq!(body["query"]["arguments"], json!({"limit": "-1", "offset": "3"}));
}

#[tokio::test]
async fn pagination_links() {
    let app = setup(api_settings()).await;
    let (_, body) = get(&app, "/api/v1/users?limit=2&offset=2").await;
    assert_eq!(names(&body), vec!["cy", "dee"]);
    assert_eq!(
        body["meta"],
        json!({"total_records": 5, "page": 2, "per_page": 2, "total_pages": 3})
    );
    assert_eq!(body["links"]["next"], json!("/api/v1/users?offset=4&limit=2"));
    assert_eq!(body["links"]["prev"], json!("/api/v1/users?offset=0&limit=2"));
}

#[tokio::test]
async fn filters_where_and_ordering() {
    let app = setup(api_settings()).await;
    let (_, body) = get(&app, "/api/v1/users?name=bob&unknown=1").await;
    assert_eq!(names(&body), vec!["bob"]);

    let (_, body) = get(&app, "/api/v1/users?where=age%3D30%20and%20active%3Dtrue").await;
    assert_eq!(names(&body), vec!["ann", "cy"]);
    assert_eq!(body["meta"]["total_records"], json!(2));

    let (_, body) = get(&app, "/api/v1/users?order_by=age&sort=DESC&limit=1").await;
    assert_eq!(names(&body), vec!["dee"]);

    let (_, body) = get(&app, "/api/v1/users?order_by=age&sort=sideways&limit=2").await;
    assert_eq!(names(&body), vec!["eve", "bob"]);
}

#[tokio::test]
async fn invalid_query_arguments() {
    let app = setup(api_settings()).await;
    for uri in [
        "/api/v1/users?order_by=height",
        "/api/v1/users?where=height%3D3",
        "/api/v1/users?limit=ten",
        "/api/v1/users?limit=2&offset=-1",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], json!("invalid_query_arg"), "{}", uri);
    }
}

#[tokio::test]
async fn unknown_table_and_record() {
    let app = setup(api_settings()).await;
    let (status, body) = get(&app, "/api/v1/ghosts").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("table_not_found"));

    let (status, body) = get(&app, "/api/v1/users/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));

    let (status, body) = get(&app, "/api/v1/users/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["email"], json!("c@x"));
}

#[tokio::test]
async fn id_routes_need_a_single_primary_key() {
    let app = setup(api_settings()).await;
    let (status, body) = get(&app, "/api/v1/pairs/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("primary_key_not_found"));
}

#[tokio::test]
async fn create_validates_and_returns_row() {
    let app = setup(api_settings()).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/users",
        Some(json!({"email": "f@x", "name": "fay", "age": 22})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"]["type"], json!("success"));
    assert_eq!(body["query"]["sql"]["type"], json!("insert"));
    assert_eq!(body["affected_rows"], json!(1));
    assert_eq!(body["data"][0]["id"], json!(6));
    assert_eq!(body["data"][0]["name"], json!("fay"));

    let (_, body) = get(&app, "/api/v1/users/6").await;
    assert_eq!(body["data"][0]["active"], json!(true));

    let cases = [
        (json!({"email": "a@x", "name": "dup"}), StatusCode::CONFLICT, "already_used"),
        (json!({"email": "g@x"}), StatusCode::BAD_REQUEST, "invalid_fields"),
        (json!({"email": "g@x", "name": "g", "height": 2}), StatusCode::BAD_REQUEST, "invalid_fields"),
        (json!({}), StatusCode::BAD_REQUEST, "no_data_provided"),
        (json!([1, 2]), StatusCode::BAD_REQUEST, "no_data_provided"),
    ];
    for (payload, expected, code) in cases {
        let (status, body) = send(&app, Method::POST, "/api/v1/users", Some(payload.clone()), &[]).await;
        assert_eq!(status, expected, "{}", payload);
        assert_eq!(body["error"]["code"], json!(code), "{}", payload);
    }
}

#[tokio::test]
async fn malformed_json_is_no_data() {
    let app = setup(api_settings()).await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_and_patch() {
    let app = setup(api_settings()).await;
    let (status, body) = send(&app, Method::PUT, "/api/v1/users/1", Some(json!({"name": "annie"})), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("invalid_fields"));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/users/1",
        Some(json!({"id": 1, "email": "ann@x", "name": "annie"})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"]["sql"]["type"], json!("update"));
    assert_eq!(body["data"][0]["email"], json!("ann@x"));

    let (status, body) = send(&app, Method::PATCH, "/api/v1/users/2", Some(json!({"age": 26})), &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["age"], json!(26));
    assert_eq!(body["data"][0]["name"], json!("bob"));

    let (status, body) = send(&app, Method::PATCH, "/api/v1/users/2", Some(json!({"id": 3, "age": 1})), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("key_mismatch"));

    let (status, body) = send(&app, Method::PATCH, "/api/v1/users/2", Some(json!({"id": "2"})), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("nothing_to_update"));
    assert_eq!(body["error"]["type"], json!("warning"));

    let (status, _) = send(&app, Method::PATCH, "/api/v1/users/42", Some(json!({"age": 1})), &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_into_a_used_unique_value_conflicts() {
    let app = setup(api_settings()).await;
    let (status, body) = send(&app, Method::PATCH, "/api/v1/users/2", Some(json!({"email": "a@x"})), &[]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("already_used"));
}

#[tokio::test]
async fn delete_returns_removed_row() {
    let app = setup(api_settings()).await;
    let (status, body) = send(&app, Method::DELETE, "/api/v1/users/4", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], json!("dee"));
    assert_eq!(body["query"]["sql"]["type"], json!("delete"));
    assert_eq!(get(&app, "/api/v1/users/4").await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        send(&app, Method::DELETE, "/api/v1/users/4", None, &[]).await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn api_keys_guard_table_routes_only() {
    let mut api = api_settings();
    api.api_keys.insert("k1".into(), "s1".into());
    let app = setup(api).await;

    let (status, body) = get(&app, "/api/v1/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("unauthorized"));

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/users",
        None,
        &[("x-api-key", "k1"), ("x-api-secret", "nope")],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/users",
        None,
        &[("x-api-key", "k1"), ("x-api-secret", "s1")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(get(&app, "/health").await.0, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_per_client() {
    let mut api = api_settings();
    api.rate_limit_per_minute = 2;
    api.trust_forwarded_for = true;
    let app = setup(api).await;
    let client = [("x-forwarded-for", "10.1.1.1")];
    for _ in 0..2 {
        assert_eq!(send(&app, Method::GET, "/api/v1", None, &client).await.0, StatusCode::OK);
    }
    let (status, body) = send(&app, Method::GET, "/api/v1", None, &client).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], json!("too_many_requests"));

    let other = [("x-forwarded-for", "10.2.2.2")];
    assert_eq!(send(&app, Method::GET, "/api/v1", None, &other).await.0, StatusCode::OK);
}

#[tokio::test]
async fn routing_errors_are_json() {
    let app = setup(api_settings()).await;
    let (status, body) = get(&app, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
    assert_eq!(body["success"], json!(false));

    let (status, body) = send(&app, Method::POST, "/api/v1/users/1", Some(json!({"a": 1})), &[]).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], json!("method_not_allowed"));
}

#[tokio::test]
async fn unchecked_headers_do_not_open_new_rate_buckets() {
    let mut api = api_settings();
    api.rate_limit_per_minute = 2;
    let app = setup(api).await;
    let mut statuses = Vec::new();
    for i in 0..4 {
        let key = format!("junk{}", i);
        let forwarded = format!("10.0.0.{}", i);
        let headers = [("x-api-key", key.as_str()), ("x-forwarded-for", forwarded.as_str())];
        statuses.push(send(&app, Method::GET, "/api/v1", None, &headers).await.0);
    }
    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn tables_created_after_startup_are_served() {
    let (app, db) = setup_with_db(api_settings()).await;
    assert_eq!(get(&app, "/api/v1/users").await.0, StatusCode::OK);
    db.execute("CREATE TABLE orders (id INTEGER PRIMARY KEY, total REAL)", &[])
        .await
        .unwrap();
    db.execute("INSERT INTO orders (total) VALUES (12.5)", &[]).await.unwrap();

    let (status, body) = get(&app, "/api/v1/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["total"], json!(12.5));
    let (_, body) = get(&app, "/api/v1").await;
    assert_eq!(body["data"], json!(["orders", "pairs", "users"]));
}
