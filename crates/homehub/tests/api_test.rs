use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use homehub::api::{cors_layer, create_router};
use homehub::config::AuthConfig;
use homehub::devices::SeededRandom;
use homehub::{AppContext, Database};

const SECRET: &str = "test-signing-secret-0123";

fn app() -> Router {
    app_with(Arc::new(Database::in_memory()))
}

fn app_with(db: Arc<Database>) -> Router {
    let ctx = AppContext::new(db, &AuthConfig::with_secret(SECRET), Arc::new(SeededRandom::new(7)));
    create_router(Arc::new(ctx), cors_layer(&[]))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn put(app: &Router, token: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

async fn signup(app: &Router, username: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": username, "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}

async fn add_device(app: &Router, token: &str, id: &str, device_type: &str, status: &str) {
    let (code, body) = send(
        app,
        Method::POST,
        "/devices",
        Some(token),
        Some(json!({
            "device_id": id,
            "name": id,
            "type": device_type,
            "status": status,
            "properties": {}
        })),
    )
    .await;
    assert_eq!(code, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_thermostat_scenario() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": "alice", "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"], json!({ "id": 1, "username": "alice", "email": "a@x.com" }));
    assert_eq!(body["token_type"], "bearer");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": "alice", "email": "other@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already registered");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/devices", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/devices",
        Some(&token),
        Some(json!({
            "device_id": "d1",
            "name": "Hallway",
            "type": "thermostat",
            "status": "off",
            "properties": {}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device_id"], "d1");
    assert_eq!(body["type"], "thermostat");
    assert!(body.get("owner_id").is_none(), "{body}");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/d1/temperature",
        Some(&token),
        Some(json!(25.5)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Temperature updated successfully");

    let (status, body) = send(&app, Method::GET, "/devices/d1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"]["temperature"], json!(25.5));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/d1/brightness",
        Some(&token),
        Some(json!(50)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "device is a thermostat, not a light");
}

#[tokio::test]
async fn test_unauthenticated_is_uniform() {
    let app = app();
    signup(&app, "alice", "a@x.com").await;

    for token in [None, Some("garbage"), Some("a.b.c")] {
        let (status, body) = send(&app, Method::GET, "/devices", token, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Could not validate credentials");
    }

    // Signed with a different secret
    let other =
        homehub::auth::TokenService::new(b"some-other-secret-key", chrono::Duration::minutes(5));
    let forged = other.issue("alice").unwrap();
    let (status, _) = send(&app, Method::GET, "/users/me", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_challenge_header() {
    let app = app();
    let response = app
        .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn test_bearer_scheme_is_case_insensitive() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;

    for scheme in ["bearer", "BEARER", "Bearer"] {
        let request = Request::get("/users/me")
            .header(header::AUTHORIZATION, format!("{} {}", scheme, token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "scheme {scheme}");
    }

    for value in ["Basic abc", "Bearer", "Bearer ", token.as_str()] {
        let request = Request::get("/users/me")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {value}");
    }
}

#[tokio::test]
async fn test_login_failures() {
    let app = app();
    signup(&app, "alice", "a@x.com").await;

    for creds in [
        json!({ "username": "alice", "password": "wrong-pass" }),
        json!({ "username": "nobody", "password": "secret1" }),
    ] {
        let (status, body) = send(&app, Method::POST, "/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Incorrect username or password");
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username and password are required");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = app();
    let cases = [
        (
            json!({ "username": "al", "email": "a@x.com", "password": "secret1" }),
            "Username must be at least 3 characters long",
        ),
        (
            json!({ "username": "alice", "email": "nope", "password": "secret1" }),
            "Invalid email format",
        ),
        (
            json!({ "username": "alice", "email": "a@x.com", "password": "123" }),
            "Password must be at least 6 characters long",
        ),
    ];
    for (body, detail) in cases {
        let (status, response) = send(&app, Method::POST, "/auth/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["detail"], detail);
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;
    let (status, body) = send(&app, Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": 1, "username": "alice", "email": "a@x.com" }));
}

#[tokio::test]
async fn test_other_users_device_is_not_found() {
    let app = app();
    let alice = signup(&app, "alice", "a@x.com").await;
    let bob = signup(&app, "bob", "b@x.com").await;
    add_device(&app, &alice, "lamp", "light", "off").await;

    let requests = [
        (Method::GET, "/devices/lamp", None),
        (Method::PUT, "/devices/lamp", Some(json!({ "name": "mine now" }))),
        (Method::PUT, "/devices/lamp/brightness", Some(json!(10))),
        (Method::PUT, "/devices/lamp/status?status=on", None),
        (Method::GET, "/devices/lamp/stats", None),
        (Method::GET, "/devices/missing", None),
    ];
    for (method, uri, body) in requests {
        let (status, response) = send(&app, method, uri, Some(&bob), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(response["detail"], "Device not found");
    }

    let (_, devices) = send(&app, Method::GET, "/devices", Some(&bob), None).await;
    assert_eq!(devices, json!([]));

    let (_, lamp) = send(&app, Method::GET, "/devices/lamp", Some(&alice), None).await;
    assert_eq!(lamp["name"], "lamp");
    assert_eq!(lamp["status"], "off");
}

#[tokio::test]
async fn test_duplicate_device_id_conflicts() {
    let app = app();
    let alice = signup(&app, "alice", "a@x.com").await;
    let bob = signup(&app, "bob", "b@x.com").await;
    add_device(&app, &alice, "d1", "light", "off").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/devices",
        Some(&bob),
        Some(json!({ "device_id": "d1", "name": "x", "type": "lock", "status": "off" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_from_query_or_body() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;
    add_device(&app, &token, "plug", "switch", "off").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/plug/status?status=on",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "on");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/plug/status",
        Some(&token),
        Some(json!({ "status": "standby" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "standby");

    let (status, _) = send(&app, Method::PUT, "/devices/plug/status", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_typed_setters() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;
    add_device(&app, &token, "lamp", "light", "off").await;
    add_device(&app, &token, "door", "lock", "unlocked").await;

    let (status, _) = put(&app, &token, "/devices/lamp/brightness", json!(70)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = put(&app, &token, "/devices/lamp/brightness", json!(101)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = put(&app, &token, "/devices/lamp/brightness", json!("bright")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put(&app, &token, "/devices/lamp/color", json!("#00ff7f")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = put(&app, &token, "/devices/lamp/color", json!("green")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = put(&app, &token, "/devices/door/color", json!("#00ff7f")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, lamp) = send(&app, Method::GET, "/devices/lamp", Some(&token), None).await;
    assert_eq!(lamp["properties"], json!({ "brightness": 70, "color": "#00ff7f" }));

    let (status, body) = put(&app, &token, "/devices/door/lock", json!(true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "message": "Lock locked successfully", "status": "locked" })
    );

    let (_, door) = send(&app, Method::GET, "/devices/door", Some(&token), None).await;
    assert_eq!(door["status"], "locked");
    assert_eq!(door["properties"]["locked"], true);

    let (_, body) = put(&app, &token, "/devices/door/lock", json!(false)).await;
    assert_eq!(body["status"], "unlocked");
}

#[tokio::test]
async fn test_schedule_and_device_settings() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;
    add_device(&app, &token, "lamp", "light", "off").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/lamp/schedule",
        Some(&token),
        Some(json!({ "enabled": false, "time": "07:30", "days": ["Mon", "Fri"], "action": "on" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Schedule updated successfully");

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            Method::PUT,
            "/devices/lamp/schedule",
            Some(&token),
            Some(json!({ "enabled": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        &app,
        Method::PUT,
        "/devices/lamp/settings",
        Some(&token),
        Some(json!({ "name": "Desk lamp", "location": "Office", "energySaving": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, lamp) = send(&app, Method::GET, "/devices/lamp", Some(&token), None).await;
    assert_eq!(lamp["name"], "Desk lamp");
    assert_eq!(
        lamp["properties"],
        json!({
            "schedule": {
                "enabled": true,
                "time": "07:30",
                "days": ["Mon", "Fri"],
                "action": "on"
            },
            "location": "Office",
            "energySaving": true
        })
    );
}

#[tokio::test]
async fn test_patch_device() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;
    add_device(&app, &token, "lamp", "light", "off").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/lamp",
        Some(&token),
        Some(json!({ "status": "on", "properties": { "brightness": 20, "mode": "night" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "on");
    assert_eq!(body["properties"], json!({ "brightness": 20, "mode": "night" }));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/devices/lamp",
        Some(&token),
        Some(json!({ "properties": { "temperature": 20 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Switching type while light-only keys remain is rejected as a whole
    let (status, body) = send(
        &app,
        Method::PUT,
        "/devices/lamp",
        Some(&token),
        Some(json!({ "type": "thermostat", "name": "heater" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "device is a thermostat, not a light");

    let (_, devices) = send(&app, Method::GET, "/devices", Some(&token), None).await;
    assert_eq!(
        devices,
        json!([{
            "device_id": "lamp",
            "name": "lamp",
            "type": "light",
            "status": "on",
            "properties": { "brightness": 20, "mode": "night" }
        }])
    );
}

#[tokio::test]
async fn test_stats() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;
    add_device(&app, &token, "lamp", "light", "on").await;
    add_device(&app, &token, "fan", "switch", "off").await;

    let (status, body) = send(&app, Method::GET, "/devices/lamp/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let power = body["powerUsage"].as_u64().unwrap();
    let runtime = body["runtime"].as_u64().unwrap();
    assert!((5..=100).contains(&power));
    assert!((1..=24).contains(&runtime));
    assert!(chrono::DateTime::parse_from_rfc3339(body["lastUpdated"].as_str().unwrap()).is_ok());

    let (_, lamp) = send(&app, Method::GET, "/devices/lamp", Some(&token), None).await;
    assert_eq!(lamp["properties"]["stats"], body);

    let (_, body) = send(&app, Method::GET, "/devices/fan/stats", Some(&token), None).await;
    assert_eq!((body["powerUsage"].as_u64(), body["runtime"].as_u64()), (Some(0), Some(0)));
}

#[tokio::test]
async fn test_user_settings() {
    let app = app();
    let token = signup(&app, "alice", "a@x.com").await;

    let (status, defaults) = send(&app, Method::GET, "/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    insta::assert_json_snapshot!(defaults, @r###"
    {
      "autoLock": true,
      "darkMode": false,
      "emailAlerts": true,
      "energyReports": "weekly",
      "notifications": true,
      "quietHours": {
        "enabled": false,
        "end": "07:00",
        "start": "22:00"
      },
      "temperature": "celsius"
    }
    "###);

    let (_, again) = send(&app, Method::GET, "/settings", Some(&token), None).await;
    assert_eq!(again, defaults);

    let mut updated = defaults.clone();
    updated["darkMode"] = json!(true);
    updated["temperature"] = json!("fahrenheit");
    let (status, body) = put(&app, &token, "/settings", updated.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Settings updated successfully");

    let (_, stored) = send(&app, Method::GET, "/settings", Some(&token), None).await;
    assert_eq!(stored, updated);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/settings",
        Some(&token),
        Some(json!({ "darkMode": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_enum = updated.clone();
    bad_enum["energyReports"] = json!("hourly");
    let (status, _) = send(&app, Method::PUT, "/settings", Some(&token), Some(bad_enum)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("homehub.json");

    {
        let app = app_with(Arc::new(Database::open(&path).await.unwrap()));
        let token = signup(&app, "alice", "a@x.com").await;
        add_device(&app, &token, "door", "lock", "unlocked").await;
        send(&app, Method::PUT, "/devices/door/lock", Some(&token), Some(json!(true))).await;
    }

    let app = app_with(Arc::new(Database::open(&path).await.unwrap()));
    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let (_, door) = send(&app, Method::GET, "/devices/door", Some(token), None).await;
    assert_eq!(door["status"], "locked");
}

#[tokio::test]
async fn test_ping_and_info() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/v1/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = send(&app, Method::GET, "/v1/info", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["hostname"].is_string());
}
