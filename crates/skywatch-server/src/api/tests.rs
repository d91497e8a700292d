use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use skywatch_core::models::{PushEvent, Role};

use crate::api;
use crate::config::Config;
use crate::persistence::{self, flights, operators};
use crate::state::AppState;

const SALEM_POLYGON: &str = r#"{"type":"Polygon","coordinates":[[[78.10,11.60],[78.20,11.60],[78.20,11.70],[78.10,11.70],[78.10,11.60]]]}"#;

async fn setup_app() -> (axum::Router, Arc<AppState>) {
    let mut config = Config::from_env();
    config.database_path = std::env::temp_dir()
        .join(format!("skywatch-test-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    config.jwt_secret = "test-secret".to_string();

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await
        .expect("init db");
    let state = Arc::new(AppState::new(db, config));
    state.load_from_database().await.expect("load db");

    let hash = api::operators::hash_password("test-password").expect("hash");
    operators::create(state.db.pool(), "admin@test.local", &hash, Role::Admin)
        .await
        .expect("seed admin");
    operators::create(state.db.pool(), "analyst@test.local", &hash, Role::Analyst)
        .await
        .expect("seed analyst");

    (api::routes(state.clone()), state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn login(app: &axum::Router, email: &str) -> String {
    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": email, "password": "test-password"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    read_json(res).await["token"].as_str().unwrap().to_string()
}

async fn create_salem_region(app: &axum::Router, admin_token: &str) -> i64 {
    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/regions",
            Some(admin_token),
            Some(json!({"name": "Salem Restricted Zone", "polygon_json": SALEM_POLYGON})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    read_json(res).await["id"].as_i64().unwrap()
}

async fn ingest(app: &axum::Router, token: &str, payload: Value) -> Value {
    let res = app
        .clone()
        .oneshot(request("POST", "/v1/telemetry", Some(token), Some(payload)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    read_json(res).await
}

fn salem_intruder() -> Value {
    json!({
        "transponder_id": "VT-SAL",
        "latitude": 11.6052,
        "longitude": 78.1202,
        "altitude": 3529.0,
        "groundspeed": 60.0,
        "track": 45.0
    })
}

#[tokio::test]
async fn register_login_and_me() {
    let (app, _state) = setup_app().await;

    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({"email": "new@test.local", "password": "hunter22"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = read_json(res).await;
    assert_eq!(body["role"], "analyst");

    let token = login(&app, "new@test.local").await;
    let res = app
        .clone()
        .oneshot(request("GET", "/v1/auth/me", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["email"], "new@test.local");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (app, _state) = setup_app().await;

    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/auth/register",
            None,
            Some(json!({"email": "admin@test.local", "password": "whatever1"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (app, _state) = setup_app().await;

    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": "admin@test.local", "password": "nope"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn telemetry_requires_auth() {
    let (app, _state) = setup_app().await;

    let res = app
        .clone()
        .oneshot(request("POST", "/v1/telemetry", None, Some(salem_intruder())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/telemetry",
            Some("not-a-real-token"),
            Some(salem_intruder()),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reject_invalid_telemetry() {
    let (app, _state) = setup_app().await;
    let token = login(&app, "analyst@test.local").await;

    // Out-of-range latitude.
    let mut bad = salem_intruder();
    bad["latitude"] = json!(123.456);
    let res = app
        .clone()
        .oneshot(request("POST", "/v1/telemetry", Some(&token), Some(bad)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Missing required field.
    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/telemetry",
            Some(&token),
            Some(json!({"latitude": 11.0, "longitude": 78.0})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Wrong type.
    let mut bad = salem_intruder();
    bad["groundspeed"] = json!("fast");
    let res = app
        .clone()
        .oneshot(request("POST", "/v1/telemetry", Some(&token), Some(bad)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn benign_cruise_outside_zone() {
    let (app, state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    let track = ingest(
        &app,
        &admin,
        json!({
            "transponder_id": "AI301",
            "latitude": 11.45,
            "longitude": 77.85,
            "altitude": 35000.0,
            "groundspeed": 450.0,
            "track": 45.0
        }),
    )
    .await;

    assert_eq!(track["in_restricted_area"], json!(false));
    assert_eq!(track["threat_level"], "Low");
    assert_eq!(track["threat_score"], 15);
    assert_eq!(track["classification"], "high-performance");
    assert_eq!(track["predicted_trajectory"].as_array().unwrap().len(), 6);

    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 0);
    assert_eq!(state.dedup.open_count(), 0);
}

#[tokio::test]
async fn zone_intrusion_by_small_aircraft() {
    let (app, state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    let track = ingest(&app, &admin, salem_intruder()).await;

    assert_eq!(track["in_restricted_area"], json!(true));
    assert_eq!(track["threat_score"], 50);
    assert_eq!(track["threat_level"], "High");

    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts", Some(&admin), None))
        .await
        .unwrap();
    let alerts = read_json(res).await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    let reasons: Vec<&str> = alerts[0]["threat_reasons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert!(reasons.contains(&"Inside restricted zone"));
    assert!(reasons.contains(&"Low altitude in zone"));
    assert_eq!(alerts[0]["severity"], "High");
    assert_eq!(state.dedup.open_count(), 1);
}

#[tokio::test]
async fn unidentified_fast_track_outside_zone() {
    let (app, _state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    let track = ingest(
        &app,
        &admin,
        json!({
            "transponder_id": null,
            "latitude": 11.52,
            "longitude": 78.08,
            "altitude": 25000.0,
            "groundspeed": 780.0,
            "track": 45.0
        }),
    )
    .await;

    assert_eq!(track["classification"], "fighter");
    assert_eq!(track["threat_score"], 50);
    assert_eq!(track["threat_level"], "High");

    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts", Some(&admin), None))
        .await
        .unwrap();
    let alerts = read_json(res).await;
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    let reasons: Vec<&str> = alerts[0]["threat_reasons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert!(reasons.contains(&"No transponder signal"));
    assert!(reasons.contains(&"High speed (780 kt)"));
}

#[tokio::test]
async fn unidentified_fast_low_intruder_is_critical() {
    let (app, _state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    let track = ingest(
        &app,
        &admin,
        json!({
            "transponder_id": "UNKNOWN",
            "latitude": 11.6052,
            "longitude": 78.1202,
            "altitude": 800.0,
            "groundspeed": 780.0,
            "track": 45.0
        }),
    )
    .await;

    assert_eq!(track["threat_score"], 100);
    assert_eq!(track["threat_level"], "Critical");
    assert_eq!(track["transponder_id"], Value::Null);
}

#[tokio::test]
async fn dedup_under_continuous_intrusion() {
    let (app, state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    for i in 0..10 {
        let mut payload = salem_intruder();
        payload["latitude"] = json!(11.6052 + 0.0001 * i as f64);
        ingest(&app, &admin, payload).await;
    }

    // Ten track records persisted, one open alert, one snapshot entry.
    assert_eq!(flights::list_recent(state.db.pool(), 50).await.unwrap().len(), 10);
    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 1);
    assert_eq!(state.dedup.open_count(), 1);
    assert_eq!(state.snapshot(50).len(), 1);
}

#[tokio::test]
async fn auto_close_on_exit() {
    let (app, state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    ingest(&app, &admin, salem_intruder()).await;
    assert_eq!(state.dedup.open_count(), 1);

    let mut sub = state.bus.subscribe();

    let outside = json!({
        "transponder_id": "VT-SAL",
        "latitude": 11.50,
        "longitude": 78.00,
        "altitude": 3529.0,
        "groundspeed": 60.0,
        "track": 45.0
    });
    ingest(&app, &admin, outside.clone()).await;
    assert_eq!(state.dedup.open_count(), 1);
    ingest(&app, &admin, outside).await;
    assert_eq!(state.dedup.open_count(), 0);

    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts?resolved=false", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 0);

    // First exit sample, resolution, second exit sample, in that order.
    let mut events = Vec::new();
    while let Ok(event) = sub.rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], PushEvent::TrackUpdate(_)));
    assert!(matches!(events[1], PushEvent::AlertResolved(_)));
    assert!(matches!(events[2], PushEvent::TrackUpdate(_)));
}

#[tokio::test]
async fn resolving_reopens_on_next_intrusion() {
    let (app, state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;

    ingest(&app, &admin, salem_intruder()).await;
    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts", Some(&admin), None))
        .await
        .unwrap();
    let alerts = read_json(res).await;
    let alert_id = alerts[0]["id"].as_i64().unwrap();

    let res = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/alerts/{}/resolve", alert_id),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(state.dedup.open_count(), 0);

    // Resolving again is a no-op, unknown ids are 404.
    let res = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/v1/alerts/{}/resolve", alert_id),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app
        .clone()
        .oneshot(request("POST", "/v1/alerts/99999/resolve", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The next high-threat sample opens a second alert.
    ingest(&app, &admin, salem_intruder()).await;
    let res = app
        .clone()
        .oneshot(request("GET", "/v1/alerts", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 2);
    assert_eq!(state.dedup.open_count(), 1);
}

#[tokio::test]
async fn region_toggle_flips_containment() {
    let (app, _state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    let region_id = create_salem_region(&app, &admin).await;

    let track = ingest(&app, &admin, salem_intruder()).await;
    assert_eq!(track["in_restricted_area"], json!(true));

    let res = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/regions/{}/toggle", region_id),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["active"], json!(false));

    let track = ingest(&app, &admin, salem_intruder()).await;
    assert_eq!(track["in_restricted_area"], json!(false));
    assert_eq!(track["threat_level"], "Low");

    let res = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/v1/regions/{}/toggle", region_id),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let track = ingest(&app, &admin, salem_intruder()).await;
    assert_eq!(track["in_restricted_area"], json!(true));
}

#[tokio::test]
async fn region_detail_carries_framing_hints() {
    let (app, _state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    let region_id = create_salem_region(&app, &admin).await;

    let res = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/v1/regions/{}", region_id),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let detail = read_json(res).await;
    assert_eq!(detail["name"], "Salem Restricted Zone");
    assert!((detail["centroid"][0].as_f64().unwrap() - 11.65).abs() < 1e-9);
    assert!((detail["centroid"][1].as_f64().unwrap() - 78.15).abs() < 1e-9);
    assert!((detail["extent_deg"].as_f64().unwrap() - 0.1).abs() < 1e-9);
}

#[tokio::test]
async fn malformed_region_is_rejected() {
    let (app, _state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;

    for polygon in [
        "not json",
        r#"{"type":"Point","coordinates":[1,2]}"#,
        r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1]]]}"#,
    ] {
        let res = app
            .clone()
            .oneshot(request(
                "POST",
                "/v1/regions",
                Some(&admin),
                Some(json!({"name": "Bad", "polygon_json": polygon})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn region_mutations_require_admin() {
    let (app, _state) = setup_app().await;
    let analyst = login(&app, "analyst@test.local").await;

    let res = app
        .clone()
        .oneshot(request(
            "POST",
            "/v1/regions",
            Some(&analyst),
            Some(json!({"name": "Zone", "polygon_json": SALEM_POLYGON})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .clone()
        .oneshot(request("PATCH", "/v1/regions/1/toggle", Some(&analyst), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .clone()
        .oneshot(request("DELETE", "/v1/regions/1", Some(&analyst), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Reads stay open to analysts.
    let res = app
        .clone()
        .oneshot(request("GET", "/v1/regions", Some(&analyst), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn tracks_snapshot_is_latest_per_identity() {
    let (app, _state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;

    for speed in [200.0, 250.0, 300.0] {
        ingest(
            &app,
            &admin,
            json!({
                "transponder_id": "AI301",
                "latitude": 11.45,
                "longitude": 77.85,
                "altitude": 35000.0,
                "groundspeed": speed,
                "track": 45.0
            }),
        )
        .await;
    }
    ingest(
        &app,
        &admin,
        json!({
            "transponder_id": "VT-ABC",
            "latitude": 12.0,
            "longitude": 77.0,
            "altitude": 9000.0,
            "groundspeed": 140.0,
            "track": 90.0
        }),
    )
    .await;

    let res = app
        .clone()
        .oneshot(request("GET", "/v1/tracks", Some(&admin), None))
        .await
        .unwrap();
    let tracks = read_json(res).await;
    let tracks = tracks.as_array().unwrap().clone();
    assert_eq!(tracks.len(), 2);

    let ai301 = tracks
        .iter()
        .find(|t| t["transponder_id"] == "AI301")
        .unwrap();
    assert_eq!(ai301["groundspeed"], json!(300.0));

    // Single-track fetch by id.
    let id = ai301["id"].as_i64().unwrap();
    let res = app
        .clone()
        .oneshot(request("GET", &format!("/v1/tracks/{}", id), Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = app
        .clone()
        .oneshot(request("GET", "/v1/tracks/99999", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cold_start_rebuilds_state_from_store() {
    let (app, state) = setup_app().await;
    let admin = login(&app, "admin@test.local").await;
    create_salem_region(&app, &admin).await;
    ingest(&app, &admin, salem_intruder()).await;

    // A second state over the same database sees the same world.
    let db = persistence::init_database(
        &state.config.database_path,
        state.config.database_max_connections,
    )
    .await
    .unwrap();
    let rebuilt = AppState::new(db, state.config.clone());
    rebuilt.load_from_database().await.unwrap();

    assert_eq!(rebuilt.snapshot(10).len(), 1);
    assert_eq!(rebuilt.dedup.open_count(), 1);
    assert_eq!(rebuilt.active_regions().len(), 1);
    assert!(rebuilt.containing_region(11.6052, 78.1202).is_some());
}
