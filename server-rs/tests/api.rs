use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use matchday_api::config::Config;
use matchday_api::middleware::auth::issue_token;
use matchday_api::{build_router, AppState};

const SECRET: &str = "integration-secret";
const ADMIN_EMAIL: &str = "organizer@club.test";

fn app() -> Router {
    build_router(AppState::in_memory(Config::in_memory(SECRET, &[ADMIN_EMAIL])))
}

fn token(email: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let token = issue_token(id, Some(email), SECRET, 3600).unwrap();
    (id, token)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header("authorization", format!("Bearer {t}"));
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

/// Signs the allow-listed organizer in, which enrolls them as admin.
async fn admin_token(app: &Router) -> String {
    let (_, t) = token(ADMIN_EMAIL);
    let (status, body) = call(app, Method::POST, "/api/v1/auth/session", Some(&t), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_admin"], true);
    t
}

fn match_body(private: bool) -> Value {
    let starts_at = Utc::now() + Duration::days(1);
    json!({
        "starts_at": starts_at,
        "ends_at": starts_at + Duration::minutes(90),
        "location": "Northfield Astro",
        "capacity": 18,
        "match_type": "friendly",
        "is_private": private,
        "total_cost": 72.0,
        "rented_by_name": "Sam",
    })
}

async fn create_match(app: &Router, admin: &str, private: bool) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/matches",
        Some(admin),
        Some(match_body(private)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_store_up() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn only_allow_listed_actor_becomes_admin() {
    let app = app();
    let (_, t) = token("fan@club.test");
    let (_, body) = call(&app, Method::POST, "/api/v1/auth/session", Some(&t), None).await;
    assert_eq!(body["is_admin"], false);

    let (status, body) = call(&app, Method::POST, "/api/v1/auth/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let admin = admin_token(&app).await;
    let (_, me) = call(&app, Method::GET, "/api/v1/auth/me", Some(&admin), None).await;
    assert_eq!(me["is_admin"], true);
}

#[tokio::test]
async fn tomorrow_friendly_gk_and_cm_signups() {
    let app = app();
    let admin = admin_token(&app).await;
    let id = create_match(&app, &admin, false).await;
    let (_, player) = token("player@club.test");

    for (name, position) in [("Cam", "cm"), ("Goalie", "gk")] {
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/matches/{id}/signups"),
            Some(&player),
            Some(json!({"player_name": name, "team": "white", "position": position})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, lineup) = call(
        &app,
        Method::GET,
        &format!("/api/v1/matches/{id}/lineup/white"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let positions: Vec<&str> = lineup
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["position"].as_str().unwrap())
        .collect();
    assert_eq!(positions, vec!["gk", "cm"]);

    let (_, summary) = call(
        &app,
        Method::GET,
        &format!("/api/v1/matches/{id}/summary"),
        None,
        None,
    )
    .await;
    assert_eq!(summary["spots_remaining"], 16);
    assert_eq!(summary["white_count"], 2);
    assert_eq!(summary["can_signup"], true);
    assert_eq!(summary["match"]["cost_per_player"], 4.0);
}

#[tokio::test]
async fn duplicate_signup_returns_conflict() {
    let app = app();
    let admin = admin_token(&app).await;
    let id = create_match(&app, &admin, false).await;
    let (_, player) = token("player@club.test");
    let signup = json!({"player_name": "Twice", "team": "black"});
    let uri = format!("/api/v1/matches/{id}/signups");

    let (status, _) = call(&app, Method::POST, &uri, Some(&player), Some(signup.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, Method::POST, &uri, Some(&player), Some(signup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_signup");

    let (_, rows) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn non_admin_cannot_delete_match() {
    let app = app();
    let admin = admin_token(&app).await;
    let id = create_match(&app, &admin, false).await;
    let (_, player) = token("player@club.test");
    let uri = format!("/api/v1/matches/{id}");

    let (status, body) = call(&app, Method::DELETE, &uri, Some(&player), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "unauthorized");
    let (status, _) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn private_location_is_hidden_everywhere_but_for_admins() {
    let app = app();
    let admin = admin_token(&app).await;
    let id = create_match(&app, &admin, true).await;
    let (_, player) = token("player@club.test");

    for uri in [
        format!("/api/v1/matches/{id}"),
        format!("/api/v1/matches/{id}/summary"),
        format!("/api/v1/matches/{id}/preview"),
        "/api/v1/matches".to_string(),
    ] {
        let (status, body) = call(&app, Method::GET, &uri, Some(&player), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.to_string().contains("Northfield"), "{uri} leaked");
    }

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/matches/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(body["location"], "Northfield Astro");

    let (_, preview) = call(
        &app,
        Method::GET,
        &format!("/api/v1/matches/{id}/preview"),
        Some(&admin),
        None,
    )
    .await;
    assert!(!preview.to_string().contains("Northfield"));
}

#[tokio::test]
async fn invalid_match_is_rejected_with_validation_code() {
    let app = app();
    let admin = admin_token(&app).await;
    let mut body = match_body(false);
    body["match_type"] = json!("training");

    let (status, res) = call(&app, Method::POST, "/api/v1/matches", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res["code"], "validation_error");
}

#[tokio::test]
async fn malformed_requests_get_the_tagged_error_body() {
    let app = app();
    let admin = admin_token(&app).await;
    let id = create_match(&app, &admin, false).await;
    let (_, player) = token("player@club.test");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/matches/{id}/signups"),
        Some(&player),
        Some(json!({"player_name": "No Team", "position": "cm"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("team"), "{body}");

    for uri in [
        format!("/api/v1/matches/{id}/lineup/red"),
        "/api/v1/matches/not-a-uuid".to_string(),
    ] {
        let (status, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["code"], "validation_error", "{uri}");
    }
}

#[tokio::test]
async fn player_can_register_and_move_own_signup() {
    let app = app();
    let admin = admin_token(&app).await;
    let id = create_match(&app, &admin, false).await;
    let (me, t) = token("keeper@club.test");

    let (status, player) = call(
        &app,
        Method::POST,
        "/api/v1/players/me",
        Some(&t),
        Some(json!({"display_name": "Keeper Kay", "preferred_position": "gk"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(player["id"], me.to_string());

    let uri = format!("/api/v1/matches/{id}/signups");
    for team in ["white", "black"] {
        let (status, _) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&t),
            Some(json!({"player_id": me, "team": team, "position": "gk"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, lineups) = call(
        &app,
        Method::GET,
        &format!("/api/v1/matches/{id}/lineups"),
        None,
        None,
    )
    .await;
    assert_eq!(lineups["white"].as_array().unwrap().len(), 0);
    assert_eq!(lineups["black"][0]["display_name"], "Keeper Kay");

    let (_, other) = token("other@club.test");
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("{uri}/{me}"),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, &format!("{uri}/{me}"), Some(&t), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, hits) = call(&app, Method::GET, "/api/v1/players/search?q=kay", None, None).await;
    assert_eq!(hits[0]["display_name"], "Keeper Kay");

    let (_, stats) = call(&app, Method::GET, "/api/v1/stats", None, None).await;
    assert_eq!(stats["upcoming_matches"], 1);
}
