use super::*;
use crate::config::ServerConfig;
use crate::state::test_helpers;
use axum::http::StatusCode;
use axum::response::IntoResponse;

fn params(x: i64, y: i64, color: &str, player: &str) -> PlaceParams {
    PlaceParams { x, y, color: color.into(), player: player.into() }
}

fn jar_for(state: &AppState, username: &str) -> CookieJar {
    CookieJar::new().add(Cookie::new(session::COOKIE_NAME, test_helpers::token_for(state, username)))
}

async fn place(state: &AppState, jar: CookieJar, params: PlaceParams) -> Result<PlaceResponse, ApiError> {
    set_pixel(State(state.clone()), jar, Query(params)).await.map(|Json(body)| body)
}

// =============================================================================
// accepted
// =============================================================================

#[tokio::test]
async fn accepted_pixel_is_stored_broadcast_and_acknowledged() {
    let state = test_helpers::test_app_state();
    let mut rx = state.updates.subscribe();

    let body = place(&state, jar_for(&state, "alice"), params(3, 4, "#FF4500", "alice")).await.unwrap();

    assert_eq!(
        body,
        PlaceResponse {
            message: "Pixel gesetzt".into(),
            x: 3,
            y: 4,
            color: "#FF4500".into(),
            player: "alice".into()
        }
    );
    assert_eq!(rx.recv().await.unwrap().to_string(), "3:4:#FF4500:alice");
    assert_eq!(state.canvas.read().await.get(3, 4).unwrap().player, "alice");
    assert!(state.cooldowns.remaining("alice") > 0);
    assert_eq!(state.cooldowns.active(), 1);
}

// =============================================================================
// refused
// =============================================================================

#[tokio::test]
async fn missing_cookie_is_unauthorized() {
    let state = test_helpers::test_app_state();
    let err = place(&state, CookieJar::new(), params(0, 0, "#000000", "alice")).await.unwrap_err();
    assert!(matches!(err, ApiError::MissingSession));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_cookie_is_unauthorized() {
    let state = test_helpers::test_app_state();
    let other = session::SessionKey::from_secret("other-secret").unwrap();
    let session = session::Session::start("alice", session::now_ms(), session::DEFAULT_SESSION_TTL).unwrap();
    let jar = CookieJar::new().add(Cookie::new(session::COOKIE_NAME, other.issue(&session).unwrap()));

    let err = place(&state, jar, params(0, 0, "#000000", "alice")).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidSession));
}

#[tokio::test]
async fn player_mismatch_is_unauthorized() {
    let state = test_helpers::test_app_state();
    let err = place(&state, jar_for(&state, "alice"), params(0, 0, "#000000", "bob")).await.unwrap_err();
    assert!(matches!(err, ApiError::PlayerMismatch));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn color_outside_palette_is_bad_request() {
    let state = test_helpers::test_app_state();
    for color in ["#123456", "#ff4500", "red"] {
        let err = place(&state, jar_for(&state, "alice"), params(0, 0, color, "alice")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidColor), "{color}");
    }
    assert_eq!(state.cooldowns.remaining("alice"), 0);
}

#[tokio::test]
async fn coordinates_off_grid_are_bad_request() {
    let state = test_helpers::test_app_state_with(ServerConfig { grid_width: 10, grid_height: 10, ..ServerConfig::default() });
    for (x, y) in [(-1, 0), (0, -1), (10, 0), (0, 10)] {
        let err = place(&state, jar_for(&state, "alice"), params(x, y, "#000000", "alice")).await.unwrap_err();
        assert!(matches!(err, ApiError::OutOfBounds), "({x}, {y})");
    }
    assert!(state.canvas.read().await.is_empty());
}

#[tokio::test]
async fn second_placement_within_cooldown_is_too_many_requests() {
    let state = test_helpers::test_app_state();
    place(&state, jar_for(&state, "alice"), params(0, 0, "#000000", "alice")).await.unwrap();

    let err = place(&state, jar_for(&state, "alice"), params(1, 1, "#000000", "alice")).await.unwrap_err();
    assert!(matches!(err, ApiError::Cooldown { remaining } if (1..=9).contains(&remaining)));
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(err.to_string().starts_with("Bitte warte "));
    assert!(state.canvas.read().await.get(1, 1).is_none());
}

#[tokio::test]
async fn error_body_carries_detail() {
    let response = ApiError::Cooldown { remaining: 4 }.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!({"detail": "Bitte warte 4 Sekunden."}));
}
