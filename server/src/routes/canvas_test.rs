use super::*;
use crate::state::test_helpers;
use wire::PixelUpdate;

fn update(x: u32, y: u32, color: &str, player: &str) -> PixelUpdate {
    PixelUpdate { x, y, color: color.into(), player: player.into() }
}

#[tokio::test]
async fn get_canvas_returns_keyed_cells() {
    let state = test_helpers::test_app_state();
    state.commit(update(3, 4, "#FF4500", "alice")).await;

    let Json(canvas) = get_canvas(State(state)).await;
    assert_eq!(canvas.len(), 1);
    assert_eq!(canvas["3:4"].player, "alice");
}

#[tokio::test]
async fn get_canvas_empty() {
    let Json(canvas) = get_canvas(State(test_helpers::test_app_state())).await;
    assert!(canvas.is_empty());
}

#[tokio::test]
async fn get_cooldown_reports_zero_then_remaining() {
    let state = test_helpers::test_app_state();
    let Json(free) = get_cooldown(State(state.clone()), Path("alice".into())).await;
    assert_eq!(free, [0]);

    state.cooldowns.try_start("alice").unwrap();
    let Json(active) = get_cooldown(State(state), Path("alice".into())).await;
    assert!((1..=9).contains(&active[0]), "remaining {}", active[0]);
}

#[tokio::test]
async fn get_pixel_found_and_missing() {
    let state = test_helpers::test_app_state();
    state.commit(update(1, 2, "#000000", "bob")).await;

    let Json(entry) = get_pixel(State(state.clone()), Path((1, 2))).await.unwrap();
    assert_eq!(entry.color, "#000000");

    let err = get_pixel(State(state), Path((2, 1))).await.unwrap_err();
    assert!(matches!(err, ApiError::PixelNotFound));
}

#[tokio::test]
async fn get_history_defaults_to_ten_newest_first() {
    let state = test_helpers::test_app_state();
    for i in 0..12 {
        state.commit(update(0, 0, "#FFFFFF", &format!("p{i}"))).await;
    }

    let Json(all) = get_history(State(state.clone()), Path((0, 0)), Query(HistoryParams::default())).await;
    assert_eq!(all.len(), DEFAULT_HISTORY_PAGE);
    assert_eq!(all[0].player, "p11");

    let Json(two) = get_history(State(state), Path((0, 0)), Query(HistoryParams { limit: Some(2) })).await;
    assert_eq!(two.iter().map(|e| e.player.as_str()).collect::<Vec<_>>(), vec!["p11", "p10"]);
}
