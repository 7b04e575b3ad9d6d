use super::*;

fn update(x: u32, y: u32, color: &str, player: &str) -> PixelUpdate {
    PixelUpdate { x, y, color: color.into(), player: player.into() }
}

#[test]
fn canvas_store_new_is_empty() {
    let store = CanvasStore::new();
    assert!(store.is_empty());
    assert!(store.snapshot().is_empty());
    assert!(store.history(0, 0, 10).is_empty());
}

#[test]
fn place_overwrites_cell_and_keys_snapshot() {
    let mut store = CanvasStore::new();
    store.place(&update(3, 4, "#FF4500", "alice"), 10);
    store.place(&update(3, 4, "#2450A4", "bob"), 10);

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(3, 4).unwrap().player, "bob");
    let snapshot = store.snapshot();
    assert_eq!(snapshot["3:4"], PixelEntry { color: "#2450A4".into(), player: "bob".into() });
}

#[test]
fn history_is_newest_first_and_limited() {
    let mut store = CanvasStore::new();
    for (i, player) in ["a", "b", "c"].into_iter().enumerate() {
        store.place(&update(1, 1, wire::PALETTE[i], player), 10);
    }

    let players: Vec<String> = store.history(1, 1, 10).into_iter().map(|e| e.player).collect();
    assert_eq!(players, vec!["c", "b", "a"]);
    assert_eq!(store.history(1, 1, 2).len(), 2);
}

#[test]
fn history_is_truncated_to_retention() {
    let mut store = CanvasStore::new();
    for player in ["a", "b", "c", "d"] {
        store.place(&update(0, 0, "#000000", player), 2);
    }
    let players: Vec<String> = store.history(0, 0, 10).into_iter().map(|e| e.player).collect();
    assert_eq!(players, vec!["d", "c"]);
}

#[test]
fn pixel_entry_serializes_as_color_and_player() {
    let json = serde_json::to_value(PixelEntry { color: "#FFFFFF".into(), player: "p".into() }).unwrap();
    assert_eq!(json, serde_json::json!({"color": "#FFFFFF", "player": "p"}));
}

#[tokio::test]
async fn commit_stores_and_broadcasts() {
    let state = test_helpers::test_app_state();
    let mut rx = state.updates.subscribe();

    state.commit(update(2, 3, "#FFD635", "alice")).await;

    assert_eq!(rx.recv().await.unwrap(), update(2, 3, "#FFD635", "alice"));
    assert_eq!(state.canvas.read().await.get(2, 3).unwrap().color, "#FFD635");
}

#[tokio::test]
async fn commit_without_subscribers_still_stores() {
    let state = test_helpers::test_app_state();
    state.commit(update(0, 0, "#000000", "alice")).await;
    assert_eq!(state.canvas.read().await.len(), 1);
}
