use super::*;
use crate::state::canvas::{MAX_GRID_DIM, Snapshot};
use wire::PixelUpdate;

fn small_grid() -> GridSize {
    GridSize::new(4, 3)
}

#[test]
fn new_raster_is_background_sized_by_cell() {
    let raster = Raster::new(small_grid());
    assert_eq!(raster.image().dimensions(), (40, 30));
    assert_eq!(raster.cell_color(3, 2), Some(BACKGROUND));
}

#[test]
fn parse_hex_color_accepts_rrggbb_only() {
    assert_eq!(parse_hex_color("#FF4500"), Some(Rgba([0xFF, 0x45, 0x00, 0xFF])));
    assert_eq!(parse_hex_color("#ff4500"), Some(Rgba([0xFF, 0x45, 0x00, 0xFF])));
    assert_eq!(parse_hex_color("FF4500"), None);
    assert_eq!(parse_hex_color("#FFF"), None);
    assert_eq!(parse_hex_color("#GG0000"), None);
    assert_eq!(parse_hex_color("#ÿÿÿ"), None);
}

#[test]
fn paint_cell_fills_exactly_one_block() {
    let mut raster = Raster::new(small_grid());
    let before = raster.image().clone();

    assert!(raster.paint_cell(1, 2, "#000000"));

    let black = Rgba([0, 0, 0, 0xFF]);
    for (px, py, pixel) in raster.image().enumerate_pixels() {
        let inside = (10..20).contains(&px) && (20..30).contains(&py);
        if inside {
            assert_eq!(*pixel, black, "({px}, {py}) should be painted");
        } else {
            assert_eq!(pixel, before.get_pixel(px, py), "({px}, {py}) should be untouched");
        }
    }
}

#[test]
fn paint_cell_ignores_out_of_bounds_and_bad_colors() {
    let mut raster = Raster::new(small_grid());
    let before = raster.image().clone();
    assert!(!raster.paint_cell(4, 0, "#000000"));
    assert!(!raster.paint_cell(0, 0, "black"));
    assert_eq!(raster.image(), &before);
}

#[test]
fn repaint_clears_previous_cells() {
    let mut raster = Raster::new(small_grid());
    raster.paint_cell(0, 0, "#000000");

    let mut snapshot = Snapshot::new();
    snapshot.insert("2:1".to_owned(), crate::state::canvas::Cell { color: "#BE0039".to_owned(), player: "A".to_owned() });
    let canvas = CanvasState::from_snapshot(snapshot, small_grid());
    raster.repaint(&canvas);

    assert_eq!(raster.cell_color(0, 0), Some(BACKGROUND));
    assert_eq!(raster.cell_color(2, 1), Some(Rgba([0xBE, 0x00, 0x39, 0xFF])));
}

#[test]
fn repaint_matches_incremental_painting() {
    let grid = small_grid();
    let mut canvas = CanvasState::new();
    let mut incremental = Raster::new(grid);
    for record in ["0:0:#000000:A", "1:1:#FF4500:B", "0:0:#2450A4:C"] {
        let update = PixelUpdate::parse(record).expect("record");
        canvas.apply_update(&update, grid);
        incremental.paint_cell(update.x, update.y, &update.color);
    }

    let mut full = Raster::new(grid);
    full.repaint(&canvas);
    assert_eq!(full.image(), incremental.image());
}

#[test]
fn save_png_writes_file() {
    let path = std::env::temp_dir().join(format!("pixel-raster-test-{}.png", std::process::id()));
    let mut raster = Raster::new(small_grid());
    raster.paint_cell(0, 0, "#000000");
    raster.save_png(&path).expect("save png");

    let bytes = std::fs::read(&path).expect("read png");
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let _ = std::fs::remove_file(&path);
}

#[test]
fn oversized_grid_is_clamped_instead_of_overflowing() {
    let raster = Raster::new(GridSize::new(500_000_000, 2));
    assert_eq!(raster.grid(), GridSize::new(MAX_GRID_DIM, 2));
    assert_eq!(raster.image().dimensions(), (MAX_GRID_DIM * CELL_PX, 20));
    assert_eq!(raster.cell_color(MAX_GRID_DIM, 0), None);
}
