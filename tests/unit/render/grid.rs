use super::*;

#[test]
fn corners_hit_the_scale_exactly() {
    let grid = PixelGrid::new(Resolution::new(4, 3).unwrap(), 0.5).unwrap();
    assert_eq!(grid.len(), 12);
    assert_eq!(grid.coord(0), (-0.5, -0.5));
    assert_eq!(grid.coord(3), (0.5, -0.5));
    assert_eq!(grid.coord(8), (-0.5, 0.5));
    assert_eq!(grid.coord(11), (0.5, 0.5));
}

#[test]
fn x_varies_fastest() {
    let grid = PixelGrid::new(Resolution::new(3, 3).unwrap(), 1.0).unwrap();
    let row0: Vec<f32> = (0..3).map(|p| grid.coord(p).1).collect();
    assert_eq!(row0, vec![-1.0, -1.0, -1.0]);
    let col0: Vec<f32> = (0..3).map(|r| grid.coord(r * 3).0).collect();
    assert_eq!(col0, vec![-1.0, -1.0, -1.0]);
    assert_eq!(grid.coord(4), (0.0, 0.0));
}

#[test]
fn single_pixel_axis_sits_at_negative_scale() {
    let grid = PixelGrid::new(Resolution::new(1, 2).unwrap(), 0.5).unwrap();
    assert_eq!(grid.coord(0), (-0.5, -0.5));
    assert_eq!(grid.coord(1), (-0.5, 0.5));
}

#[test]
fn rejects_bad_scale() {
    let res = Resolution::new(4, 4).unwrap();
    assert!(PixelGrid::new(res, 0.0).unwrap_err().is_config());
    assert!(PixelGrid::new(res, f32::NAN).unwrap_err().is_config());
}
