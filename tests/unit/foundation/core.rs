use super::*;

#[test]
fn resolution_rejects_zero_extent() {
    assert!(Resolution::new(0, 10).unwrap_err().is_config());
    assert!(Resolution::new(10, 0).unwrap_err().is_config());
    let r = Resolution::new(64, 48).unwrap();
    assert_eq!(r.pixel_count(), 64 * 48);
    assert_eq!(r.to_string(), "64x48");
}

#[test]
fn fps_validates_and_converts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    let fps = Fps::integer(30).unwrap();
    assert_eq!(fps.as_f64(), 30.0);
    assert!((fps.frames_to_secs(45) - 1.5).abs() < 1e-12);
}
