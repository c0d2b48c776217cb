use super::*;

#[test]
fn pixel_indexing_is_row_major() {
    let data: Vec<u8> = (0..18).collect();
    let frame = RenderedFrame::new(3, 2, data).unwrap();
    assert_eq!(frame.shape(), (2, 3, 3));
    assert_eq!(frame.pixel(0, 0), Some([0, 1, 2]));
    assert_eq!(frame.pixel(2, 0), Some([6, 7, 8]));
    assert_eq!(frame.pixel(0, 1), Some([9, 10, 11]));
    assert_eq!(frame.pixel(3, 0), None);
}

#[test]
fn rejects_wrong_buffer_length() {
    assert!(RenderedFrame::new(2, 2, vec![0; 11]).unwrap_err().is_config());
}

#[test]
fn png_round_trips_through_image() {
    let dir = std::env::temp_dir().join(format!("cppnviz-frame-{}", std::process::id()));
    let path = dir.join("f.png");
    let frame = RenderedFrame::new(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
    frame.save_png(&path).unwrap();

    let img = image::open(&path).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (2, 1));
    assert_eq!(img.as_raw().as_slice(), frame.as_raw());
    let _ = std::fs::remove_dir_all(&dir);
}
