use super::*;

use crate::foundation::core::Fps;

#[test]
fn writes_numbered_frames() {
    let dir = std::env::temp_dir().join(format!("cppnviz-png-{}", std::process::id()));
    let mut sink = PngSequenceSink::new(&dir);
    sink.begin(SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::integer(24).unwrap(),
        expected_frames: 2,
        audio: None,
    })
    .unwrap();

    let frame = RenderedFrame::new(2, 2, vec![7; 12]).unwrap();
    sink.push_frame(FrameIndex(0), &frame).unwrap();
    sink.push_frame(FrameIndex(1), &frame).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &frame).is_err());
    sink.end().unwrap();

    assert_eq!(sink.written(), 2);
    assert!(dir.join("frame_00000.png").is_file());
    assert!(dir.join("frame_00001.png").is_file());
    let _ = std::fs::remove_dir_all(&dir);
}
