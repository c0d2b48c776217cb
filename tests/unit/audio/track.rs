use super::*;

fn track() -> AudioTrack {
    AudioTrack::new(
        vec![vec![0.0, 5.0], vec![2.0, 5.0], vec![4.0, 5.0]],
        30.0,
    )
    .unwrap()
}

#[test]
fn rows_and_timing() {
    let t = track();
    assert_eq!(t.num_frames(), 3);
    assert_eq!(t.feature_width(), 2);
    assert_eq!(t.frame(1), Some(&[2.0, 5.0][..]));
    assert_eq!(t.frame(3), None);
    assert!((t.duration() - 0.1).abs() < 1e-12);
}

#[test]
fn ragged_rows_are_rejected() {
    let err = AudioTrack::new(vec![vec![0.0, 1.0], vec![0.0]], 30.0).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn minmax_maps_columns_to_signed_unit_range() {
    let t = track().normalized(Normalization::MinMax);
    assert_eq!(t.frame(0), Some(&[-1.0, -1.0][..]));
    assert_eq!(t.frame(1), Some(&[0.0, -1.0][..]));
    assert_eq!(t.frame(2), Some(&[1.0, -1.0][..]));
}

#[test]
fn zscore_standardizes_and_keeps_constant_columns_finite() {
    let t = track().normalized(Normalization::ZScore);
    let col0: Vec<f32> = (0..3).map(|i| t.frame(i).unwrap()[0]).collect();
    assert!((col0[1]).abs() < 1e-6);
    assert!((col0[0] + col0[2]).abs() < 1e-6);
    assert!((col0[2] - 1.224_744_9).abs() < 1e-5);
    assert_eq!(t.frame(0).unwrap()[1], 0.0);
}

#[test]
fn scaled_multiplies_every_value() {
    let t = track().scaled(0.5);
    assert_eq!(t.frame(2), Some(&[2.0, 2.5][..]));
}

#[test]
fn silent_track_keeps_frame_count_with_zero_width() {
    let t = AudioTrack::silent(5, 0, 24.0).unwrap();
    assert_eq!(t.num_frames(), 5);
    assert_eq!(t.frame(4), Some(&[][..]));
}

#[test]
fn reads_feature_file() {
    let json =
        r#"{"features": [[0.1, 0.2], [0.3, 0.4]], "duration": 0.08, "fps": 25, "num_frames": 2}"#;
    let t = AudioTrack::from_reader(json.as_bytes()).unwrap();
    assert_eq!(t.num_frames(), 2);
    assert_eq!(t.fps(), 25.0);
    assert_eq!(t.duration(), 0.08);

    let bad = r#"{"features": [[0.1]], "duration": 1.0, "fps": 25, "num_frames": 3}"#;
    assert!(AudioTrack::from_reader(bad.as_bytes()).unwrap_err().is_config());
    assert!(matches!(
        AudioTrack::from_reader(&b"{}"[..]).unwrap_err(),
        VizError::Serde(_)
    ));
}

#[test]
fn normalization_parses_names() {
    assert_eq!("minmax".parse::<Normalization>().unwrap(), Normalization::MinMax);
    assert_eq!("Z-Score".parse::<Normalization>().unwrap(), Normalization::ZScore);
    assert_eq!("none".parse::<Normalization>().unwrap(), Normalization::None);
    assert!("l2".parse::<Normalization>().unwrap_err().is_config());
}

#[test]
fn featureless_rows_keep_their_frame_count() {
    let json = r#"{"features":[[],[],[],[],[]],"duration":0.5,"fps":10,"num_frames":5}"#;
    let t = AudioTrack::from_reader(json.as_bytes()).unwrap();
    assert_eq!(t.num_frames(), 5);
    assert_eq!(t.feature_width(), 0);
    assert_eq!(t.frame(4), Some(&[][..]));
    assert_eq!(t.frame(5), None);

    let silent = AudioTrack::silent(4, 0, 10.0).unwrap();
    assert_eq!(silent.num_frames(), 4);
    assert!((silent.duration() - 0.4).abs() < 1e-12);
}
