use super::*;

fn cfg(audio: Option<PathBuf>) -> SinkConfig {
    SinkConfig {
        width: 640,
        height: 360,
        fps: Fps::integer(30).unwrap(),
        expected_frames: 10,
        audio,
    }
}

#[test]
fn video_only_args_stream_rgb24() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out/video.mp4"));
    let args = sink.command_args(&cfg(None));
    let joined = args.join(" ");
    assert!(args[0] == "-y");
    assert!(joined.contains("-f rawvideo -pix_fmt rgb24 -s 640x360 -r 30/1 -i pipe:0"));
    assert!(joined.contains("-an"));
    assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p -crf 18"));
    assert!(!joined.contains("-shortest"));
    assert_eq!(args.last().map(String::as_str), Some("out/video.mp4"));
}

#[test]
fn audio_is_muxed_and_shortest_applies() {
    let sink = FfmpegSink::new(FfmpegSinkOpts {
        overwrite: false,
        ..FfmpegSinkOpts::new("v.mp4")
    });
    let args = sink.command_args(&cfg(Some(PathBuf::from("song.mp3"))));
    let joined = args.join(" ");
    assert!(args[0] == "-n");
    assert!(joined.contains("-i pipe:0 -i song.mp3 -map 0:v:0 -map 1:a:0"));
    assert!(joined.contains("-c:a aac"));
    assert!(joined.contains("-shortest"));
    assert!(!joined.contains("-an"));
}

#[test]
fn odd_dimensions_are_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(
        std::env::temp_dir().join("cppnviz-odd.mp4"),
    ));
    let mut c = cfg(None);
    c.width = 641;
    assert!(sink.begin(c).unwrap_err().is_config());
}

#[test]
fn push_before_begin_fails() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("x.mp4"));
    let frame = RenderedFrame::new(2, 2, vec![0; 12]).unwrap();
    assert!(sink.push_frame(FrameIndex(0), &frame).is_err());
}
