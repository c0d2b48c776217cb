use super::*;

use crate::encode::sink::InMemorySink;
use crate::field::pattern::{Architecture, FieldOptions};
use crate::field::store::WeightStore;
use crate::device::DeviceRequest;

fn config() -> RenderConfig {
    RenderConfig {
        width: 16,
        height: 12,
        layers: 2,
        hidden_dim: 8,
        device: DeviceRequest::Cpu,
        seed: Some(17),
        ..RenderConfig::default()
    }
}

fn track(frames: usize) -> AudioTrack {
    let values = (0..frames * 9).map(|i| (i as f32 * 0.11).cos()).collect();
    AudioTrack::from_flat(values, 9, 30.0).unwrap()
}

#[test]
fn streams_every_frame_into_the_sink() {
    let mut session = RenderSession::new(config(), track(5), None).unwrap();
    let mut sink = InMemorySink::new();
    let summary = session.render_to_sink(&mut sink, None).unwrap();

    assert_eq!(summary.stats.frames_rendered, 5);
    assert!(summary.variation.is_some());
    assert!(sink.is_finished());
    assert_eq!(sink.config().map(|c| c.expected_frames), Some(5));
    let indices: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(sink.frames()[0].1.shape(), (12, 16, 3));
}

#[test]
fn single_frame_matches_streamed_frame() {
    let mut a = RenderSession::new(config(), track(4), None).unwrap();
    let mut sink = InMemorySink::new();
    a.render_to_sink(&mut sink, None).unwrap();

    let mut b = RenderSession::new(config(), track(4), None).unwrap();
    assert_eq!(b.render_frame(2).unwrap(), sink.frames()[2].1);
    assert!(b.render_frame(4).unwrap_err().is_config());
}

#[test]
fn snapshot_metadata_overrides_config_architecture() {
    let arch = Architecture::new(12, 6, 3).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(3)).unwrap();
    let mut buf = Vec::new();
    WeightStore::to_writer(&field, &Default::default(), &mut buf).unwrap();
    let ckpt = Checkpoint::from_reader(buf.as_slice()).unwrap();

    let session = RenderSession::new(config(), track(2), Some(ckpt)).unwrap();
    assert_eq!(session.renderer().field().architecture(), arch);
}

#[test]
fn feature_width_mismatch_is_fatal() {
    let arch = Architecture::new(10, 6, 2).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(3)).unwrap();
    let err = RenderSession::with_field(config(), track(2), field).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn rejected_sequence_leaves_sink_untouched() {
    let mut session = RenderSession::new(config(), track(3), None).unwrap();
    session.config.evolve_rate = 0.5;
    session.config.evolve_every = 0;
    let mut sink = InMemorySink::new();

    assert!(session.render_to_sink(&mut sink, None).unwrap_err().is_config());
    assert!(sink.config().is_none());
    assert!(!sink.is_finished());
    assert!(sink.frames().is_empty());
}
