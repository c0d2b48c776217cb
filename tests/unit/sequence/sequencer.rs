use super::*;

use crate::field::pattern::{Architecture, FieldOptions, PatternField};
use crate::foundation::core::Resolution;
use crate::render::renderer::RendererOpts;

fn renderer(seed: u64) -> FrameRenderer {
    let arch = Architecture::new(5, 6, 2).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(seed)).unwrap();
    FrameRenderer::new(field, Resolution::new(8, 8).unwrap(), RendererOpts::default()).unwrap()
}

fn track(frames: usize) -> AudioTrack {
    let values = (0..frames * 2).map(|i| (i as f32 * 0.37).sin()).collect();
    AudioTrack::from_flat(values, 2, 30.0).unwrap()
}

#[test]
fn frame_time_spans_unit_interval() {
    assert_eq!(FrameSequence::frame_time(0, 1), 0.0);
    assert_eq!(FrameSequence::frame_time(0, 5), 0.0);
    assert_eq!(FrameSequence::frame_time(2, 5), 0.5);
    assert_eq!(FrameSequence::frame_time(4, 5), 1.0);
}

#[test]
fn yields_exactly_num_frames_matching_single_renders() {
    let t = track(4);
    let mut seq_r = renderer(3);
    let frames: Vec<RenderedFrame> = seq_r
        .render_sequence(&t, SequenceOpts::default())
        .unwrap()
        .collect::<VizResult<_>>()
        .unwrap();
    assert_eq!(frames.len(), 4);

    let mut single = renderer(3);
    for (i, frame) in frames.iter().enumerate() {
        let time = FrameSequence::frame_time(i, 4);
        let expected = single.render_frame(time, t.frame(i).unwrap()).unwrap();
        assert_eq!(frame, &expected, "frame {i}");
    }
}

#[test]
fn evolution_starts_at_the_period() {
    let t = track(25);
    let mut r = renderer(9);
    let mut seq = r
        .render_sequence(
            &t,
            SequenceOpts {
                evolve_rate: 0.05,
                ..SequenceOpts::default()
            },
        )
        .unwrap();
    for _ in 0..10 {
        seq.next().unwrap().unwrap();
    }
    assert_eq!(seq.stats().mutations_applied, 0);
    seq.next().unwrap().unwrap();
    assert_eq!(seq.stats().mutations_applied, 1);
    for frame in seq.by_ref() {
        frame.unwrap();
    }
    assert_eq!(seq.stats().mutations_applied, 2);
    assert_eq!(seq.stats().frames_rendered, 25);
    assert!(seq.variation_report().is_some());
    assert_eq!(seq.stats().cache_releases, 0);
}

#[test]
fn zero_rate_never_mutates() {
    let t = track(30);
    let mut r = renderer(9);
    let generation = r.field().generation();
    let mut seq = r.render_sequence(&t, SequenceOpts::default()).unwrap();
    assert_eq!(seq.by_ref().count(), 30);
    assert_eq!(seq.stats().mutations_applied, 0);
    drop(seq);
    assert_eq!(r.field().generation(), generation);
}

#[test]
fn track_width_mismatch_fails_up_front() {
    let t = AudioTrack::from_flat(vec![0.0; 9], 3, 30.0).unwrap();
    let mut r = renderer(1);
    assert!(r
        .render_sequence(&t, SequenceOpts::default())
        .unwrap_err()
        .is_config());
}

#[test]
fn zero_period_with_evolution_is_rejected() {
    let t = track(3);
    let mut r = renderer(1);
    let opts = SequenceOpts {
        evolve_rate: 0.1,
        evolve_every: 0,
        ..SequenceOpts::default()
    };
    assert!(r.render_sequence(&t, opts).unwrap_err().is_config());
}

#[test]
fn empty_track_yields_nothing() {
    let t = AudioTrack::from_flat(Vec::new(), 2, 30.0).unwrap();
    let mut r = renderer(1);
    let mut seq = r.render_sequence(&t, SequenceOpts::default()).unwrap();
    assert!(seq.next().is_none());
    assert!(seq.variation_report().is_none());
}

#[test]
fn debug_output_reports_progress() {
    let t = track(3);
    let mut r = renderer(2);
    let mut seq = r.render_sequence(&t, SequenceOpts::default()).unwrap();
    assert!(seq.next().unwrap().is_ok());
    let text = format!("{seq:?}");
    assert!(text.contains("FrameSequence"));
    assert!(text.contains("frames_rendered: 1"));
}
