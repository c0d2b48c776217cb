use super::*;

use crate::field::pattern::{Architecture, FieldOptions};

fn renderer(width: u32, height: u32, batch_size: Option<usize>) -> FrameRenderer {
    let arch = Architecture::new(12, 8, 2).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(42)).unwrap();
    FrameRenderer::new(
        field,
        Resolution::new(width, height).unwrap(),
        RendererOpts {
            batch_size,
            ..RendererOpts::default()
        },
    )
    .unwrap()
}

#[test]
fn frame_has_requested_shape() {
    let mut r = renderer(64, 48, None);
    let frame = r.render_frame(0.5, &[0.0; 9]).unwrap();
    assert_eq!(frame.shape(), (48, 64, 3));
    assert_eq!(frame.as_raw().len(), 64 * 48 * 3);
}

#[test]
fn uneven_batches_cover_every_pixel() {
    let mut whole = renderer(10, 7, Some(70));
    let mut uneven = renderer(10, 7, Some(9));
    assert_eq!(uneven.num_batches(), 8);
    let features = [0.3, -0.1, 0.0, 0.2, 0.5, -0.4, 0.1, 0.0, 0.9];
    assert_eq!(
        whole.render_frame(0.25, &features).unwrap(),
        uneven.render_frame(0.25, &features).unwrap()
    );
}

#[test]
fn batch_larger_than_frame_uses_frame_sized_buffer() {
    let r = renderer(4, 4, Some(1_000));
    assert_eq!(r.batch_size(), 1_000);
    assert_eq!(r.num_batches(), 1);
}

#[test]
fn feature_width_mismatch_is_config_error() {
    let mut r = renderer(8, 8, None);
    assert!(r.render_frame(0.0, &[0.0; 8]).unwrap_err().is_config());
    assert!(r.render_frame(0.0, &[0.0; 10]).unwrap_err().is_config());
    assert!(r.render_frame(f32::NAN, &[0.0; 9]).unwrap_err().is_config());
}

#[test]
fn time_changes_the_image() {
    let mut r = renderer(16, 16, None);
    let a = r.render_frame(0.0, &[0.0; 9]).unwrap();
    let b = r.render_frame(1.0, &[0.0; 9]).unwrap();
    assert_ne!(a, b);
}

#[test]
fn memory_estimate_reflects_configuration() {
    let r = renderer(64, 64, Some(1024));
    let est = r.estimate_memory();
    assert_eq!(est.batch_rows, 1024);
    assert!((est.frame_mib - (64.0 * 64.0 * 3.0) / (1024.0 * 1024.0)).abs() < 1e-12);
}

#[test]
fn rejects_bad_coord_scale() {
    let arch = Architecture::new(12, 8, 2).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(1)).unwrap();
    let err = FrameRenderer::new(
        field,
        Resolution::new(8, 8).unwrap(),
        RendererOpts {
            coord_scale: -1.0,
            ..RendererOpts::default()
        },
    )
    .unwrap_err();
    assert!(err.is_config());
}
