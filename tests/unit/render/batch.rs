use super::*;

use crate::foundation::core::Resolution;

fn arch() -> Architecture {
    Architecture::new(12, 8, 2).unwrap()
}

#[test]
fn fill_lays_out_columns() {
    let grid = PixelGrid::new(Resolution::new(2, 2).unwrap(), 0.5).unwrap();
    let mut buf = BatchBuffer::new(5, 3);
    let rows = buf.fill(&grid, 1, 3, 0.75, &[1.0, -0.5], 3.0).to_vec();

    assert_eq!(rows.len(), 15);
    assert_eq!(&rows[0..5], &[0.5, -0.5, 0.5, 3.0, -1.5]);
    assert_eq!(&rows[5..10], &[-0.5, 0.5, 0.5, 3.0, -1.5]);
    assert_eq!(&rows[10..15], &[0.5, 0.5, 0.5, 3.0, -1.5]);
}

#[test]
fn time_maps_unit_interval_to_signed() {
    let grid = PixelGrid::new(Resolution::new(1, 1).unwrap(), 0.5).unwrap();
    let mut buf = BatchBuffer::new(3, 1);
    assert_eq!(buf.fill(&grid, 0, 1, 0.0, &[], 3.0)[2], -1.0);
    assert_eq!(buf.fill(&grid, 0, 1, 1.0, &[], 3.0)[2], 1.0);
}

#[test]
fn explicit_batch_size_is_honoured() {
    let cpu = Device::cpu();
    assert_eq!(
        resolve_batch_size(&cpu, &arch(), Some(7), 4096).unwrap(),
        7
    );
    assert!(
        resolve_batch_size(&cpu, &arch(), Some(0), 4096)
            .unwrap_err()
            .is_config()
    );
}

#[test]
fn auto_batch_on_cpu_is_bounded() {
    let cpu = Device::cpu();
    let small = resolve_batch_size(&cpu, &arch(), None, 4096).unwrap();
    assert!((1..=4096).contains(&small));

    let big = resolve_batch_size(&cpu, &arch(), None, 1920 * 1080).unwrap();
    assert!((1..=CPU_BATCH).contains(&big));
}

#[test]
fn accelerator_rows_fit_f32_buffers_in_binding_limit() {
    let wide = Architecture::new(50, 8, 2).unwrap();
    assert_eq!(bound_row_bytes(&wide), 212);
    assert_eq!(bound_row_bytes(&arch()), 60);

    let budget = 134_217_728u64;
    let rows = accelerator_rows(&wide, Some(budget), usize::MAX);
    assert_eq!(rows, 633_102);
    assert!((rows * wide.input_dim * 4) as u64 <= budget);

    assert_eq!(accelerator_rows(&wide, None, 10), 10);
    assert_eq!(accelerator_rows(&wide, None, usize::MAX), ACCEL_BATCH);
}

#[test]
fn memory_estimate_sums_batch_and_model() {
    let est = MemoryEstimate::compute(&arch(), Precision::Full, 1024, 64 * 64);
    // 12 inputs * 4 bytes + 3 outputs * 4 bytes per row
    assert!((est.batch_mib - (1024.0 * 60.0) / (1024.0 * 1024.0)).abs() < 1e-12);
    assert!((est.model_mib - (203.0 * 4.0) / (1024.0 * 1024.0)).abs() < 1e-12);
    assert!((est.frame_mib - (4096.0 * 3.0) / (1024.0 * 1024.0)).abs() < 1e-12);
    assert_eq!(est.total_per_frame_mib, est.batch_mib + est.model_mib);

    let half = MemoryEstimate::compute(&arch(), Precision::Reduced, 1024, 64 * 64);
    assert!(half.batch_mib < est.batch_mib);
}
