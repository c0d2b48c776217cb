use super::*;

fn field(seed: u64) -> PatternField {
    let arch = Architecture::new(12, 8, 2).unwrap();
    PatternField::new(arch, &FieldOptions::cpu_seeded(seed)).unwrap()
}

#[test]
fn parameter_count_matches_analytic_formula() {
    let f = field(1);
    // (12+1)*8 + (8+1)*8 + (8+1)*3
    assert_eq!(f.count_parameters(), 104 + 72 + 27);
    assert_eq!(f.architecture().parameter_count(), f.count_parameters());

    let deep = Architecture::new(12, 256, 10).unwrap();
    assert_eq!(
        deep.parameter_count(),
        13 * 256 + 9 * 257 * 256 + 257 * 3
    );
}

#[test]
fn construction_rejects_non_positive_dimensions() {
    assert!(Architecture::new(12, 0, 2).unwrap_err().is_config());
    assert!(Architecture::new(12, 8, 0).unwrap_err().is_config());
    assert!(Architecture::new(0, 8, 2).unwrap_err().is_config());
    assert!(Architecture::new(2, 8, 2).unwrap_err().is_config());

    let bad = Architecture {
        input_dim: 12,
        hidden_dim: 8,
        num_layers: 0,
    };
    assert!(PatternField::new(bad, &FieldOptions::cpu_seeded(0)).is_err());
}

#[test]
fn layer_shapes_follow_input_hidden_output_chain() {
    let arch = Architecture::new(5, 4, 3).unwrap();
    assert_eq!(arch.layer_shapes(), vec![(4, 5), (4, 4), (4, 4), (3, 4)]);
    assert_eq!(arch.feature_width(), 2);
    assert_eq!(Architecture::for_features(9, 8, 2).unwrap().input_dim, 12);
}

#[test]
fn initialisation_uses_scaled_xavier_bounds_and_zero_bias() {
    let f = field(3);
    let hidden_bound = HIDDEN_GAIN * (6.0f32 / (12 + 8) as f32).sqrt();
    for w in f.hidden_layers()[0].weight() {
        assert!(w.abs() <= hidden_bound);
    }
    let out_bound = OUTPUT_GAIN * (6.0f32 / (8 + 3) as f32).sqrt();
    for w in f.output_layer().weight() {
        assert!(w.abs() <= out_bound);
    }
    for layer in f.hidden_layers().iter().chain(std::iter::once(f.output_layer())) {
        assert!(layer.bias().iter().all(|b| *b == 0.0));
    }
}

#[test]
fn seeded_construction_is_reproducible() {
    assert_eq!(field(7).flatten_parameters(), field(7).flatten_parameters());
    assert_ne!(field(7).flatten_parameters(), field(8).flatten_parameters());
}

#[test]
fn forward_outputs_unit_range_colors() {
    let f = field(11);
    let rows = 32;
    let input: Vec<f32> = (0..rows * 12).map(|i| ((i as f32) * 0.37).sin() * 3.0).collect();
    let mut out = vec![0.0; rows * 3];
    f.forward(&input, 12, &mut out).unwrap();
    assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn forward_rejects_mismatched_width() {
    let f = field(11);
    let input = vec![0.0; 4 * 11];
    let mut out = vec![0.0; 4 * 3];
    assert!(f.forward(&input, 11, &mut out).unwrap_err().is_config());

    let input = vec![0.0; 4 * 12];
    let mut short = vec![0.0; 3];
    assert!(f.forward(&input, 12, &mut short).unwrap_err().is_config());
}

#[test]
fn forward_row_matches_batch_forward() {
    let f = field(5);
    let input: Vec<f32> = (0..3 * 12).map(|i| i as f32 * 0.01).collect();
    let mut batch = vec![0.0; 9];
    f.forward(&input, 12, &mut batch).unwrap();

    let mut scratch = ForwardScratch::new(&f.architecture());
    let mut row = [0.0f32; 3];
    f.forward_row(&input[12..24], &mut scratch, &mut row);
    assert_eq!(&batch[3..6], &row);
}

#[test]
fn evolve_perturbs_values_and_bumps_generation() {
    let mut f = field(9);
    let before = f.flatten_parameters();
    f.evolve_weights(0.01);
    let after = f.flatten_parameters();
    assert_eq!(before.len(), after.len());
    assert_ne!(before, after);
    assert_eq!(f.generation(), 1);

    let max_delta = before
        .iter()
        .zip(&after)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(max_delta < 0.1, "noise should be on the order of the rate");

    f.evolve_weights(0.0);
    assert_eq!(f.generation(), 1);
}

#[test]
fn evolution_stream_is_seeded() {
    let mut a = field(9);
    let mut b = field(9);
    a.evolve_weights(0.05);
    b.evolve_weights(0.05);
    assert_eq!(a.flatten_parameters(), b.flatten_parameters());

    let mut c = field(9);
    c.reseed(1234);
    c.evolve_weights(0.05);
    assert_ne!(a.flatten_parameters(), c.flatten_parameters());
}

#[test]
fn reduced_precision_is_dropped_off_accelerator() {
    let arch = Architecture::new(12, 8, 2).unwrap();
    let opts = FieldOptions {
        device: DeviceRequest::Cpu,
        precision: Precision::Reduced,
        gradient_tuning: false,
        seed: Some(1),
    };
    let f = PatternField::new(arch, &opts).unwrap();
    assert_eq!(f.precision(), Precision::Full);
}

#[test]
fn gradient_tuning_forces_full_precision() {
    let arch = Architecture::new(12, 8, 2).unwrap();
    let opts = FieldOptions {
        device: DeviceRequest::Auto,
        precision: Precision::Reduced,
        gradient_tuning: true,
        seed: Some(1),
    };
    let f = PatternField::new(arch, &opts).unwrap();
    assert_eq!(f.precision(), Precision::Full);
}
