use super::*;

use crate::field::pattern::{Architecture, FieldOptions};

#[test]
fn matches_sequential_forward() {
    let arch = Architecture::new(5, 6, 3).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(21)).unwrap();

    let rows = 1000;
    let input: Vec<f32> = (0..rows * 5).map(|i| ((i % 17) as f32 - 8.0) * 0.1).collect();
    let mut expected = vec![0.0; rows * 3];
    field.forward(&input, 5, &mut expected).unwrap();

    let mut backend = CpuBackend::new();
    let mut got = vec![0.0; rows * 3];
    backend.evaluate(&field, &input, &mut got).unwrap();
    assert_eq!(got, expected);
    assert_eq!(backend.kind(), BackendKind::Cpu);
}

#[test]
fn rejects_wrong_output_length() {
    let arch = Architecture::new(5, 6, 1).unwrap();
    let field = PatternField::new(arch, &FieldOptions::cpu_seeded(1)).unwrap();
    let input = vec![0.0; 10];
    let mut out = vec![0.0; 5];
    assert!(CpuBackend::new()
        .evaluate(&field, &input, &mut out)
        .unwrap_err()
        .is_config());
}
