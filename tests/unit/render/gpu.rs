use super::*;

#[test]
fn shader_bakes_architecture_constants() {
    let arch = Architecture::new(12, 8, 2).unwrap();
    let src = shader_source(&arch, Precision::Full);
    assert!(src.contains("const INPUT_DIM: u32 = 12u;"));
    assert!(src.contains("const HIDDEN_DIM: u32 = 8u;"));
    assert!(src.contains("const NUM_LAYERS: u32 = 2u;"));
    assert!(src.contains("alias Scalar = f32;"));
    assert!(!src.contains("enable f16"));
    assert!(src.contains("@workgroup_size(64)"));
}

#[test]
fn reduced_precision_enables_f16() {
    let arch = Architecture::new(12, 8, 2).unwrap();
    let src = shader_source(&arch, Precision::Reduced);
    assert!(src.starts_with("enable f16;"));
    assert!(src.contains("alias Scalar = f16;"));
}
