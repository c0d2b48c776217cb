use super::*;

#[test]
fn cpu_request_never_probes() {
    let dev = Device::select(DeviceRequest::Cpu).unwrap();
    assert_eq!(dev.selection(), &DeviceSelection::GeneralPurpose);
    assert!(!dev.is_accelerated());
    assert!(dev.fallback_reason().is_none());
    assert_eq!(dev.label(), "cpu");
}

#[test]
fn gpu_request_always_resolves() {
    // Either an adapter is found or the request degrades to the cpu; it never errors.
    let dev = Device::select(DeviceRequest::Gpu).unwrap();
    if !dev.is_accelerated() {
        assert!(dev.fallback_reason().is_some());
        assert!(!dev.supports_reduced_precision());
    }
}

#[cfg(not(feature = "gpu"))]
#[test]
fn strict_gpu_request_fails_without_accelerator_support() {
    let err = Device::select(DeviceRequest::GpuStrict).unwrap_err();
    assert!(matches!(err, VizError::Device(_)));
}

#[test]
fn requests_parse_from_cli_strings() {
    assert_eq!("auto".parse::<DeviceRequest>().unwrap(), DeviceRequest::Auto);
    assert_eq!("CUDA".parse::<DeviceRequest>().unwrap(), DeviceRequest::Gpu);
    assert_eq!(
        "gpu-strict".parse::<DeviceRequest>().unwrap(),
        DeviceRequest::GpuStrict
    );
    assert!("tpu".parse::<DeviceRequest>().is_err());

    assert_eq!("fp16".parse::<Precision>().unwrap(), Precision::Reduced);
    assert_eq!("full".parse::<Precision>().unwrap(), Precision::Full);
    assert!("bf16".parse::<Precision>().is_err());
}

#[test]
fn requests_round_trip_through_json_names() {
    let json = serde_json::to_string(&DeviceRequest::GpuStrict).unwrap();
    assert_eq!(json, "\"gpu-strict\"");
    let p: Precision = serde_json::from_str("\"full\"").unwrap();
    assert_eq!(p, Precision::Full);
}
