/// Quantise a unit-range color sample to 8 bits.
///
/// Values are clamped to `[0, 1]` and truncated after scaling, so `1.0` maps to `255`.
/// NaN maps to `0`.
#[inline]
pub fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// Logistic sigmoid.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Mean and population standard deviation of a byte slice.
pub fn mean_std_u8(values: impl Iterator<Item = u8> + Clone) -> (f64, f64) {
    let mut n = 0u64;
    let mut sum = 0f64;
    for v in values.clone() {
        sum += f64::from(v);
        n += 1;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let mut var = 0f64;
    for v in values {
        let d = f64::from(v) - mean;
        var += d * d;
    }
    (mean, (var / n as f64).sqrt())
}

/// Bytes to mebibytes.
pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// `n` evenly spaced samples over `[start, stop]`, computed in double precision.
///
/// The last sample is exactly `stop`; a single sample is `start`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start as f32],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f32> = (0..n).map(|i| (start + step * i as f64) as f32).collect();
            out[n - 1] = stop as f32;
            out
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
