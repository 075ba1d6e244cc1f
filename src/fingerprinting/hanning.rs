//! Hann window applied to each 2048-sample analysis frame before the FFT.

/// Number of points in the analysis window.
pub const WINDOW_SIZE: usize = 2048;

/// Compute the 2048-point Hann window, H[n] = 0.5 * (1 - cos(2π n / 2047)).
pub fn hanning_window_multipliers() -> Vec<f32> {
    (0..WINDOW_SIZE)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / (WINDOW_SIZE - 1) as f64;
            (0.5 * (1.0 - phase.cos())) as f32
        })
        .collect()
}
