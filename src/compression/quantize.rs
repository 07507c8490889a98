//! Logarithmic quantization of expression counts (lossy mode only).
//!
//! Counts are mapped onto `levels` logarithmically spaced representatives, so
//! small counts keep fine resolution while large ones are binned coarsely.
//! `quantize` folds reduction and reconstruction into one step: the value it
//! returns is already the representative that will be stored. `dequantize` is
//! the same reconstruction mapping applied again after decompression; the two
//! are intentionally asymmetric and observable as such in the stored codes.

#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    levels: u32,
    max_log: f64,
}

impl Quantizer {
    /// `levels` is the number of quantization levels, at least 2.
    pub fn new(levels: u32) -> Self {
        debug_assert!(levels >= 2);
        Self {
            levels,
            max_log: (levels as f64).log2(),
        }
    }

    /// Map a raw count to its stored representative. Zero is a fixed point.
    pub fn quantize(&self, value: u32) -> u32 {
        if value == 0 {
            return 0;
        }
        let steps = (self.levels - 1) as f64;
        let log_val = (value as f64 + 1.0).log2();
        let mut level = (log_val / self.max_log * steps).round();
        if level > steps {
            level = steps;
        }
        (2f64.powf(level * self.max_log / steps)).round() as u32 - 1
    }

    /// Reconstruction mapping applied to decoded values. Zero is a fixed
    /// point.
    pub fn dequantize(&self, quantized: u32) -> u32 {
        if quantized == 0 {
            return 0;
        }
        let steps = (self.levels - 1) as f64;
        (2f64.powf(quantized as f64 * self.max_log / steps)).round() as u32 - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_fixed_point() {
        let q = Quantizer::new(256);
        assert_eq!(q.quantize(0), 0);
        assert_eq!(q.dequantize(0), 0);
    }

    #[test]
    fn test_monotonic() {
        let q = Quantizer::new(256);
        let mut prev = 0;
        for value in 0..10_000 {
            let quantized = q.quantize(value);
            assert!(
                quantized >= prev,
                "quantize({}) = {} < quantize({}) = {}",
                value,
                quantized,
                value - 1,
                prev
            );
            prev = quantized;
        }
    }

    #[test]
    fn test_small_counts_survive() {
        // With 256 levels the low end of the scale is near-exact.
        let q = Quantizer::new(256);
        for value in 1..=8 {
            let quantized = q.quantize(value);
            assert!(
                (quantized as i64 - value as i64).abs() <= 1,
                "quantize({}) = {}",
                value,
                quantized
            );
        }
    }

    #[test]
    fn test_coarse_levels() {
        let q = Quantizer::new(2);
        assert_eq!(q.quantize(0), 0);
        assert_eq!(q.quantize(1), 1);
        // Everything collapses onto the single non-zero representative.
        assert_eq!(q.quantize(1), q.quantize(100));
    }

    #[test]
    fn test_quantize_bounded_error() {
        // Logarithmic binning: relative error stays small at 256 levels for
        // counts inside the representable range [0, levels - 1].
        let q = Quantizer::new(256);
        for value in [10u32, 50, 100, 200] {
            let quantized = q.quantize(value);
            let rel = (quantized as f64 - value as f64).abs() / value as f64;
            assert!(rel < 0.10, "value {} quantized to {}", value, quantized);
        }
    }

    #[test]
    fn test_saturates_at_top_level() {
        // The representative scale tops out at levels - 1.
        let q = Quantizer::new(256);
        assert_eq!(q.quantize(255), 255);
        assert_eq!(q.quantize(100_000), 255);
    }
}
