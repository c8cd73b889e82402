use super::DISPLAY_BAND;
use std::fmt;

/// A power of ten multiplier, kept as its exponent so that
/// the value and its text are exact: 10^2 is "100", 10^-2 is "0.01".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFactor {
    pub exponent: i32,
}

impl ScaleFactor {
    pub const ONE: ScaleFactor = ScaleFactor { exponent: 0 };

    /// The multiplier as f64.
    /// Built by repeated multiplication rather than powi,
    /// so the reciprocal is computed from an exact integer magnitude.
    pub fn value(&self) -> f64 {
        let mut magnitude = 1f64;
        for _ in 0..self.exponent.unsigned_abs() {
            magnitude *= 10.;
        }
        if self.exponent >= 0 {
            magnitude
        } else {
            1. / magnitude
        }
    }

    pub fn is_integer(&self) -> bool {
        self.exponent >= 0
    }
}

/// Integral factors print without a decimal point.
impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_integer() {
            write!(f, "1{}", "0".repeat(self.exponent as usize))
        } else {
            write!(f, "{}", self.value())
        }
    }
}

/// Choose the power of ten that brings a series maximum within the display band,
/// i.e. the largest factor f such that f * max <= DISPLAY_BAND.
/// A zero (or non-finite) maximum gets a factor of 1.
/// The factor never exceeds 10^308, so tiny (subnormal) maxima
/// get the largest finite power of ten instead of infinity.
pub fn scale(max: f64) -> ScaleFactor {
    if max == 0. || !max.is_finite() {
        return ScaleFactor::ONE;
    }
    let p = (max.abs() / DISPLAY_BAND).log10().ceil() as i32;
    ScaleFactor {
        exponent: (-p).min(f64::MAX_10_EXP),
    }
}

/// Scale factors for every series, in the same order as the maxima.
pub fn scale_all(maxes: &[f64]) -> Vec<ScaleFactor> {
    maxes.iter().map(|m| scale(*m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_known_values() {
        assert_eq!(scale(500.), ScaleFactor { exponent: -1 });
        assert_eq!(scale(500.).value(), 0.1);
        assert_eq!(scale(5.), ScaleFactor { exponent: 1 });
        assert_eq!(scale(5.).value(), 10.);
        assert_eq!(scale(0.), ScaleFactor::ONE);
        assert_eq!(scale(20.), ScaleFactor::ONE);
        assert_eq!(scale(10000.).value(), 0.01);
        assert_eq!(scale(110.), ScaleFactor::ONE);
        assert_eq!(scale(111.), ScaleFactor { exponent: -1 });
    }

    #[test]
    fn scale_text_has_no_float_artifacts() {
        assert_eq!(scale(5.).to_string(), "10");
        assert_eq!(scale(0.05).to_string(), "1000");
        assert_eq!(scale(20.).to_string(), "1");
        assert_eq!(scale(500.).to_string(), "0.1");
        assert_eq!(scale(10000.).to_string(), "0.01");
        assert_eq!(scale(5e6).to_string(), "0.00001");
    }

    #[test]
    fn scaled_max_fits_the_band() {
        let maxes = [
            1e-9, 0.003, 0.5, 1., 7.3, 42., 99.9, 110., 250., 1234.5, 98765., 3.3e8, 1e15,
        ];
        for m in maxes.iter() {
            let f = scale(*m);
            let scaled = f.value() * m;
            assert!(scaled <= DISPLAY_BAND * 1.000001, "{} * {} = {}", f, m, scaled);
            // one more power of ten would overflow the band
            assert!(scaled * 10. > DISPLAY_BAND, "{} * {} = {}", f, m, scaled);
        }
    }

    #[test]
    fn tiny_maxima_keep_a_finite_factor() {
        assert!(ScaleFactor { exponent: f64::MAX_10_EXP }.value().is_finite());
        for m in [1e-300, 1e-320, 5e-324, f64::MIN_POSITIVE, -1e-320].iter() {
            let f = scale(*m);
            assert!(f.exponent <= f64::MAX_10_EXP, "{:?} for {}", f, m);
            assert!(f.value().is_finite(), "{:?} for {}", f, m);
            let scaled = f.value() * m.abs();
            assert!(scaled.is_finite() && scaled <= DISPLAY_BAND, "{} * {} = {}", f, m, scaled);
        }
        assert_eq!(scale(1e-320).exponent, f64::MAX_10_EXP);
        // still the exact band fit when no clamping is needed
        assert_eq!(scale(1e-300).exponent, 302);
    }

    #[test]
    fn scale_uses_magnitude_of_negative_max() {
        assert_eq!(scale(-500.), scale(500.));
    }

    #[test]
    fn scale_all_keeps_order() {
        let f = scale_all(&[20., 10000., 0.]);
        assert_eq!(f, vec![ScaleFactor::ONE, ScaleFactor { exponent: -2 }, ScaleFactor::ONE]);
    }
}
