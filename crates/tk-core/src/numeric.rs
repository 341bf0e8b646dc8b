use crate::TkError;

/// Floating point type used for temperatures and tunables.
pub type Real = f32;

/// Comparison tolerances sized for `f32` temperatures.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-5,
            rel: 1e-5,
        }
    }
}

/// Within `abs`, or within `rel` of the larger magnitude.
pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// Pass `v` through unless it is NaN or infinite.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TkError> {
    if !v.is_finite() {
        return Err(TkError::NonFinite { what, value: v });
    }
    Ok(v)
}

/// Clamp a finite value into `[lo, hi]`.
///
/// NaN and infinities are rejected rather than clamped: callers keep their
/// previous value in that case.
pub fn clamp_finite(v: Real, lo: Real, hi: Real, what: &'static str) -> Result<Real, TkError> {
    if lo > hi {
        return Err(TkError::InvalidArg {
            what: "clamp range is inverted",
        });
    }
    Ok(ensure_finite(v, what)?.clamp(lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances::default();
        assert!(nearly_equal(45.0, 45.000_001, tol));
        assert!(nearly_equal(0.0, 1e-6, tol));
        assert!(!nearly_equal(45.0, 45.01, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn clamp_finite_limits_and_rejects() {
        assert_eq!(clamp_finite(1000.0, 5.0, 70.0, "sp").unwrap(), 70.0);
        assert_eq!(clamp_finite(-3.0, 5.0, 70.0, "sp").unwrap(), 5.0);
        assert_eq!(clamp_finite(42.5, 5.0, 70.0, "sp").unwrap(), 42.5);
        assert!(clamp_finite(Real::INFINITY, 5.0, 70.0, "sp").is_err());
        assert!(clamp_finite(1.0, 2.0, 1.0, "sp").is_err());
    }
}
