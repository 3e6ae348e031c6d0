use crate::{TrError, TrResult};

/// Floating point type used throughout the bench
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> TrResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TrError::NonFinite { what, value: v })
    }
}

/// Check that `v` is finite and strictly positive.
pub fn ensure_positive(v: Real, what: &'static str) -> TrResult<Real> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(TrError::InvalidArg { what })
    }
}

/// Check that `v` is finite and not negative.
pub fn ensure_non_negative(v: Real, what: &'static str) -> TrResult<Real> {
    let v = ensure_finite(v, what)?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(TrError::InvalidArg { what })
    }
}

/// True when `value` lies within `tolerance` of `target` (inclusive).
#[inline]
pub fn within(value: Real, target: Real, tolerance: Real) -> bool {
    (value - target).abs() <= tolerance
}
