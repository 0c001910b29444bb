// In: src/kernels/nonuniform.rs

//! This module contains the pure, stateless kernels for finite differences
//! on nonuniform (variable-spacing) grids.
//!
//! First derivative: the pair difference `Δh/Δx` between consecutive
//! samples, shrinking the result by one.
//! Second derivative: the unequal-spacing stencil obtained from the
//! second-order expansions of `h(x + Δx₊)` and `h(x − Δx₋)`:
//!
//! ```text
//! d²h/dx² ≈ 2 (Δx₋ [h(x+Δx₊) − h(x)] + Δx₊ [h(x−Δx₋) − h(x)])
//!            / (Δx₊ Δx₋ (Δx₊ + Δx₋))
//! ```
//!
//! shrinking the result by two.

use ndarray::Array1;
use num_traits::Float;

use crate::error::AsperityError;

/// First derivative of `h` sampled at positions `x`.
pub fn diff1<F>(x: &Array1<F>, h: &Array1<F>) -> Result<Array1<F>, AsperityError>
where
    F: Float,
{
    let n = x.len();
    if n < 2 {
        return Err(AsperityError::InsufficientGridPoints { needed: 2, actual: n });
    }
    Ok(Array1::from_iter(
        (0..n - 1).map(|i| (h[i + 1] - h[i]) / (x[i + 1] - x[i])),
    ))
}

/// Second derivative of `h` sampled at positions `x`.
pub fn diff2<F>(x: &Array1<F>, h: &Array1<F>) -> Result<Array1<F>, AsperityError>
where
    F: Float,
{
    let n = x.len();
    if n < 3 {
        return Err(AsperityError::InsufficientGridPoints { needed: 3, actual: n });
    }
    let two = F::from(2).ok_or_else(|| {
        AsperityError::Internal("Cannot represent 2 in the float type.".to_string())
    })?;
    Ok(Array1::from_iter((1..n - 1).map(|i| {
        let dxp = x[i + 1] - x[i];
        let dxm = x[i] - x[i - 1];
        two * (dxm * (h[i + 1] - h[i]) + dxp * (h[i - 1] - h[i]))
            / (dxp * dxm * (dxp + dxm))
    })))
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_diff1_matches_pair_slopes() {
        let x = array![0.0, 1.0, 3.0];
        let h = array![0.0, 2.0, 2.0];
        let d = diff1(&x, &h).unwrap();
        assert_eq!(d, array![2.0, 0.0]);
    }

    #[test]
    fn test_diff2_exact_for_parabola_on_irregular_grid() {
        let x = array![0.0, 0.3, 1.0, 1.4, 2.7, 3.0];
        let k = 0.8;
        let h = x.mapv(|v| 0.5 * k * v * v);
        let d = diff2(&x, &h).unwrap();
        assert_eq!(d.len(), x.len() - 2);
        for v in d.iter() {
            assert!((v - k).abs() < 1e-12, "{} != {}", v, k);
        }
    }

    #[test]
    fn test_diff2_linear_is_zero() {
        let x = array![0.0, 0.1, 0.5, 0.6, 1.9];
        let h = x.mapv(|v| 3.0 * v - 1.0);
        let d = diff2(&x, &h).unwrap();
        for v in d.iter() {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn test_too_few_points() {
        let x = array![0.0, 1.0];
        let h = array![0.0, 1.0];
        assert!(diff1(&array![0.0], &array![0.0]).is_err());
        assert!(matches!(
            diff2(&x, &h),
            Err(AsperityError::InsufficientGridPoints { needed: 3, actual: 2 })
        ));
    }
}
