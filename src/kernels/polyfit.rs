// In: src/kernels/polyfit.rs

//! This module contains the least-squares fitting kernels used by the
//! detrending transforms.
//!
//! All fits minimize the rms residual height. The systems are tiny (at most
//! six unknowns for the biquadratic surface), so they are solved through the
//! normal equations with a partially pivoted Gaussian elimination; with
//! normalized coordinates this is numerically unproblematic for degree ≤ 2.

use ndarray::Array1;

use crate::error::AsperityError;

/// Solves `min ‖A c − rhs‖₂` where the columns of `A` are given explicitly.
/// Returns the coefficients in column order.
pub fn lstsq(columns: &[&Array1<f64>], rhs: &Array1<f64>) -> Result<Vec<f64>, AsperityError> {
    let m = columns.len();
    let rows = rhs.len();
    for col in columns {
        if col.len() != rows {
            return Err(AsperityError::Internal(format!(
                "Design-matrix column of length {} does not match {} samples.",
                col.len(),
                rows
            )));
        }
    }
    if rows < m {
        return Err(AsperityError::InsufficientGridPoints {
            needed: m,
            actual: rows,
        });
    }

    // Normal equations: (AᵀA) c = Aᵀ rhs.
    let mut a = vec![[0.0f64; 8]; m];
    let mut b = vec![0.0f64; m];
    for i in 0..m {
        for j in i..m {
            let dot = columns[i].dot(columns[j]);
            a[i][j] = dot;
            a[j][i] = dot;
        }
        b[i] = columns[i].dot(rhs);
    }

    // Gaussian elimination with partial pivoting.
    for pivot in 0..m {
        let mut best = pivot;
        for row in pivot + 1..m {
            if a[row][pivot].abs() > a[best][pivot].abs() {
                best = row;
            }
        }
        if a[best][pivot].abs() < f64::EPSILON {
            return Err(AsperityError::Internal(
                "Normal equations of the trend fit are singular.".to_string(),
            ));
        }
        a.swap(pivot, best);
        b.swap(pivot, best);
        for row in pivot + 1..m {
            let factor = a[row][pivot] / a[pivot][pivot];
            for col in pivot..m {
                a[row][col] -= factor * a[pivot][col];
            }
            b[row] -= factor * b[pivot];
        }
    }
    let mut solution = vec![0.0f64; m];
    for row in (0..m).rev() {
        let mut acc = b[row];
        for col in row + 1..m {
            acc -= a[row][col] * solution[col];
        }
        solution[row] = acc / a[row][row];
    }
    Ok(solution)
}

/// Polynomial fit `h ≈ a0 + a1 u + … + a_deg u^deg`; coefficients are
/// returned in ascending order.
pub fn polyfit(
    u: &Array1<f64>,
    h: &Array1<f64>,
    degree: usize,
) -> Result<Vec<f64>, AsperityError> {
    let ones = Array1::ones(u.len());
    let u2;
    let columns: Vec<&Array1<f64>> = match degree {
        1 => vec![&ones, u],
        2 => {
            u2 = u.mapv(|v| v * v);
            vec![&ones, u, &u2]
        }
        d => {
            return Err(AsperityError::Internal(format!(
                "Polynomial degree {} is not used by any detrend mode.",
                d
            )))
        }
    };
    lstsq(&columns, h)
}

/// Plane fit `h ≈ a1x·x + a1y·y + a0`, returned as `[a1x, a1y, a0]`.
pub fn fit_plane(
    x: &Array1<f64>,
    y: &Array1<f64>,
    h: &Array1<f64>,
) -> Result<[f64; 3], AsperityError> {
    let ones = Array1::ones(x.len());
    let sol = lstsq(&[x, y, &ones], h)?;
    Ok([sol[0], sol[1], sol[2]])
}

/// Biquadratic fit `h ≈ m·x + n·y + mm·x² + nn·y² + mn·x·y + h0`, returned
/// as `[m, n, mm, nn, mn, h0]`.
pub fn fit_biquadratic(
    x: &Array1<f64>,
    y: &Array1<f64>,
    h: &Array1<f64>,
) -> Result<[f64; 6], AsperityError> {
    let ones = Array1::ones(x.len());
    let xx = x.mapv(|v| v * v);
    let yy = y.mapv(|v| v * v);
    let xy = Array1::from_iter(x.iter().zip(y.iter()).map(|(a, b)| a * b));
    let sol = lstsq(&[x, y, &xx, &yy, &xy, &ones], h)?;
    Ok([sol[0], sol[1], sol[2], sol[3], sol[4], sol[5]])
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_polyfit_recovers_line() {
        let u = array![0.0, 0.25, 0.5, 0.75, 1.0];
        let h = u.mapv(|v| 2.0 - 3.0 * v);
        let c = polyfit(&u, &h, 1).unwrap();
        assert!((c[0] - 2.0).abs() < 1e-12);
        assert!((c[1] + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyfit_recovers_parabola() {
        let u = Array1::from_iter((0..32).map(|i| i as f64 / 32.0));
        let h = u.mapv(|v| 1.0 + 0.5 * v - 2.0 * v * v);
        let c = polyfit(&u, &h, 2).unwrap();
        assert!((c[0] - 1.0).abs() < 1e-10);
        assert!((c[1] - 0.5).abs() < 1e-10);
        assert!((c[2] + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_fit_plane_recovers_tilt() {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut hs = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                let x = i as f64 / 8.0;
                let y = j as f64 / 8.0;
                xs.push(x);
                ys.push(y);
                hs.push(0.7 * x - 0.2 * y + 5.0);
            }
        }
        let [a1x, a1y, a0] = fit_plane(
            &Array1::from_vec(xs),
            &Array1::from_vec(ys),
            &Array1::from_vec(hs),
        )
        .unwrap();
        assert!((a1x - 0.7).abs() < 1e-10);
        assert!((a1y + 0.2).abs() < 1e-10);
        assert!((a0 - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_fit_biquadratic_recovers_surface() {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut hs = Vec::new();
        for i in 0..12 {
            for j in 0..12 {
                let x = i as f64 / 12.0;
                let y = j as f64 / 12.0;
                xs.push(x);
                ys.push(y);
                hs.push(0.3 * x - 1.1 * y + 0.9 * x * x + 0.4 * y * y - 0.25 * x * y + 2.0);
            }
        }
        let c = fit_biquadratic(
            &Array1::from_vec(xs),
            &Array1::from_vec(ys),
            &Array1::from_vec(hs),
        )
        .unwrap();
        let expected = [0.3, -1.1, 0.9, 0.4, -0.25, 2.0];
        for (got, want) in c.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_underdetermined_system_fails() {
        let u = array![0.0, 1.0];
        let h = array![0.0, 1.0];
        assert!(matches!(
            polyfit(&u, &h, 2),
            Err(AsperityError::InsufficientGridPoints { .. })
        ));
    }
}
