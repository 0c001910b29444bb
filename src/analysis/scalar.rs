// In: src/analysis/scalar.rs

//! Functions computing scalar roughness parameters.
//!
//! Every statistic reduces its scalar accumulators through the entity's
//! reduction collaborator before the final combination, so all processes of
//! a decomposed run agree on the result.

use ndarray::{ArrayD, Axis, Slice};

use crate::analysis::{gradient, DerivativeOptions};
use crate::error::AsperityError;
use crate::surface::HeightField;
use crate::types::HeightKind;

fn sumsq_and_count(values: &ArrayD<f64>) -> (f64, usize) {
    (values.iter().map(|v| v * v).sum(), values.len())
}

/// Mean of the defined heights.
pub fn mean<T: HeightField + ?Sized>(surface: &T) -> Result<f64, AsperityError> {
    let data = surface.heights()?;
    let (sum, count) = data.sum_and_count();
    let reduction = surface.reduction();
    let global_sum = reduction.sum(sum)?;
    let global_count = reduction.sum(count as f64)?;
    if global_count == 0.0 {
        return Err(AsperityError::UndefinedData("mean"));
    }
    Ok(global_sum / global_count)
}

/// Smallest defined height.
pub fn min<T: HeightField + ?Sized>(surface: &T) -> Result<f64, AsperityError> {
    let data = surface.heights()?;
    let local = data.local_min().unwrap_or(f64::INFINITY);
    let global = surface.reduction().min(local)?;
    if !global.is_finite() {
        return Err(AsperityError::UndefinedData("min"));
    }
    Ok(global)
}

/// Largest defined height.
pub fn max<T: HeightField + ?Sized>(surface: &T) -> Result<f64, AsperityError> {
    let data = surface.heights()?;
    let local = data.local_max().unwrap_or(f64::NEG_INFINITY);
    let global = surface.reduction().max(local)?;
    if !global.is_finite() {
        return Err(AsperityError::UndefinedData("max"));
    }
    Ok(global)
}

/// Root mean square height amplitude of a topography or line scan.
pub fn rms_height<T: HeightField + ?Sized>(
    surface: &T,
    kind: HeightKind,
) -> Result<f64, AsperityError> {
    match kind {
        HeightKind::Sq => {
            let center = mean(surface)?;
            let data = surface.heights()?;
            let mut sumsq = 0.0;
            let mut count = 0usize;
            for v in data.valid_values() {
                sumsq += (v - center) * (v - center);
                count += 1;
            }
            let reduction = surface.reduction();
            let global_sumsq = reduction.sum(sumsq)?;
            let global_count = reduction.sum(count as f64)?;
            if global_count == 0.0 {
                return Err(AsperityError::UndefinedData("rms_height"));
            }
            Ok((global_sumsq / global_count).sqrt())
        }
        HeightKind::Rq => {
            if surface.decomposition().is_some() {
                // Per-profile means would need per-column collectives that
                // the reduction contract does not provide.
                return Err(AsperityError::UnsupportedOperation {
                    operation: "rms_height of kind 'Rq' on a decomposed grid".to_string(),
                    kind: surface.kind(),
                });
            }
            if surface.dim() == 1 {
                // The per-profile mean of a line scan is its global mean.
                return rms_height(surface, HeightKind::Sq);
            }
            let data = surface.heights()?;
            let values = data.values();
            let (nx, ny) = (values.shape()[0], values.shape()[1]);
            let is_valid = |i: usize, j: usize| {
                data.mask().map_or(true, |m| m.is_valid(i * ny + j))
            };
            let mut sumsq = 0.0;
            let mut count = 0usize;
            for j in 0..ny {
                let mut col_sum = 0.0;
                let mut col_count = 0usize;
                for i in 0..nx {
                    if is_valid(i, j) {
                        col_sum += values[[i, j]];
                        col_count += 1;
                    }
                }
                if col_count == 0 {
                    continue;
                }
                let col_mean = col_sum / col_count as f64;
                for i in 0..nx {
                    if is_valid(i, j) {
                        let r = values[[i, j]] - col_mean;
                        sumsq += r * r;
                        count += 1;
                    }
                }
            }
            if count == 0 {
                return Err(AsperityError::UndefinedData("rms_height"));
            }
            Ok((sumsq / count as f64).sqrt())
        }
    }
}

/// Root mean square amplitude of the height gradient.
pub fn rms_slope<T: HeightField + ?Sized>(surface: &T) -> Result<f64, AsperityError> {
    let components = gradient(surface, 1, &DerivativeOptions::default())?;
    let reduction = surface.reduction();
    let mut acc = 0.0;
    for component in &components {
        let (sumsq, count) = sumsq_and_count(component);
        let global_sumsq = reduction.sum(sumsq)?;
        let global_count = reduction.sum(count as f64)?;
        if global_count == 0.0 {
            return Err(AsperityError::UndefinedData("rms_slope"));
        }
        acc += global_sumsq / global_count;
    }
    Ok(acc.sqrt())
}

/// Root mean square of the height Laplacian. On 2D maps the two
/// second-derivative components have different valid index ranges after
/// differencing; they are summed only over their overlapping interior
/// region before squaring and averaging.
pub fn rms_laplacian<T: HeightField + ?Sized>(surface: &T) -> Result<f64, AsperityError> {
    let components = gradient(surface, 2, &DerivativeOptions::default())?;
    let laplacian = match surface.dim() {
        1 => components[0].clone(),
        2 => {
            let dxx = &components[0];
            let dyy = &components[1];
            if dxx.shape() == dyy.shape() {
                // Periodic: both components span the full grid.
                dxx + dyy
            } else {
                // Non-periodic: dxx is (nx-2, ny), dyy is (nx, ny-2); the
                // overlap is the (nx-2, ny-2) interior.
                let ny = dxx.shape()[1];
                let nx = dyy.shape()[0];
                let dxx_inner =
                    dxx.slice_axis(Axis(1), Slice::from(1isize..(ny - 1) as isize));
                let dyy_inner =
                    dyy.slice_axis(Axis(0), Slice::from(1isize..(nx - 1) as isize));
                &dxx_inner + &dyy_inner
            }
        }
        d => {
            return Err(AsperityError::Internal(format!(
                "Laplacian of a {}-dimensional entity.",
                d
            )))
        }
    };
    let reduction = surface.reduction();
    let (sumsq, count) = sumsq_and_count(&laplacian);
    let global_sumsq = reduction.sum(sumsq)?;
    let global_count = reduction.sum(count as f64)?;
    if global_count == 0.0 {
        return Err(AsperityError::UndefinedData("rms_laplacian"));
    }
    Ok((global_sumsq / global_count).sqrt())
}

/// Root mean square curvature. On a 2D map the mean curvature is half the
/// Laplacian (isotropic relation); on a line scan the second derivative is
/// the curvature itself.
pub fn rms_curvature<T: HeightField + ?Sized>(surface: &T) -> Result<f64, AsperityError> {
    let laplacian = rms_laplacian(surface)?;
    match surface.dim() {
        1 => Ok(laplacian),
        _ => Ok(laplacian / 2.0),
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SurfaceAnalysis;
    use crate::surface::{InfoMap, NonuniformLineScan, Topography, UniformLineScan};
    use ndarray::{Array1, Array2};
    use std::f64::consts::PI;

    fn sinewave_2d(n: usize, hm: f64) -> Topography {
        let l = n as f64;
        let heights = Array2::from_shape_fn((n, n), |(i, j)| {
            (2.0 * PI / l * i as f64).sin() * (2.0 * PI / l * j as f64).sin() * hm
        });
        Topography::new(heights, [l, l], false, InfoMap::new()).unwrap()
    }

    #[test]
    fn test_rms_height_sinewave_2d() {
        let hm = 0.1;
        let top = sinewave_2d(256, hm);
        let analytical = (hm * hm / 4.0).sqrt();
        let numerical = top.rms_height(crate::types::HeightKind::Sq).unwrap();
        assert!((numerical - analytical).abs() < 1e-12);
    }

    #[test]
    fn test_rms_slope_sinewave_2d() {
        let hm = 0.1;
        let n = 256;
        let l = n as f64;
        let top = sinewave_2d(n, hm);
        let analytical = (2.0 * PI * PI * hm * hm / (l * l)).sqrt();
        let numerical = top.rms_slope().unwrap();
        assert!((numerical - analytical).abs() < 1e-5);
    }

    #[test]
    fn test_rms_laplacian_sinewave_2d() {
        let n = 256;
        let hm = 0.3;
        let l = n as f64;
        let heights =
            Array2::from_shape_fn((n, n), |(i, _)| (2.0 * PI / l * i as f64).sin() * hm);
        for periodic in [false, true] {
            let top =
                Topography::new(heights.clone(), [l, l], periodic, InfoMap::new()).unwrap();
            let analytical = ((2.0 * PI / l).powi(4) * hm * hm / 2.0).sqrt();
            let numerical = top.rms_laplacian().unwrap();
            assert!(
                (numerical - analytical).abs() < 1e-5,
                "periodic={}: {} != {}",
                periodic,
                numerical,
                analytical
            );
            assert!((top.rms_curvature().unwrap() - analytical / 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rms_curvature_paraboloid_uniform_1d() {
        let n = 16;
        let curvature = 0.1;
        let heights = Array1::from_iter((0..n).map(|i| 0.5 * curvature * (i * i) as f64));
        let surf = UniformLineScan::new(heights, n as f64, false, InfoMap::new()).unwrap();
        // Central finite differences are exact for the parabola.
        let relative = (surf.rms_curvature().unwrap() - curvature).abs() / curvature;
        assert!(relative < 1e-12);
    }

    #[test]
    fn test_rms_curvature_paraboloid_uniform_2d() {
        let n = 16;
        let curvature = 0.1;
        let heights = Array2::from_shape_fn((n, n), |(i, j)| {
            0.5 * curvature * ((i * i) as f64 + (j * j) as f64)
        });
        let surf =
            Topography::new(heights, [n as f64, n as f64], false, InfoMap::new()).unwrap();
        let relative = (surf.rms_curvature().unwrap() - curvature).abs() / curvature;
        assert!(relative < 1e-12);
    }

    #[test]
    fn test_rms_slope_sinewave_nonuniform() {
        let n = 256;
        let hm = 0.1;
        let l = n as f64;
        let x = Array1::from_iter((0..=n).map(|i| i as f64));
        let h = x.mapv(|v| (2.0 * PI * v / l).sin() * hm);
        let scan = NonuniformLineScan::new(x, h, InfoMap::new()).unwrap();
        let analytical = (2.0 * PI * PI * hm * hm / (l * l)).sqrt();
        let numerical = scan.rms_slope().unwrap();
        assert!((numerical - analytical).abs() < 1e-4);
    }

    #[test]
    fn test_mean_and_extrema_skip_undefined() {
        let mut heights = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        heights[2] = f64::NAN;
        let scan = UniformLineScan::new(heights, 1.0, false, InfoMap::new()).unwrap();
        assert!(scan.has_undefined_data().unwrap());
        assert!((scan.mean().unwrap() - 7.0 / 3.0).abs() < 1e-15);
        assert_eq!(scan.min().unwrap(), 1.0);
        assert_eq!(scan.max().unwrap(), 4.0);
    }

    #[test]
    fn test_derivative_rejects_undefined_data() {
        let heights = Array1::from_vec(vec![1.0, f64::NAN, 3.0, 4.0]);
        let scan = UniformLineScan::new(heights, 1.0, false, InfoMap::new()).unwrap();
        assert!(matches!(
            scan.derivative(1),
            Err(AsperityError::UndefinedData("derivative"))
        ));
    }

    #[test]
    fn test_derivative_order_validation() {
        let scan = UniformLineScan::new(
            Array1::from_vec(vec![1.0, 2.0, 3.0]),
            1.0,
            false,
            InfoMap::new(),
        )
        .unwrap();
        assert!(matches!(
            scan.derivative(0),
            Err(AsperityError::UnsupportedDerivativeOrder(0))
        ));
        assert!(matches!(
            scan.derivative(3),
            Err(AsperityError::UnsupportedDerivativeOrder(3))
        ));
    }

    #[test]
    fn test_uniform_vs_nonuniform_first_derivative() {
        let n = 64;
        let s = 4.0 * PI;
        let p = s / n as f64;
        let h = Array1::from_iter((0..n).map(|i| (i as f64 * p).sin()));
        let uniform = UniformLineScan::new(h.clone(), s, false, InfoMap::new()).unwrap();
        let x = Array1::from_iter((0..n).map(|i| i as f64 * p));
        let nonuni = NonuniformLineScan::new(x, h, InfoMap::new()).unwrap();
        let du = uniform.derivative(1).unwrap();
        let dn = nonuni.derivative(1).unwrap();
        assert_eq!(du[0].len(), dn[0].len());
        for (a, b) in du[0].iter().zip(dn[0].iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scale_factor_widens_stencil() {
        let n = 8;
        let h = Array1::from_iter((0..n).map(|i| ((i * i) as f64).sin()));
        let full = UniformLineScan::new(h.clone(), 1.0, true, InfoMap::new()).unwrap();
        let even = UniformLineScan::new(
            Array1::from_iter(h.iter().step_by(2).copied()),
            1.0,
            true,
            InfoMap::new(),
        )
        .unwrap();
        let d_wide = full
            .derivative_with(
                1,
                DerivativeOptions {
                    periodic: None,
                    scale_factor: 2,
                },
            )
            .unwrap();
        let d_sub = even.derivative(1).unwrap();
        assert_eq!(d_wide[0].len(), n);
        // The widened stencil at even samples equals the subsampled scan's.
        for (k, v) in d_sub[0].iter().enumerate() {
            assert!((d_wide[0][[2 * k]] - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rms_height_rq_subtracts_profile_means() {
        // Columns with distinct offsets but no in-column variation: Rq = 0.
        let heights = Array2::from_shape_fn((4, 3), |(_, j)| j as f64);
        let top = Topography::new(heights, [1.0, 1.0], false, InfoMap::new()).unwrap();
        assert!(top.rms_height(crate::types::HeightKind::Rq).unwrap() < 1e-15);
        assert!(top.rms_height(crate::types::HeightKind::Sq).unwrap() > 0.5);
    }
}
