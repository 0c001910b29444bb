// In: src/pipeline/detrend.rs

//! Decorator removing a fitted low-order polynomial trend from its parent.
//!
//! Modes, by polynomial degree removed:
//!   - `center`: subtract the mean height. Stays periodic.
//!   - `height`: least-squares line/plane fit minimizing the rms residual.
//!   - `slope`: gradient estimated as the mean of the measured first
//!     derivative, with the offset back-computed for the midpoint sampling
//!     of that derivative.
//!   - `curvature`: least-squares quadratic/biquadratic fit.
//!
//! Coefficients are fitted at construction against physical-size-normalized
//! positions and refitted whenever the mode is rebound. The reconstruction
//! in `heights()` evaluates the polynomial at grid-index-normalized
//! coordinates. These coordinate systems coincide on serial uniform grids
//! but can drift apart (e.g. after a size rebinding); the asymmetry is
//! retained deliberately to match established behavior.
//!
//! A detrended topography is periodic only in `center` mode; every other
//! mode breaks the seamless tiling.

use std::sync::Arc;

use ndarray::{Array1, ArrayD};

use crate::analysis::{DerivativeOptions, SurfaceAnalysis};
use crate::error::AsperityError;
use crate::kernels::polyfit;
use crate::parallel::{Decomposition, Reduction};
use crate::pipeline::state::SurfaceState;
use crate::surface::{HeightData, HeightField, InfoMap, Positions};
use crate::types::DetrendMode;

#[derive(Debug)]
pub struct DetrendedTopography {
    parent: Arc<dyn HeightField>,
    mode: DetrendMode,
    coeffs: Vec<f64>,
}

impl DetrendedTopography {
    /// Fits the trend of `parent` and wraps it. Only uniform parents are
    /// supported; the grid-index-based reconstruction has no meaning on a
    /// variable-spacing axis.
    pub fn new(parent: Arc<dyn HeightField>, mode: DetrendMode) -> Result<Self, AsperityError> {
        if !parent.is_uniform() {
            return Err(AsperityError::UnsupportedOperation {
                operation: format!("detrend (mode '{}')", mode),
                kind: parent.kind(),
            });
        }
        let coeffs = fit_coeffs(&parent, mode)?;
        Ok(Self {
            parent,
            mode,
            coeffs,
        })
    }

    /// Fitted polynomial coefficients. Length encodes the degree:
    /// 1D `[a0]` / `[a0, a1]` / `[a0, a1, a2]`,
    /// 2D `[a0]` / `[a1x, a1y, a0]` / `[m, n, mm, nn, mn, h0]`.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn detrend_mode(&self) -> DetrendMode {
        self.mode
    }

    /// Rebinds the mode and refits the coefficients against the parent.
    pub fn set_detrend_mode(&mut self, mode: DetrendMode) -> Result<(), AsperityError> {
        self.coeffs = fit_coeffs(&self.parent, mode)?;
        self.mode = mode;
        Ok(())
    }

    /// Physical curvatures `2 c / size²` of the fitted polynomial:
    /// `[rho]` for line scans, `[rho_xx, rho_yy, rho_xy]` for maps. Zero for
    /// fits below quadratic degree.
    pub fn curvatures(&self) -> Result<Vec<f64>, AsperityError> {
        let sizes = self.parent.physical_sizes();
        if self.parent.dim() == 1 {
            match self.coeffs.len() {
                3 => Ok(vec![2.0 * self.coeffs[2] / (sizes[0] * sizes[0])]),
                1 | 2 => Ok(vec![0.0]),
                n => Err(unknown_coefficient_count(n, 1)),
            }
        } else {
            match self.coeffs.len() {
                6 => {
                    let (sx, sy) = (sizes[0], sizes[1]);
                    Ok(vec![
                        2.0 * self.coeffs[2] / (sx * sx),
                        2.0 * self.coeffs[3] / (sy * sy),
                        2.0 * self.coeffs[4] / (sx * sy),
                    ])
                }
                1 | 3 => Ok(vec![0.0, 0.0, 0.0]),
                n => Err(unknown_coefficient_count(n, 2)),
            }
        }
    }

    /// Renders the fitted trend as a human-readable expression.
    pub fn stringify_plane(&self) -> Result<String, AsperityError> {
        let c: Vec<String> = self.coeffs.iter().map(|v| v.to_string()).collect();
        if self.parent.dim() == 1 {
            match c.len() {
                1 => Ok(c[0].clone()),
                2 => Ok(format!("{} + {} x", c[0], c[1])),
                3 => Ok(format!("{} + {} x + {} x^2", c[0], c[1], c[2])),
                n => Err(unknown_coefficient_count(n, 1)),
            }
        } else {
            match c.len() {
                1 => Ok(c[0].clone()),
                3 => Ok(format!("{} + {} x + {} y", c[2], c[0], c[1])),
                6 => Ok(format!(
                    "{} + {} x + {} y + {} x^2 + {} y^2 + {} xy",
                    c[5], c[0], c[1], c[2], c[3], c[4]
                )),
                n => Err(unknown_coefficient_count(n, 2)),
            }
        }
    }
}

fn unknown_coefficient_count(count: usize, dim: usize) -> AsperityError {
    AsperityError::Internal(format!(
        "Unknown coefficient count {} for a {}-dimensional detrended entity.",
        count, dim
    ))
}

/// Collects the defined samples of a line scan as (scaled position, height)
/// pairs for the least-squares fit.
fn valid_profile(
    positions: &Array1<f64>,
    data: &HeightData,
    inv_size: f64,
) -> (Array1<f64>, Array1<f64>) {
    let mut u = Vec::new();
    let mut h = Vec::new();
    for (flat, value) in data.values().iter().enumerate() {
        if data.mask().map_or(true, |m| m.is_valid(flat)) {
            u.push(positions[flat] * inv_size);
            h.push(*value);
        }
    }
    (Array1::from_vec(u), Array1::from_vec(h))
}

/// Same for a 2D map, flattening the meshgrid in row-major order.
fn valid_map(
    x: &ndarray::Array2<f64>,
    y: &ndarray::Array2<f64>,
    data: &HeightData,
    inv_sx: f64,
    inv_sy: f64,
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let mut u = Vec::new();
    let mut v = Vec::new();
    let mut h = Vec::new();
    for (flat, ((xv, yv), value)) in x
        .iter()
        .zip(y.iter())
        .zip(data.values().iter())
        .enumerate()
    {
        if data.mask().map_or(true, |m| m.is_valid(flat)) {
            u.push(xv * inv_sx);
            v.push(yv * inv_sy);
            h.push(*value);
        }
    }
    (
        Array1::from_vec(u),
        Array1::from_vec(v),
        Array1::from_vec(h),
    )
}

fn mean_of(values: &ArrayD<f64>) -> f64 {
    values.sum() / values.len() as f64
}

fn fit_coeffs(
    parent: &Arc<dyn HeightField>,
    mode: DetrendMode,
) -> Result<Vec<f64>, AsperityError> {
    if mode == DetrendMode::Center {
        return Ok(vec![parent.mean()?]);
    }
    let sizes = parent.physical_sizes();
    if parent.dim() == 1 {
        match mode {
            DetrendMode::Height | DetrendMode::Curvature => {
                let (positions, data) = parent.positions_and_heights()?;
                let x = positions.profile()?;
                let (u, h) = valid_profile(x, &data, 1.0 / sizes[0]);
                let degree = if mode == DetrendMode::Height { 1 } else { 2 };
                polyfit::polyfit(&u, &h, degree)
            }
            DetrendMode::Slope => {
                let d = parent.derivative_with(
                    1,
                    DerivativeOptions {
                        periodic: Some(false),
                        scale_factor: 1,
                    },
                )?;
                let n = parent.nb_grid_pts()[0] as f64;
                let grad = mean_of(&d[0]) * sizes[0];
                // The derivative is sampled at midpoints, not at grid nodes;
                // the (n-1)/(2n) term back-computes the matching offset.
                let a0 = parent.mean()? - grad * (n - 1.0) / (2.0 * n);
                Ok(vec![a0, grad])
            }
            DetrendMode::Center => unreachable!("handled above"),
        }
    } else {
        match mode {
            DetrendMode::Height | DetrendMode::Curvature => {
                let (positions, data) = parent.positions_and_heights()?;
                let (x, y) = positions.map()?;
                let (u, v, h) = valid_map(x, y, &data, 1.0 / sizes[0], 1.0 / sizes[1]);
                if mode == DetrendMode::Height {
                    Ok(polyfit::fit_plane(&u, &v, &h)?.to_vec())
                } else {
                    Ok(polyfit::fit_biquadratic(&u, &v, &h)?.to_vec())
                }
            }
            DetrendMode::Slope => {
                let d = parent.derivative_with(
                    1,
                    DerivativeOptions {
                        periodic: Some(false),
                        scale_factor: 1,
                    },
                )?;
                let pts = parent.nb_grid_pts();
                let (nx, ny) = (pts[0] as f64, pts[1] as f64);
                let a1x = mean_of(&d[0]) * sizes[0];
                let a1y = mean_of(&d[1]) * sizes[1];
                let a0 = parent.mean()?
                    - a1x * (nx - 1.0) / (2.0 * nx)
                    - a1y * (ny - 1.0) / (2.0 * ny);
                Ok(vec![a1x, a1y, a0])
            }
            DetrendMode::Center => unreachable!("handled above"),
        }
    }
}

impl HeightField for DetrendedTopography {
    fn dim(&self) -> usize {
        self.parent.dim()
    }

    fn kind(&self) -> &'static str {
        "detrended topography"
    }

    fn is_uniform(&self) -> bool {
        true
    }

    fn is_periodic(&self) -> bool {
        // Trend removal is incompatible with seamless periodic tiling.
        self.mode == DetrendMode::Center && self.parent.is_periodic()
    }

    fn set_periodic(&self, periodic: bool) -> Result<(), AsperityError> {
        self.parent.set_periodic(periodic)
    }

    fn physical_sizes(&self) -> Vec<f64> {
        self.parent.physical_sizes()
    }

    fn set_physical_sizes(&self, sizes: Vec<f64>) -> Result<(), AsperityError> {
        self.parent.set_physical_sizes(sizes)
    }

    fn nb_grid_pts(&self) -> Vec<usize> {
        self.parent.nb_grid_pts()
    }

    fn info(&self) -> InfoMap {
        self.parent.info()
    }

    fn has_undefined_data(&self) -> Result<bool, AsperityError> {
        self.parent.has_undefined_data()
    }

    fn heights(&self) -> Result<HeightData, AsperityError> {
        let (values, mask) = self.parent.heights()?.into_parts();
        let pts = self.parent.nb_grid_pts();
        let offsets = self.parent.subdomain_locations();

        // Grid-index-normalized coordinates (global index / global count).
        let corrected = if self.coeffs.len() == 1 {
            let a0 = self.coeffs[0];
            values.mapv(|v| v - a0)
        } else if self.dim() == 1 {
            let n = pts[0] as f64;
            match *self.coeffs.as_slice() {
                [a0, a1] => ArrayD::from_shape_fn(values.raw_dim(), |idx| {
                    let u = idx[0] as f64 / n;
                    values[&idx] - a0 - a1 * u
                }),
                [a0, a1, a2] => ArrayD::from_shape_fn(values.raw_dim(), |idx| {
                    let u = idx[0] as f64 / n;
                    values[&idx] - a0 - a1 * u - a2 * u * u
                }),
                _ => return Err(unknown_coefficient_count(self.coeffs.len(), 1)),
            }
        } else {
            let (nx, ny) = (pts[0] as f64, pts[1] as f64);
            let (ox, oy) = (offsets[0] as f64, offsets[1] as f64);
            match *self.coeffs.as_slice() {
                [a1x, a1y, a0] => ArrayD::from_shape_fn(values.raw_dim(), |idx| {
                    let x = (ox + idx[0] as f64) / nx;
                    let y = (oy + idx[1] as f64) / ny;
                    values[&idx] - a0 - a1x * x - a1y * y
                }),
                [m, n, mm, nn, mn, h0] => ArrayD::from_shape_fn(values.raw_dim(), |idx| {
                    let x = (ox + idx[0] as f64) / nx;
                    let y = (oy + idx[1] as f64) / ny;
                    values[&idx] - h0 - m * x - n * y - mm * x * x - nn * y * y - mn * x * y
                }),
                _ => return Err(unknown_coefficient_count(self.coeffs.len(), 2)),
            }
        };
        HeightData::new(corrected, mask)
    }

    fn positions(&self) -> Positions {
        self.parent.positions()
    }

    fn decomposition(&self) -> Option<Decomposition> {
        self.parent.decomposition()
    }

    fn reduction(&self) -> Arc<dyn Reduction> {
        self.parent.reduction()
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        Ok(SurfaceState::Detrended {
            parent: Box::new(self.parent.state()?),
            mode: self.mode,
        })
    }
}
