// In: src/analysis/mod.rs

//! The analysis surface attached to every height field.
//!
//! Nothing in `surface` knows about derivatives or roughness statistics;
//! this module attaches them from the outside through a blanket-implemented
//! extension trait, so new analyses never require touching entity types.
//! The derivative orchestration lives here as well: it owns the entity-level
//! concerns (grid kind, periodicity, axis handling, validity) and dispatches
//! to the pure kernels.

use ndarray::{Array1, ArrayD};

use crate::error::AsperityError;
use crate::kernels::{nonuniform, uniform};
use crate::surface::HeightField;
use crate::types::HeightKind;

pub mod scalar;

/// Options of the finite-difference derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivativeOptions {
    /// Overrides the entity's own periodicity flag when set. Ignored on
    /// nonuniform grids, which are never periodic.
    pub periodic: Option<bool>,
    /// Stencil width in pixels. Widening the stencil probes the surface at a
    /// coarser scale; non-periodic grids lose `order * scale_factor` boundary
    /// points. Uniform grids only.
    pub scale_factor: usize,
}

impl Default for DerivativeOptions {
    fn default() -> Self {
        Self {
            periodic: None,
            scale_factor: 1,
        }
    }
}

/// Computes the per-axis derivative components of an entity.
pub(crate) fn gradient<T>(
    surface: &T,
    order: u8,
    opts: &DerivativeOptions,
) -> Result<Vec<ArrayD<f64>>, AsperityError>
where
    T: HeightField + ?Sized,
{
    if order != 1 && order != 2 {
        return Err(AsperityError::UnsupportedDerivativeOrder(order));
    }
    let data = surface.heights()?;
    let values = data.require_fully_defined("derivative")?;

    if surface.is_uniform() {
        if opts.scale_factor == 0 {
            return Err(AsperityError::UnsupportedOperation {
                operation: "derivative with a zero scale factor".to_string(),
                kind: surface.kind(),
            });
        }
        let pixel = surface.pixel_size().ok_or_else(|| {
            AsperityError::Internal("Uniform entity without a pixel size.".to_string())
        })?;
        let periodic = opts.periodic.unwrap_or_else(|| surface.is_periodic());
        (0..surface.dim())
            .map(|axis| {
                uniform::derivative_along_axis(
                    values,
                    axis,
                    pixel[axis],
                    order,
                    periodic,
                    opts.scale_factor,
                )
            })
            .collect()
    } else {
        if opts.scale_factor != 1 {
            return Err(AsperityError::UnsupportedOperation {
                operation: format!("derivative with scale factor {}", opts.scale_factor),
                kind: surface.kind(),
            });
        }
        let positions = surface.positions();
        let x = positions.profile()?;
        let h = Array1::from_iter(values.iter().copied());
        let d = match order {
            1 => nonuniform::diff1(x, &h)?,
            _ => nonuniform::diff2(x, &h)?,
        };
        Ok(vec![d.into_dyn()])
    }
}

/// Analysis operations available on every entity, base or decorated.
///
/// All height-averaging statistics honor the validity mask (undefined
/// samples are excluded) and route their scalar sums through the entity's
/// reduction collaborator, so decomposed runs return the global value on
/// every process. This makes them collective calls in the parallel case.
pub trait SurfaceAnalysis: HeightField {
    /// Mean of the defined heights.
    fn mean(&self) -> Result<f64, AsperityError> {
        scalar::mean(self)
    }

    /// Smallest defined height.
    fn min(&self) -> Result<f64, AsperityError> {
        scalar::min(self)
    }

    /// Largest defined height.
    fn max(&self) -> Result<f64, AsperityError> {
        scalar::max(self)
    }

    /// Finite-difference derivative, one component per axis. Each component
    /// shrinks only along its own differencing axis (by `order` samples on
    /// non-periodic grids; not at all on periodic ones).
    fn derivative(&self, order: u8) -> Result<Vec<ArrayD<f64>>, AsperityError> {
        gradient(self, order, &DerivativeOptions::default())
    }

    /// Derivative with explicit periodicity/stencil-width options.
    fn derivative_with(
        &self,
        order: u8,
        opts: DerivativeOptions,
    ) -> Result<Vec<ArrayD<f64>>, AsperityError> {
        gradient(self, order, &opts)
    }

    /// Root mean square height amplitude (`Sq` over the full grid, `Rq` of
    /// per-profile residuals).
    fn rms_height(&self, kind: HeightKind) -> Result<f64, AsperityError> {
        scalar::rms_height(self, kind)
    }

    /// Root mean square amplitude of the height gradient.
    fn rms_slope(&self) -> Result<f64, AsperityError> {
        scalar::rms_slope(self)
    }

    /// Root mean square of the height Laplacian.
    fn rms_laplacian(&self) -> Result<f64, AsperityError> {
        scalar::rms_laplacian(self)
    }

    /// Root mean square curvature; half the Laplacian rms on 2D maps.
    fn rms_curvature(&self) -> Result<f64, AsperityError> {
        scalar::rms_curvature(self)
    }
}

impl<T: HeightField + ?Sized> SurfaceAnalysis for T {}
