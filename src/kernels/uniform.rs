// In: src/kernels/uniform.rs

//! This module contains the pure, stateless kernels for finite differences
//! on uniform (constant-spacing) grids.
//!
//! First derivative: forward pair difference, i.e. the slope between
//! consecutive samples, which is the derivative at the midpoint.
//! Second derivative: central difference, exact for polynomials up to
//! degree 2.
//!
//! Periodic grids wrap their neighbor indices and keep the full length;
//! non-periodic grids drop the boundary points where a complete stencil is
//! unavailable, shrinking the differencing axis by `order * step` samples.
//! `step` widens the stencil to multiples of the grid spacing.

use ndarray::{concatenate, ArrayD, Axis, ScalarOperand, Slice};
use num_traits::Float;

use crate::error::AsperityError;

/// Circular forward shift: `result[i] = values[(i + shift) mod n]` along `axis`.
fn roll_forward<F>(values: &ArrayD<F>, axis: usize, shift: usize) -> Result<ArrayD<F>, AsperityError>
where
    F: Float,
{
    let n = values.shape()[axis];
    let s = shift % n;
    if s == 0 {
        return Ok(values.to_owned());
    }
    let front = values.slice_axis(Axis(axis), Slice::from(s as isize..));
    let back = values.slice_axis(Axis(axis), Slice::from(..s as isize));
    concatenate(Axis(axis), &[front, back]).map_err(|e| AsperityError::Internal(e.to_string()))
}

fn cast<F: Float>(value: usize) -> Result<F, AsperityError> {
    F::from(value).ok_or_else(|| {
        AsperityError::Internal(format!("Cannot represent {} in the float type.", value))
    })
}

/// Finite-difference derivative of `values` along `axis`.
///
/// `spacing` is the grid spacing of the differencing axis, `order` the
/// derivative order (1 or 2), `step` the stencil width in pixels.
pub fn derivative_along_axis<F>(
    values: &ArrayD<F>,
    axis: usize,
    spacing: F,
    order: u8,
    periodic: bool,
    step: usize,
) -> Result<ArrayD<F>, AsperityError>
where
    F: Float + ScalarOperand,
{
    if step == 0 {
        return Err(AsperityError::Internal(
            "Derivative stencil width must be at least one pixel.".to_string(),
        ));
    }
    let n = values.shape()[axis];
    let dx = spacing * cast::<F>(step)?;
    let two = cast::<F>(2)?;

    match (order, periodic) {
        (1, false) => {
            if n < step + 1 {
                return Err(AsperityError::InsufficientGridPoints {
                    needed: step + 1,
                    actual: n,
                });
            }
            let hi = values.slice_axis(Axis(axis), Slice::from(step as isize..));
            let lo = values.slice_axis(Axis(axis), Slice::from(..(n - step) as isize));
            Ok((&hi - &lo) / dx)
        }
        (1, true) => {
            let shifted = roll_forward(values, axis, step)?;
            Ok((&shifted - values) / dx)
        }
        (2, false) => {
            if n < 2 * step + 1 {
                return Err(AsperityError::InsufficientGridPoints {
                    needed: 2 * step + 1,
                    actual: n,
                });
            }
            let hi = values.slice_axis(Axis(axis), Slice::from((2 * step) as isize..));
            let mid = values.slice_axis(
                Axis(axis),
                Slice::from(step as isize..(n - step) as isize),
            );
            let lo = values.slice_axis(Axis(axis), Slice::from(..(n - 2 * step) as isize));
            Ok((&(&hi + &lo) - &(&mid * two)) / (dx * dx))
        }
        (2, true) => {
            let forward = roll_forward(values, axis, step)?;
            let backward = roll_forward(values, axis, n - (step % n))?;
            Ok((&(&forward + &backward) - &(values * two)) / (dx * dx))
        }
        (order, _) => Err(AsperityError::UnsupportedDerivativeOrder(order)),
    }
}
