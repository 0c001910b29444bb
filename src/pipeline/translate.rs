// In: src/pipeline/translate.rs

//! Decorator circularly shifting a 2D map by whole grid points. Only defined
//! for uniform topography maps; physical size and resolution are unchanged.

use std::sync::Arc;

use ndarray::{Array2, Ix2};

use crate::error::AsperityError;
use crate::parallel::Reduction;
use crate::pipeline::state::SurfaceState;
use crate::surface::{HeightData, HeightField, InfoMap, Positions};
use crate::validity::ValidityMask;

#[derive(Debug)]
pub struct TranslatedTopography {
    parent: Arc<dyn HeightField>,
    offset: (isize, isize),
}

impl TranslatedTopography {
    /// Wraps a uniform 2D map. `offset` is the translation in grid points
    /// along each axis; samples shifted out on one side re-enter on the
    /// other.
    pub fn new(
        parent: Arc<dyn HeightField>,
        offset: (isize, isize),
    ) -> Result<Self, AsperityError> {
        if parent.dim() != 2 || !parent.is_uniform() {
            return Err(AsperityError::UnsupportedOperation {
                operation: "translate".to_string(),
                kind: parent.kind(),
            });
        }
        if parent.decomposition().is_some() {
            // A circular shift moves samples across subdomain boundaries,
            // which would require neighbor communication.
            return Err(AsperityError::UnsupportedOperation {
                operation: "translate".to_string(),
                kind: "a domain-decomposed topography map",
            });
        }
        Ok(Self { parent, offset })
    }

    pub fn offset(&self) -> (isize, isize) {
        self.offset
    }

    pub fn set_offset(&mut self, offset: (isize, isize)) {
        self.offset = offset;
    }
}

/// `result[i, j] = src[(i - oi) mod nx, (j - oj) mod ny]`, i.e. the content
/// moves forward by the offset.
fn roll2<T: Copy>(src: &Array2<T>, offset: (isize, isize)) -> Array2<T> {
    let (nx, ny) = src.dim();
    Array2::from_shape_fn((nx, ny), |(i, j)| {
        let si = (i as isize - offset.0).rem_euclid(nx as isize) as usize;
        let sj = (j as isize - offset.1).rem_euclid(ny as isize) as usize;
        src[[si, sj]]
    })
}

impl HeightField for TranslatedTopography {
    fn dim(&self) -> usize {
        self.parent.dim()
    }

    fn kind(&self) -> &'static str {
        "translated topography"
    }

    fn is_uniform(&self) -> bool {
        true
    }

    fn is_periodic(&self) -> bool {
        self.parent.is_periodic()
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
        let values = values
            .into_dimensionality::<Ix2>()
            .map_err(|e| AsperityError::Internal(e.to_string()))?;
        let rolled = roll2(&values, self.offset).into_dyn();
        let mask = match mask {
            Some(m) => {
                let flags = m
                    .to_array()
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| AsperityError::Internal(e.to_string()))?;
                Some(ValidityMask::from_array(
                    &roll2(&flags, self.offset).into_dyn(),
                ))
            }
            None => None,
        };
        HeightData::new(rolled, mask)
    }

    fn positions(&self) -> Positions {
        self.parent.positions()
    }

    fn reduction(&self) -> Arc<dyn Reduction> {
        self.parent.reduction()
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        Ok(SurfaceState::Translated {
            parent: Box::new(self.parent.state()?),
            offset: [self.offset.0, self.offset.1],
        })
    }
}
