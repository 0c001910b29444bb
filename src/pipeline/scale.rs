// In: src/pipeline/scale.rs

//! Decorator multiplying every height of its parent by a constant factor.

use std::sync::Arc;

use crate::error::AsperityError;
use crate::parallel::{Decomposition, Reduction};
use crate::pipeline::state::SurfaceState;
use crate::surface::{HeightData, HeightField, InfoMap, Positions};

/// Used when geometries are rescaled. Works on any parent entity; the
/// validity channel passes through unchanged.
#[derive(Debug)]
pub struct ScaledTopography {
    parent: Arc<dyn HeightField>,
    factor: f64,
}

impl ScaledTopography {
    pub fn new(parent: Arc<dyn HeightField>, factor: f64) -> Self {
        Self { parent, factor }
    }

    pub fn scale_factor(&self) -> f64 {
        self.factor
    }
}

impl HeightField for ScaledTopography {
    fn dim(&self) -> usize {
        self.parent.dim()
    }

    fn kind(&self) -> &'static str {
        "scaled topography"
    }

    fn is_uniform(&self) -> bool {
        self.parent.is_uniform()
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
        let factor = self.factor;
        Ok(self.parent.heights()?.map(|v| factor * v))
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
        Ok(SurfaceState::Scaled {
            parent: Box::new(self.parent.state()?),
            factor: self.factor,
        })
    }
}
