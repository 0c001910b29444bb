// In: src/pipeline/compound.rs

//! Decorator behaving like the sum of two topographies.
//!
//! The two parents must describe the same grid: `dim`, `nb_grid_pts` and
//! `physical_sizes` have to agree exactly, and a mismatch fails at
//! construction with an error quoting both conflicting values. The combined
//! attributes are captured at construction time.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AsperityError;
use crate::pipeline::state::SurfaceState;
use crate::surface::{HeightData, HeightField, InfoMap, Positions};

#[derive(Debug)]
pub struct CompoundTopography {
    parent_a: Arc<dyn HeightField>,
    parent_b: Arc<dyn HeightField>,
    dim: usize,
    nb_grid_pts: Vec<usize>,
    physical_sizes: Vec<f64>,
}

/// Both parents carry a value for the attribute, so they must agree; the
/// error reports the attribute name and both values.
fn combined<T: PartialEq + Debug>(
    attribute: &'static str,
    a: T,
    b: T,
) -> Result<T, AsperityError> {
    if a == b {
        Ok(a)
    } else {
        Err(AsperityError::IncompatibleSurfaces {
            attribute,
            left: format!("{:?}", a),
            right: format!("{:?}", b),
        })
    }
}

impl CompoundTopography {
    pub fn new(
        parent_a: Arc<dyn HeightField>,
        parent_b: Arc<dyn HeightField>,
    ) -> Result<Self, AsperityError> {
        let dim = combined("dim", parent_a.dim(), parent_b.dim())?;
        let nb_grid_pts = combined(
            "nb_grid_pts",
            parent_a.nb_grid_pts(),
            parent_b.nb_grid_pts(),
        )?;
        let physical_sizes = combined(
            "physical_sizes",
            parent_a.physical_sizes(),
            parent_b.physical_sizes(),
        )?;
        Ok(Self {
            parent_a,
            parent_b,
            dim,
            nb_grid_pts,
            physical_sizes,
        })
    }
}

impl HeightField for CompoundTopography {
    fn dim(&self) -> usize {
        self.dim
    }

    fn kind(&self) -> &'static str {
        "compound topography"
    }

    fn is_uniform(&self) -> bool {
        self.parent_a.is_uniform() && self.parent_b.is_uniform()
    }

    fn is_periodic(&self) -> bool {
        self.parent_a.is_periodic() && self.parent_b.is_periodic()
    }

    fn set_periodic(&self, _periodic: bool) -> Result<(), AsperityError> {
        // Rebinding through a compound is ambiguous; the caller must address
        // one of the parents directly.
        Err(AsperityError::UnsupportedOperation {
            operation: "set_periodic".to_string(),
            kind: self.kind(),
        })
    }

    fn physical_sizes(&self) -> Vec<f64> {
        self.physical_sizes.clone()
    }

    fn set_physical_sizes(&self, _sizes: Vec<f64>) -> Result<(), AsperityError> {
        Err(AsperityError::UnsupportedOperation {
            operation: "set_physical_sizes".to_string(),
            kind: self.kind(),
        })
    }

    fn nb_grid_pts(&self) -> Vec<usize> {
        self.nb_grid_pts.clone()
    }

    fn info(&self) -> InfoMap {
        InfoMap::new()
    }

    fn has_undefined_data(&self) -> Result<bool, AsperityError> {
        Ok(self.parent_a.has_undefined_data()? || self.parent_b.has_undefined_data()?)
    }

    fn heights(&self) -> Result<HeightData, AsperityError> {
        self.parent_a
            .heights()?
            .try_add(&self.parent_b.heights()?)
    }

    fn positions(&self) -> Positions {
        self.parent_a.positions()
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        Ok(SurfaceState::Compound {
            a: Box::new(self.parent_a.state()?),
            b: Box::new(self.parent_b.state()?),
        })
    }
}
