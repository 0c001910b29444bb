// In: src/pipeline/transpose.rs

//! Decorator swapping the axis order of a 2D map. Buffer, grid counts,
//! physical sizes and positions are all presented in swapped order; applying
//! the transpose twice is the identity. Line scans pass through unchanged.

use std::sync::Arc;

use crate::error::AsperityError;
use crate::parallel::{Decomposition, Reduction};
use crate::pipeline::state::SurfaceState;
use crate::surface::{HeightData, HeightField, InfoMap, Positions};
use crate::validity::ValidityMask;

#[derive(Debug)]
pub struct TransposedTopography {
    parent: Arc<dyn HeightField>,
}

impl TransposedTopography {
    pub fn new(parent: Arc<dyn HeightField>) -> Self {
        Self { parent }
    }
}

impl HeightField for TransposedTopography {
    fn dim(&self) -> usize {
        self.parent.dim()
    }

    fn kind(&self) -> &'static str {
        "transposed topography"
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
        let mut sizes = self.parent.physical_sizes();
        sizes.reverse();
        sizes
    }

    fn set_physical_sizes(&self, mut sizes: Vec<f64>) -> Result<(), AsperityError> {
        // Sizes arrive in this entity's (swapped) axis order; undo the swap
        // before forwarding so the rebinding lands on the right parent axes.
        sizes.reverse();
        self.parent.set_physical_sizes(sizes)
    }

    fn nb_grid_pts(&self) -> Vec<usize> {
        let mut pts = self.parent.nb_grid_pts();
        pts.reverse();
        pts
    }

    fn info(&self) -> InfoMap {
        self.parent.info()
    }

    fn has_undefined_data(&self) -> Result<bool, AsperityError> {
        self.parent.has_undefined_data()
    }

    fn heights(&self) -> Result<HeightData, AsperityError> {
        let data = self.parent.heights()?;
        if data.ndim() == 1 {
            return Ok(data);
        }
        let (values, mask) = data.into_parts();
        let transposed = values.reversed_axes();
        let mask = mask.map(|m| ValidityMask::from_array(&m.to_array().reversed_axes()));
        HeightData::new(transposed.as_standard_layout().to_owned(), mask)
    }

    fn positions(&self) -> Positions {
        match self.parent.positions() {
            Positions::Profile(x) => Positions::Profile(x),
            Positions::Map { x, y } => Positions::Map {
                x: y.t().as_standard_layout().to_owned(),
                y: x.t().as_standard_layout().to_owned(),
            },
        }
    }

    fn decomposition(&self) -> Option<Decomposition> {
        self.parent.decomposition().map(|d| Decomposition {
            nb_grid_pts: [d.nb_grid_pts[1], d.nb_grid_pts[0]],
            subdomain_locations: [d.subdomain_locations[1], d.subdomain_locations[0]],
            nb_subdomain_grid_pts: [d.nb_subdomain_grid_pts[1], d.nb_subdomain_grid_pts[0]],
        })
    }

    fn reduction(&self) -> Arc<dyn Reduction> {
        self.parent.reduction()
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        Ok(SurfaceState::Transposed {
            parent: Box::new(self.parent.state()?),
        })
    }
}
