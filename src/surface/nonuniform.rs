// In: src/surface/nonuniform.rs

//! The base entity for line scans with variable sample spacing.
//!
//! A nonuniform line scan is never periodic and has no pixel size; its
//! physical size is the span of its position axis. Geometry is fixed at
//! construction, so the size/periodicity setters of the capability interface
//! are rejected here.

use ndarray::Array1;

use crate::error::AsperityError;
use crate::pipeline::state::SurfaceState;
use crate::surface::{HeightData, HeightField, InfoMap, Positions};

/// Line scan on a strictly increasing, variably spaced position axis.
#[derive(Debug)]
pub struct NonuniformLineScan {
    positions: Array1<f64>,
    data: HeightData,
    info: InfoMap,
}

impl NonuniformLineScan {
    /// Builds a nonuniform line scan. Positions must be finite and strictly
    /// increasing; non-finite heights are masked as undefined automatically.
    pub fn new(
        positions: Array1<f64>,
        heights: Array1<f64>,
        info: InfoMap,
    ) -> Result<Self, AsperityError> {
        Self::from_data(positions, HeightData::from_values(heights.into_dyn()), info)
    }

    pub(crate) fn from_data(
        positions: Array1<f64>,
        data: HeightData,
        info: InfoMap,
    ) -> Result<Self, AsperityError> {
        if data.ndim() != 1 {
            return Err(AsperityError::DimensionMismatch {
                expected: 1,
                actual: data.ndim(),
            });
        }
        if positions.len() != data.len() {
            return Err(AsperityError::IncompatibleSurfaces {
                attribute: "nb_grid_pts",
                left: format!("{:?}", [positions.len()]),
                right: format!("{:?}", [data.len()]),
            });
        }
        if positions.len() < 2 {
            return Err(AsperityError::InsufficientGridPoints {
                needed: 2,
                actual: positions.len(),
            });
        }
        for i in 0..positions.len() {
            let value = positions[i];
            if !value.is_finite() || (i > 0 && value <= positions[i - 1]) {
                return Err(AsperityError::NonMonotonicPositions { index: i, value });
            }
        }
        Ok(Self {
            positions,
            data,
            info,
        })
    }
}

impl HeightField for NonuniformLineScan {
    fn dim(&self) -> usize {
        1
    }

    fn kind(&self) -> &'static str {
        "nonuniform line scan"
    }

    fn is_uniform(&self) -> bool {
        false
    }

    fn is_periodic(&self) -> bool {
        false
    }

    fn set_periodic(&self, periodic: bool) -> Result<(), AsperityError> {
        if periodic {
            return Err(AsperityError::UnsupportedOperation {
                operation: "set_periodic".to_string(),
                kind: self.kind(),
            });
        }
        Ok(())
    }

    fn physical_sizes(&self) -> Vec<f64> {
        let n = self.positions.len();
        vec![self.positions[n - 1] - self.positions[0]]
    }

    fn set_physical_sizes(&self, _sizes: Vec<f64>) -> Result<(), AsperityError> {
        // The size of a nonuniform scan is implied by its position axis.
        Err(AsperityError::UnsupportedOperation {
            operation: "set_physical_sizes".to_string(),
            kind: self.kind(),
        })
    }

    fn nb_grid_pts(&self) -> Vec<usize> {
        vec![self.positions.len()]
    }

    fn info(&self) -> InfoMap {
        self.info.clone()
    }

    fn has_undefined_data(&self) -> Result<bool, AsperityError> {
        Ok(self.data.has_undefined())
    }

    fn heights(&self) -> Result<HeightData, AsperityError> {
        Ok(self.data.clone())
    }

    fn positions(&self) -> Positions {
        Positions::Profile(self.positions.clone())
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        Ok(SurfaceState::NonuniformLineScan {
            positions: self.positions.to_vec(),
            heights: self.data.values().iter().copied().collect(),
            mask: self.data.mask().map(|m| m.to_flags()),
            info: self.info.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_geometry() {
        let t = NonuniformLineScan::new(
            array![0.0, 0.5, 2.0, 3.0],
            array![1.0, 2.0, 3.0, 4.0],
            InfoMap::new(),
        )
        .unwrap();
        assert_eq!(t.dim(), 1);
        assert!(!t.is_uniform());
        assert!(!t.is_periodic());
        assert_eq!(t.physical_sizes(), vec![3.0]);
        assert_eq!(t.pixel_size(), None);
        assert_eq!(t.nb_grid_pts(), vec![4]);
    }

    #[test]
    fn test_rejects_non_monotonic_positions() {
        let err = NonuniformLineScan::new(
            array![0.0, 2.0, 1.0],
            array![1.0, 2.0, 3.0],
            InfoMap::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AsperityError::NonMonotonicPositions { index: 2, .. }
        ));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = NonuniformLineScan::new(array![0.0, 1.0], array![1.0], InfoMap::new())
            .unwrap_err();
        assert!(matches!(err, AsperityError::IncompatibleSurfaces { .. }));
    }

    #[test]
    fn test_setters_are_rejected() {
        let t = NonuniformLineScan::new(array![0.0, 1.0], array![1.0, 2.0], InfoMap::new())
            .unwrap();
        assert!(t.set_periodic(true).is_err());
        assert!(t.set_periodic(false).is_ok());
        assert!(t.set_physical_sizes(vec![5.0]).is_err());
    }
}
