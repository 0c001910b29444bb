// In: src/pipeline/state.rs

//! The state export/import contract.
//!
//! An entity's state is the nesting of (class identity, constructor
//! arguments) through its whole decorator chain, enough to reconstruct the
//! chain on the other side of any transport. This module defines the
//! serializable representation and the rebuild logic; no file format is
//! implied, only JSON helpers for convenience.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::AsperityError;
use crate::pipeline::{
    CompoundTopography, DetrendedTopography, ScaledTopography, TranslatedTopography,
    TransposedTopography,
};
use crate::surface::{
    HeightData, HeightField, InfoMap, NonuniformLineScan, Topography, UniformLineScan,
};
use crate::types::DetrendMode;
use crate::validity::ValidityMask;

/// Class identity plus constructor arguments for every entity type, nested
/// through `parent` boxes for decorators. Height buffers are flattened in
/// row-major order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum SurfaceState {
    UniformLineScan {
        heights: Vec<f64>,
        mask: Option<Vec<bool>>,
        physical_size: f64,
        periodic: bool,
        info: InfoMap,
    },
    Topography {
        heights: Vec<f64>,
        nb_grid_pts: [usize; 2],
        mask: Option<Vec<bool>>,
        physical_sizes: (f64, f64),
        periodic: bool,
        info: InfoMap,
    },
    NonuniformLineScan {
        positions: Vec<f64>,
        heights: Vec<f64>,
        mask: Option<Vec<bool>>,
        info: InfoMap,
    },
    Scaled {
        parent: Box<SurfaceState>,
        factor: f64,
    },
    Detrended {
        parent: Box<SurfaceState>,
        mode: DetrendMode,
    },
    Transposed {
        parent: Box<SurfaceState>,
    },
    Translated {
        parent: Box<SurfaceState>,
        offset: [isize; 2],
    },
    Compound {
        a: Box<SurfaceState>,
        b: Box<SurfaceState>,
    },
}

fn height_data_1d(
    heights: Vec<f64>,
    mask: &Option<Vec<bool>>,
) -> Result<HeightData, AsperityError> {
    let n = heights.len();
    let values = Array1::from_vec(heights).into_dyn();
    match mask {
        Some(flags) => HeightData::new(values, Some(ValidityMask::from_flags(&[n], flags)?)),
        None => Ok(HeightData::from_values(values)),
    }
}

fn height_data_2d(
    heights: Vec<f64>,
    nb_grid_pts: [usize; 2],
    mask: &Option<Vec<bool>>,
) -> Result<HeightData, AsperityError> {
    let values = Array2::from_shape_vec((nb_grid_pts[0], nb_grid_pts[1]), heights)
        .map_err(|e| AsperityError::Internal(format!("Malformed topography state: {}", e)))?
        .into_dyn();
    match mask {
        Some(flags) => HeightData::new(
            values,
            Some(ValidityMask::from_flags(&nb_grid_pts, flags)?),
        ),
        None => Ok(HeightData::from_values(values)),
    }
}

impl SurfaceState {
    /// Reconstructs the entity chain this state was exported from.
    pub fn build(&self) -> Result<Arc<dyn HeightField>, AsperityError> {
        match self {
            SurfaceState::UniformLineScan {
                heights,
                mask,
                physical_size,
                periodic,
                info,
            } => Ok(Arc::new(UniformLineScan::from_data(
                height_data_1d(heights.clone(), mask)?,
                *physical_size,
                *periodic,
                info.clone(),
            )?)),
            SurfaceState::Topography {
                heights,
                nb_grid_pts,
                mask,
                physical_sizes,
                periodic,
                info,
            } => Ok(Arc::new(Topography::from_data(
                height_data_2d(heights.clone(), *nb_grid_pts, mask)?,
                [physical_sizes.0, physical_sizes.1],
                *periodic,
                info.clone(),
            )?)),
            SurfaceState::NonuniformLineScan {
                positions,
                heights,
                mask,
                info,
            } => Ok(Arc::new(NonuniformLineScan::from_data(
                Array1::from_vec(positions.clone()),
                height_data_1d(heights.clone(), mask)?,
                info.clone(),
            )?)),
            SurfaceState::Scaled { parent, factor } => Ok(Arc::new(ScaledTopography::new(
                parent.build()?,
                *factor,
            ))),
            SurfaceState::Detrended { parent, mode } => Ok(Arc::new(
                DetrendedTopography::new(parent.build()?, *mode)?,
            )),
            SurfaceState::Transposed { parent } => {
                Ok(Arc::new(TransposedTopography::new(parent.build()?)))
            }
            SurfaceState::Translated { parent, offset } => Ok(Arc::new(
                TranslatedTopography::new(parent.build()?, (offset[0], offset[1]))?,
            )),
            SurfaceState::Compound { a, b } => Ok(Arc::new(CompoundTopography::new(
                a.build()?,
                b.build()?,
            )?)),
        }
    }

    /// Serializes the state to JSON for transport.
    pub fn to_json(&self) -> Result<String, AsperityError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a state from JSON.
    pub fn from_json(json: &str) -> Result<Self, AsperityError> {
        Ok(serde_json::from_str(json)?)
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_line_scan_state_roundtrip() {
        let scan = UniformLineScan::new(
            array![0.0, 1.0, 0.5, 2.0],
            2.5,
            true,
            InfoMap::new(),
        )
        .unwrap();
        let state = scan.state().unwrap();
        let json = state.to_json().unwrap();
        assert!(json.contains("\"class\":\"uniform_line_scan\""));
        let rebuilt = SurfaceState::from_json(&json).unwrap().build().unwrap();
        assert_eq!(rebuilt.heights().unwrap(), scan.heights().unwrap());
        assert_eq!(rebuilt.physical_sizes(), scan.physical_sizes());
        assert!(rebuilt.is_periodic());
    }

    #[test]
    fn test_state_preserves_mask_of_finite_masked_values() {
        // A mask injected through state import must survive even though the
        // underlying values are finite.
        let state = SurfaceState::UniformLineScan {
            heights: vec![1.0, 2.0, 3.0],
            mask: Some(vec![true, false, true]),
            physical_size: 1.0,
            periodic: false,
            info: InfoMap::new(),
        };
        let rebuilt = state.build().unwrap();
        assert!(rebuilt.has_undefined_data().unwrap());
    }

    #[test]
    fn test_malformed_topography_state_fails() {
        let state = SurfaceState::Topography {
            heights: vec![0.0; 5],
            nb_grid_pts: [2, 3],
            mask: None,
            physical_sizes: (1.0, 1.0),
            periodic: false,
            info: InfoMap::new(),
        };
        assert!(matches!(
            state.build(),
            Err(AsperityError::Internal(_))
        ));
    }
}
