// In: src/surface/uniform.rs

//! Base entities living on uniform grids: the 1D line scan and the 2D
//! topography map.
//!
//! Both own their sample buffer immutably. Only `physical_sizes` and the
//! periodicity flag may be rebound after construction; the rebinding is
//! visible through every decorator sharing the entity.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use ndarray::{Array1, Array2};

use crate::error::AsperityError;
use crate::parallel::{Decomposition, Reduction, SerialReduction};
use crate::pipeline::state::SurfaceState;
use crate::surface::{
    load_flag, read_lock, store_flag, validate_physical_sizes, write_lock, HeightData, HeightField,
    InfoMap, Positions,
};

//==================================================================================
// 1. Uniform Line Scan
//==================================================================================

/// Line scan that lives on a uniform one-dimensional grid.
#[derive(Debug)]
pub struct UniformLineScan {
    data: HeightData,
    physical_size: RwLock<f64>,
    periodic: AtomicBool,
    info: InfoMap,
}

impl UniformLineScan {
    /// Builds a line scan from raw heights. Non-finite samples are masked as
    /// undefined automatically.
    pub fn new(
        heights: Array1<f64>,
        physical_size: f64,
        periodic: bool,
        info: InfoMap,
    ) -> Result<Self, AsperityError> {
        Self::from_data(
            HeightData::from_values(heights.into_dyn()),
            physical_size,
            periodic,
            info,
        )
    }

    pub(crate) fn from_data(
        data: HeightData,
        physical_size: f64,
        periodic: bool,
        info: InfoMap,
    ) -> Result<Self, AsperityError> {
        if data.ndim() != 1 {
            return Err(AsperityError::DimensionMismatch {
                expected: 1,
                actual: data.ndim(),
            });
        }
        if data.is_empty() {
            return Err(AsperityError::InsufficientGridPoints {
                needed: 1,
                actual: 0,
            });
        }
        validate_physical_sizes(&[physical_size])?;
        Ok(Self {
            data,
            physical_size: RwLock::new(physical_size),
            periodic: AtomicBool::new(periodic),
            info,
        })
    }
}

impl HeightField for UniformLineScan {
    fn dim(&self) -> usize {
        1
    }

    fn kind(&self) -> &'static str {
        "uniform line scan"
    }

    fn is_uniform(&self) -> bool {
        true
    }

    fn is_periodic(&self) -> bool {
        load_flag(&self.periodic)
    }

    fn set_periodic(&self, periodic: bool) -> Result<(), AsperityError> {
        store_flag(&self.periodic, periodic);
        Ok(())
    }

    fn physical_sizes(&self) -> Vec<f64> {
        vec![*read_lock(&self.physical_size)]
    }

    fn set_physical_sizes(&self, sizes: Vec<f64>) -> Result<(), AsperityError> {
        if sizes.len() != 1 {
            return Err(AsperityError::DimensionMismatch {
                expected: 1,
                actual: sizes.len(),
            });
        }
        validate_physical_sizes(&sizes)?;
        *write_lock(&self.physical_size) = sizes[0];
        Ok(())
    }

    fn nb_grid_pts(&self) -> Vec<usize> {
        vec![self.data.len()]
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
        let n = self.data.len();
        let p = *read_lock(&self.physical_size) / n as f64;
        Positions::Profile(Array1::from_iter((0..n).map(|i| i as f64 * p)))
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        Ok(SurfaceState::UniformLineScan {
            heights: self.data.values().iter().copied().collect(),
            mask: self.data.mask().map(|m| m.to_flags()),
            physical_size: *read_lock(&self.physical_size),
            periodic: self.is_periodic(),
            info: self.info.clone(),
        })
    }
}

//==================================================================================
// 2. Uniform 2D Topography Map
//==================================================================================

/// Topography that lives on a uniform two-dimensional grid, i.e. a
/// topography map. May hold only a rectangular subdomain of a global grid
/// when constructed with a [`Decomposition`].
#[derive(Debug)]
pub struct Topography {
    /// Local buffer; equals the global buffer for serial entities.
    data: HeightData,
    physical_sizes: RwLock<[f64; 2]>,
    periodic: AtomicBool,
    decomposition: Option<Decomposition>,
    reduction: Arc<dyn Reduction>,
    info: InfoMap,
}

impl Topography {
    /// Builds a serial (single-process) topography map from raw heights.
    /// Non-finite samples are masked as undefined automatically.
    pub fn new(
        heights: Array2<f64>,
        physical_sizes: [f64; 2],
        periodic: bool,
        info: InfoMap,
    ) -> Result<Self, AsperityError> {
        Self::from_data(
            HeightData::from_values(heights.into_dyn()),
            physical_sizes,
            periodic,
            info,
        )
    }

    /// Builds the local part of a decomposed topography map. `heights` is the
    /// subdomain buffer; its shape must match the decomposition descriptor.
    /// All global queries (`has_undefined_data`, statistics) become
    /// collective calls through `reduction`.
    pub fn with_decomposition(
        heights: Array2<f64>,
        physical_sizes: [f64; 2],
        periodic: bool,
        info: InfoMap,
        decomposition: Decomposition,
        reduction: Arc<dyn Reduction>,
    ) -> Result<Self, AsperityError> {
        decomposition.validate()?;
        let local = heights.dim();
        if [local.0, local.1] != decomposition.nb_subdomain_grid_pts {
            return Err(AsperityError::Decomposition(format!(
                "Local buffer shape {:?} does not equal `nb_subdomain_grid_pts` (= {:?}).",
                [local.0, local.1],
                decomposition.nb_subdomain_grid_pts
            )));
        }
        validate_physical_sizes(&physical_sizes)?;
        Ok(Self {
            data: HeightData::from_values(heights.into_dyn()),
            physical_sizes: RwLock::new(physical_sizes),
            periodic: AtomicBool::new(periodic),
            decomposition: Some(decomposition),
            reduction,
            info,
        })
    }

    pub(crate) fn from_data(
        data: HeightData,
        physical_sizes: [f64; 2],
        periodic: bool,
        info: InfoMap,
    ) -> Result<Self, AsperityError> {
        if data.ndim() != 2 {
            return Err(AsperityError::DimensionMismatch {
                expected: 2,
                actual: data.ndim(),
            });
        }
        if data.is_empty() {
            return Err(AsperityError::InsufficientGridPoints {
                needed: 1,
                actual: 0,
            });
        }
        validate_physical_sizes(&physical_sizes)?;
        Ok(Self {
            data,
            physical_sizes: RwLock::new(physical_sizes),
            periodic: AtomicBool::new(periodic),
            decomposition: None,
            reduction: Arc::new(SerialReduction),
            info,
        })
    }
}

impl HeightField for Topography {
    fn dim(&self) -> usize {
        2
    }

    fn kind(&self) -> &'static str {
        "topography map"
    }

    fn is_uniform(&self) -> bool {
        true
    }

    fn is_periodic(&self) -> bool {
        load_flag(&self.periodic)
    }

    fn set_periodic(&self, periodic: bool) -> Result<(), AsperityError> {
        store_flag(&self.periodic, periodic);
        Ok(())
    }

    fn physical_sizes(&self) -> Vec<f64> {
        read_lock(&self.physical_sizes).to_vec()
    }

    fn set_physical_sizes(&self, sizes: Vec<f64>) -> Result<(), AsperityError> {
        if sizes.len() != 2 {
            return Err(AsperityError::DimensionMismatch {
                expected: 2,
                actual: sizes.len(),
            });
        }
        validate_physical_sizes(&sizes)?;
        *write_lock(&self.physical_sizes) = [sizes[0], sizes[1]];
        Ok(())
    }

    fn nb_grid_pts(&self) -> Vec<usize> {
        match &self.decomposition {
            Some(d) => d.nb_grid_pts.to_vec(),
            None => self.data.shape().to_vec(),
        }
    }

    fn info(&self) -> InfoMap {
        self.info.clone()
    }

    fn has_undefined_data(&self) -> Result<bool, AsperityError> {
        self.reduction.any(self.data.has_undefined())
    }

    fn heights(&self) -> Result<HeightData, AsperityError> {
        Ok(self.data.clone())
    }

    fn positions(&self) -> Positions {
        let global = self.nb_grid_pts();
        let local = self.data.shape().to_vec();
        let sizes = *read_lock(&self.physical_sizes);
        let offsets = self.subdomain_locations();
        let x = Array2::from_shape_fn((local[0], local[1]), |(i, _)| {
            (offsets[0] + i) as f64 * sizes[0] / global[0] as f64
        });
        let y = Array2::from_shape_fn((local[0], local[1]), |(_, j)| {
            (offsets[1] + j) as f64 * sizes[1] / global[1] as f64
        });
        Positions::Map { x, y }
    }

    fn decomposition(&self) -> Option<Decomposition> {
        self.decomposition
    }

    fn reduction(&self) -> Arc<dyn Reduction> {
        Arc::clone(&self.reduction)
    }

    fn state(&self) -> Result<SurfaceState, AsperityError> {
        if self.decomposition.is_some() {
            // The state contract covers serial entities; a decomposed entity
            // would need every process's buffer to be reconstructable.
            return Err(AsperityError::UnsupportedOperation {
                operation: "state export".to_string(),
                kind: "a domain-decomposed topography map",
            });
        }
        let shape = self.data.shape();
        let sizes = *read_lock(&self.physical_sizes);
        Ok(SurfaceState::Topography {
            heights: self.data.values().iter().copied().collect(),
            nb_grid_pts: [shape[0], shape[1]],
            mask: self.data.mask().map(|m| m.to_flags()),
            physical_sizes: (sizes[0], sizes[1]),
            periodic: self.is_periodic(),
            info: self.info.clone(),
        })
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
