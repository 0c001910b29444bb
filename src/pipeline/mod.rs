// In: src/pipeline/mod.rs

//! The composable transformation pipeline.
//!
//! Calling a registered operation on any entity either computes a scalar
//! eagerly (analysis operations) or wraps the entity in a new decorator
//! implementing the same capability interface (pipeline operations).
//! Decorators can be chained arbitrarily; evaluation stays lazy until a
//! terminal consumer pulls `heights()` through the chain.
//!
//! Dispatch is a closed, strongly-typed [`Operation`] enum (every built-in
//! operation is a compile-time variant) with a single `custom` slot backed
//! by a process-wide registry for operations attached at runtime, so new
//! analyses never require touching entity types.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::analysis::SurfaceAnalysis;
use crate::error::AsperityError;
use crate::surface::{read_lock, write_lock, HeightField};
use crate::types::{DetrendMode, HeightKind};

//==================================================================================
// 1. Module Declarations
//==================================================================================

mod compound;
mod detrend;
mod scale;
pub mod state;
mod translate;
mod transpose;

pub use compound::CompoundTopography;
pub use detrend::DetrendedTopography;
pub use scale::ScaledTopography;
pub use state::SurfaceState;
pub use translate::TranslatedTopography;
pub use transpose::TransposedTopography;


//==================================================================================
// 2. Operation Dispatch
//==================================================================================

/// Every operation reachable through dynamic dispatch. Analysis variants
/// produce a scalar; pipeline variants produce a new decorated entity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Mean,
    Min,
    Max,
    RmsHeight {
        #[serde(default)]
        kind: HeightKind,
    },
    RmsSlope,
    RmsLaplacian,
    RmsCurvature,
    Scale {
        factor: f64,
    },
    Detrend {
        #[serde(default)]
        mode: DetrendMode,
    },
    Transpose,
    Translate {
        offset: [isize; 2],
    },
    /// Runtime-extension slot: looks the name up in the process-wide
    /// registry populated by [`register_operation`].
    Custom {
        name: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

/// The result of a dispatched operation.
pub enum OperationOutput {
    Scalar(f64),
    Surface(Arc<dyn HeightField>),
}

impl OperationOutput {
    pub fn scalar(&self) -> Result<f64, AsperityError> {
        match self {
            OperationOutput::Scalar(v) => Ok(*v),
            OperationOutput::Surface(s) => Err(AsperityError::Internal(format!(
                "Expected a scalar result, got a {}.",
                s.kind()
            ))),
        }
    }

    pub fn surface(&self) -> Result<Arc<dyn HeightField>, AsperityError> {
        match self {
            OperationOutput::Surface(s) => Ok(Arc::clone(s)),
            OperationOutput::Scalar(v) => Err(AsperityError::Internal(format!(
                "Expected an entity result, got the scalar {}.",
                v
            ))),
        }
    }
}

impl fmt::Debug for OperationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutput::Scalar(v) => write!(f, "Scalar({})", v),
            OperationOutput::Surface(s) => write!(f, "Surface({})", s.kind()),
        }
    }
}

/// Signature of a runtime-registered operation.
pub type CustomOperation = Arc<
    dyn Fn(&Arc<dyn HeightField>, &serde_json::Value) -> Result<OperationOutput, AsperityError>
        + Send
        + Sync,
>;

static CUSTOM_OPERATIONS: Lazy<RwLock<HashMap<String, CustomOperation>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers (or replaces) a custom operation under `name`, making it
/// dispatchable on every entity without modifying any entity type.
pub fn register_operation(name: impl Into<String>, operation: CustomOperation) {
    let name = name.into();
    log::debug!("Registering custom operation '{}'.", name);
    write_lock(&CUSTOM_OPERATIONS).insert(name, operation);
}

/// The single, unified dispatcher. Looks up `op` and forwards the entity
/// plus arguments; an unregistered custom name fails with an error naming
/// both the operation and the entity kind.
pub fn apply(
    surface: &Arc<dyn HeightField>,
    op: &Operation,
) -> Result<OperationOutput, AsperityError> {
    log::debug!("Dispatching {:?} on {}.", op, surface.kind());
    match op {
        Operation::Mean => Ok(OperationOutput::Scalar(surface.mean()?)),
        Operation::Min => Ok(OperationOutput::Scalar(surface.min()?)),
        Operation::Max => Ok(OperationOutput::Scalar(surface.max()?)),
        Operation::RmsHeight { kind } => {
            Ok(OperationOutput::Scalar(surface.rms_height(*kind)?))
        }
        Operation::RmsSlope => Ok(OperationOutput::Scalar(surface.rms_slope()?)),
        Operation::RmsLaplacian => Ok(OperationOutput::Scalar(surface.rms_laplacian()?)),
        Operation::RmsCurvature => Ok(OperationOutput::Scalar(surface.rms_curvature()?)),
        Operation::Scale { factor } => Ok(OperationOutput::Surface(surface.scale(*factor))),
        Operation::Detrend { mode } => {
            Ok(OperationOutput::Surface(surface.detrend(*mode)?))
        }
        Operation::Transpose => Ok(OperationOutput::Surface(surface.transpose())),
        Operation::Translate { offset } => Ok(OperationOutput::Surface(
            surface.translate((offset[0], offset[1]))?,
        )),
        Operation::Custom { name, params } => {
            let operation = read_lock(&CUSTOM_OPERATIONS).get(name).cloned();
            match operation {
                Some(f) => f(surface, params),
                None => Err(AsperityError::UnsupportedOperation {
                    operation: name.clone(),
                    kind: surface.kind(),
                }),
            }
        }
    }
}

//==================================================================================
// 3. Pipeline Construction Interface
//==================================================================================

/// Chainable constructors for the decorator transforms, available on any
/// shared entity handle.
pub trait PipelineExt {
    /// Multiplies all heights by `factor`.
    fn scale(&self, factor: f64) -> Arc<dyn HeightField>;

    /// Removes the polynomial trend selected by `mode`.
    fn detrend(&self, mode: DetrendMode) -> Result<Arc<dyn HeightField>, AsperityError>;

    /// Swaps the axis order (identity on line scans).
    fn transpose(&self) -> Arc<dyn HeightField>;

    /// Circularly shifts a 2D map by whole grid points.
    fn translate(&self, offset: (isize, isize)) -> Result<Arc<dyn HeightField>, AsperityError>;

    /// Sums this entity with another one defined on the same grid.
    fn compound_with(
        &self,
        other: &Arc<dyn HeightField>,
    ) -> Result<Arc<dyn HeightField>, AsperityError>;
}

impl PipelineExt for Arc<dyn HeightField> {
    fn scale(&self, factor: f64) -> Arc<dyn HeightField> {
        Arc::new(ScaledTopography::new(Arc::clone(self), factor))
    }

    fn detrend(&self, mode: DetrendMode) -> Result<Arc<dyn HeightField>, AsperityError> {
        Ok(Arc::new(DetrendedTopography::new(Arc::clone(self), mode)?))
    }

    fn transpose(&self) -> Arc<dyn HeightField> {
        Arc::new(TransposedTopography::new(Arc::clone(self)))
    }

    fn translate(&self, offset: (isize, isize)) -> Result<Arc<dyn HeightField>, AsperityError> {
        Ok(Arc::new(TranslatedTopography::new(Arc::clone(self), offset)?))
    }

    fn compound_with(
        &self,
        other: &Arc<dyn HeightField>,
    ) -> Result<Arc<dyn HeightField>, AsperityError> {
        Ok(Arc::new(CompoundTopography::new(
            Arc::clone(self),
            Arc::clone(other),
        )?))
    }
}
