//! This file is the root of the `asperity` Rust crate.
//!
//! asperity analyzes measured or synthetic surface-height data for
//! roughness and contact-mechanics research. The crate's core is the
//! composable topography pipeline: a capability interface shared by all
//! height-field representations, lazily-evaluated decorator transforms
//! (scale, detrend, translate, transpose, compound), a finite-difference
//! derivative engine for uniform and nonuniform grids, and the roughness
//! statistics built on top. File-format readers, plotting and job
//! scheduling live in external collaborators; they talk to this crate
//! through the `bridge` payloads and the `parallel::Reduction` contract.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod analysis;
pub mod bridge;
pub mod config;
pub mod error;
pub mod kernels;
pub mod parallel;
pub mod pipeline;
pub mod surface;
pub mod types;
pub mod validity;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use analysis::{DerivativeOptions, SurfaceAnalysis};
pub use config::{CoreConfig, SizeMismatchPolicy};
pub use error::AsperityError;
pub use parallel::{Decomposition, Reduction, SerialReduction};
pub use pipeline::{
    apply, register_operation, Operation, OperationOutput, PipelineExt, SurfaceState,
};
pub use surface::{
    HeightData, HeightField, InfoMap, NonuniformLineScan, Positions, Topography, UniformLineScan,
};
pub use types::{DetrendMode, HeightKind};
pub use validity::ValidityMask;
