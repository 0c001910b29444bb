// In: src/error.rs

//! This module defines the single, unified error type for the entire asperity library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AsperityError {
    // =========================================================================
    // === Input Validation Errors (user-facing, recoverable by the caller)
    // =========================================================================
    #[error("Heights array must be {expected}-dimensional, got rank {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Physical sizes must be positive, got {0}.")]
    InvalidPhysicalSize(f64),

    #[error("Positions of a nonuniform line scan must be strictly increasing (x[{index}] = {value} does not increase).")]
    NonMonotonicPositions { index: usize, value: f64 },

    #[error("Grid is too small for this operation: need at least {needed} points along the differencing axis, got {actual}.")]
    InsufficientGridPoints { needed: usize, actual: usize },

    #[error("Buffer length mismatch: the grid shape implies {expected} samples, got {actual}.")]
    BufferMismatch { expected: usize, actual: usize },

    #[error("Unsupported detrend mode '{mode}' for {kind}.")]
    UnsupportedDetrendMode { mode: String, kind: String },

    #[error("Unsupported derivative order {0}; only first and second derivatives are available.")]
    UnsupportedDerivativeOrder(u8),

    #[error("Unknown rms height kind '{0}'.")]
    UnsupportedRmsKind(String),

    #[error("{attribute} incompatible: {left} <-> {right}")]
    IncompatibleSurfaces {
        attribute: &'static str,
        left: String,
        right: String,
    },

    #[error("Physical sizes given by the caller (= {supplied}) differ from the sizes recorded in the metadata (= {recorded}).")]
    MetadataConflict { supplied: String, recorded: String },

    #[error("Surface has undefined data points; {0} requires fully defined heights.")]
    UndefinedData(&'static str),

    #[error("Operation '{operation}' is not supported on {kind}.")]
    UnsupportedOperation {
        operation: String,
        kind: &'static str,
    },

    // =========================================================================
    // === Internal Invariant Violations (indicate a bug, not bad input)
    // =========================================================================
    #[error("Internal logic error (this is a bug): {0}")]
    Internal(String),

    #[error("Malformed domain decomposition: {0}")]
    Decomposition(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error from the Serde JSON library, typically during state serialization.
    #[error("State serialization failed: {0}")]
    State(#[from] serde_json::Error),

    /// An error reported by the collective-reduction collaborator.
    #[error("Collective reduction failed: {0}")]
    Reduction(String),
}
