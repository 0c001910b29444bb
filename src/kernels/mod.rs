// In: src/kernels/mod.rs

//! This module serves as the collection of all pure, stateless numerical
//! kernels of the crate.
//!
//! Kernels know nothing about entities or the decorator chain; they operate
//! on bare buffers and are dispatched by the analysis layer, which owns the
//! entity-level orchestration (grid kind, periodicity, axis handling).

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Finite differences on constant-spacing grids (periodic and non-periodic).
pub mod uniform;

/// Finite differences on variable-spacing grids.
pub mod nonuniform;

/// Least-squares polynomial fitting for the detrending transforms.
pub mod polyfit;
