// In: src/surface/mod.rs

//! The capability interface shared by every height-field representation, and
//! the base entities that own raw sample buffers.
//!
//! Everything downstream (decorators, the derivative engine, the roughness
//! statistics) talks to a `dyn HeightField` and never to a concrete entity.
//! Decorators hold shared (`Arc`) references to their parents, so one base
//! entity may be the root of several independent chains simultaneously.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::AsperityError;
use crate::parallel::{Decomposition, Reduction, SerialReduction};
use crate::pipeline::state::SurfaceState;

mod data;
mod nonuniform;
mod uniform;

pub use data::{HeightData, Positions};
pub use nonuniform::NonuniformLineScan;
pub use uniform::{Topography, UniformLineScan};

/// Free-form auxiliary metadata attached to an entity. Never interpreted by
/// the core except for the soft physical-size consistency check at the
/// bridge; third-party code may store anything here. Copied on construction,
/// never aliased between entities.
pub type InfoMap = serde_json::Map<String, serde_json::Value>;

/// Read-only contract every entity, base or decorated, must satisfy.
///
/// `heights()` pulls lazily through the whole decorator chain back to the
/// base buffer on every call; nothing is cached. Rebinding a base entity's
/// size or periodicity is therefore observed by every consumer still holding
/// a reference anywhere along a chain.
pub trait HeightField: Send + Sync + std::fmt::Debug {
    /// Dimensionality of the height buffer (1 or 2).
    fn dim(&self) -> usize;

    /// Human-readable entity label, used in error messages.
    fn kind(&self) -> &'static str;

    /// Whether samples live on a constant-spacing grid.
    fn is_uniform(&self) -> bool;

    /// Whether the grid is one period of an infinitely tiled surface.
    fn is_periodic(&self) -> bool;

    /// Rebinds the periodicity flag on the underlying base entity.
    fn set_periodic(&self, periodic: bool) -> Result<(), AsperityError>;

    /// Physical size per axis, same length as `dim()`.
    fn physical_sizes(&self) -> Vec<f64>;

    /// Rebinds the physical sizes on the underlying base entity. Decorators
    /// forward this up the chain; the rebinding is shared, not copied.
    fn set_physical_sizes(&self, sizes: Vec<f64>) -> Result<(), AsperityError>;

    /// Grid points per axis (global counts for decomposed entities).
    fn nb_grid_pts(&self) -> Vec<usize>;

    /// Sample spacing per axis; `None` on nonuniform grids.
    fn pixel_size(&self) -> Option<Vec<f64>> {
        if !self.is_uniform() {
            return None;
        }
        Some(
            self.physical_sizes()
                .iter()
                .zip(self.nb_grid_pts())
                .map(|(s, n)| s / n as f64)
                .collect(),
        )
    }

    /// Physical area (or length) per grid point; `None` on nonuniform grids.
    fn area_per_pt(&self) -> Option<f64> {
        self.pixel_size().map(|p| p.iter().product())
    }

    /// A copy of the entity's metadata map.
    fn info(&self) -> InfoMap;

    /// True iff any sample is undefined, on *any* process for decomposed
    /// entities, which makes this a collective call.
    fn has_undefined_data(&self) -> Result<bool, AsperityError>;

    /// The (local) height buffer, recomputed through the chain on each call.
    fn heights(&self) -> Result<HeightData, AsperityError>;

    /// The (local) grid positions, offset by the subdomain location.
    fn positions(&self) -> Positions;

    fn positions_and_heights(&self) -> Result<(Positions, HeightData), AsperityError> {
        Ok((self.positions(), self.heights()?))
    }

    /// Subdomain descriptor; `None` for serial entities.
    fn decomposition(&self) -> Option<Decomposition> {
        None
    }

    /// The collective-reduction collaborator tied to this entity.
    fn reduction(&self) -> Arc<dyn Reduction> {
        Arc::new(SerialReduction)
    }

    /// Shape of the local buffer (equals `nb_grid_pts` when serial).
    fn nb_subdomain_grid_pts(&self) -> Vec<usize> {
        match self.decomposition() {
            Some(d) => d.nb_subdomain_grid_pts.to_vec(),
            None => self.nb_grid_pts(),
        }
    }

    /// Origin of the local buffer within the global grid.
    fn subdomain_locations(&self) -> Vec<usize> {
        match self.decomposition() {
            Some(d) => d.subdomain_locations.to_vec(),
            None => vec![0; self.dim()],
        }
    }

    /// Exports the full decorator chain as nested constructor arguments,
    /// sufficient to reconstruct the entity.
    fn state(&self) -> Result<SurfaceState, AsperityError>;

    /// Forces lazy evaluation into a fresh, standalone base entity owning a
    /// materialized buffer, severing the chain. For decomposed entities this
    /// materializes the local buffer as a serial entity.
    fn squeeze(&self) -> Result<Arc<dyn HeightField>, AsperityError> {
        let data = self.heights()?;
        if self.is_uniform() {
            let sizes = self.physical_sizes();
            match self.dim() {
                1 => Ok(Arc::new(UniformLineScan::from_data(
                    data,
                    sizes[0],
                    self.is_periodic(),
                    self.info(),
                )?)),
                2 => Ok(Arc::new(Topography::from_data(
                    data,
                    [sizes[0], sizes[1]],
                    self.is_periodic(),
                    self.info(),
                )?)),
                d => Err(AsperityError::Internal(format!(
                    "Cannot squeeze a {}-dimensional entity.",
                    d
                ))),
            }
        } else {
            let x = self.positions().profile()?.clone();
            Ok(Arc::new(NonuniformLineScan::from_data(x, data, self.info())?))
        }
    }
}

//==================================================================================
// Internal Helpers
//==================================================================================

/// Poison-tolerant read lock. Rebindable attributes are plain values; a
/// panicked writer cannot leave them in a torn state.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn load_flag(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}

pub(crate) fn store_flag(flag: &AtomicBool, value: bool) {
    flag.store(value, Ordering::Relaxed)
}

/// Every physical size must be a positive, finite real.
pub(crate) fn validate_physical_sizes(sizes: &[f64]) -> Result<(), AsperityError> {
    for &s in sizes {
        if !s.is_finite() || s <= 0.0 {
            return Err(AsperityError::InvalidPhysicalSize(s));
        }
    }
    Ok(())
}
