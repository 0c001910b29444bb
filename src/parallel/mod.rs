// In: src/parallel/mod.rs

//! Domain-decomposition bookkeeping and the contract this crate requires from
//! an external collective-reduction collaborator.
//!
//! The parallel model is cooperative SPMD: every process runs the identical
//! program over its own disjoint rectangular subdomain of the global grid.
//! The core never implements a collective itself; any operation whose result
//! depends on global state is routed through the [`Reduction`] trait.
//!
//! **Caller obligation (not enforceable here):** reductions are collective.
//! Every process that owns a piece of an entity must issue the same reduction
//! calls in the same order, or the process group deadlocks.

use serde::{Deserialize, Serialize};

use crate::error::AsperityError;

//==================================================================================
// 1. Subdomain Descriptor
//==================================================================================

/// Describes the rectangular subdomain of a global 2D grid held by the
/// present process.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decomposition {
    /// Grid points of the full (global) topography.
    pub nb_grid_pts: [usize; 2],
    /// Origin of the local subdomain within the global grid.
    pub subdomain_locations: [usize; 2],
    /// Grid points of the local buffer.
    pub nb_subdomain_grid_pts: [usize; 2],
}

impl Decomposition {
    /// Checks that the subdomain lies inside the global grid.
    pub fn validate(&self) -> Result<(), AsperityError> {
        for axis in 0..2 {
            let n = self.nb_grid_pts[axis];
            let loc = self.subdomain_locations[axis];
            let ln = self.nb_subdomain_grid_pts[axis];
            if n == 0 || ln == 0 {
                return Err(AsperityError::Decomposition(format!(
                    "Grid counts must be nonzero, got global {:?} and local {:?}.",
                    self.nb_grid_pts, self.nb_subdomain_grid_pts
                )));
            }
            if loc + ln > n {
                return Err(AsperityError::Decomposition(format!(
                    "Subdomain [{}, {}) exceeds the global extent {} along axis {}.",
                    loc,
                    loc + ln,
                    n,
                    axis
                )));
            }
        }
        Ok(())
    }

    /// Global index ranges covered by this subdomain, per axis.
    pub fn subdomain_ranges(&self) -> [std::ops::Range<usize>; 2] {
        [
            self.subdomain_locations[0]..self.subdomain_locations[0] + self.nb_subdomain_grid_pts[0],
            self.subdomain_locations[1]..self.subdomain_locations[1] + self.nb_subdomain_grid_pts[1],
        ]
    }
}

/// Verifies that a set of subdomains partitions the global grid exactly:
/// every global index is covered once, with no overlap and no gap. A
/// violation is an internal invariant error, not recoverable input.
pub fn partition_is_exact(
    nb_grid_pts: [usize; 2],
    subdomains: &[Decomposition],
) -> Result<(), AsperityError> {
    let total: usize = nb_grid_pts[0] * nb_grid_pts[1];
    let mut covered = vec![false; total];
    for sub in subdomains {
        if sub.nb_grid_pts != nb_grid_pts {
            return Err(AsperityError::Decomposition(format!(
                "Subdomain declares global grid {:?} but the partition is over {:?}.",
                sub.nb_grid_pts, nb_grid_pts
            )));
        }
        sub.validate()?;
        let [rx, ry] = sub.subdomain_ranges();
        for i in rx.clone() {
            for j in ry.clone() {
                let flat = i * nb_grid_pts[1] + j;
                if covered[flat] {
                    return Err(AsperityError::Decomposition(format!(
                        "Global grid point ({}, {}) is covered by more than one subdomain.",
                        i, j
                    )));
                }
                covered[flat] = true;
            }
        }
    }
    if let Some(flat) = covered.iter().position(|c| !c) {
        return Err(AsperityError::Decomposition(format!(
            "Global grid point ({}, {}) is not covered by any subdomain.",
            flat / nb_grid_pts[1],
            flat % nb_grid_pts[1]
        )));
    }
    Ok(())
}

//==================================================================================
// 2. Collective Reduction Contract
//==================================================================================

/// The collective operations the core needs from an MPI-like collaborator.
///
/// Implementations reduce a per-process local contribution to the common
/// global value and return that value *on every process*.
pub trait Reduction: Send + Sync + std::fmt::Debug {
    /// Logical OR across all processes.
    fn any(&self, local: bool) -> Result<bool, AsperityError>;

    /// Sum across all processes.
    fn sum(&self, local: f64) -> Result<f64, AsperityError>;

    /// Minimum across all processes. Processes without a contribution pass
    /// `f64::INFINITY`.
    fn min(&self, local: f64) -> Result<f64, AsperityError>;

    /// Maximum across all processes. Processes without a contribution pass
    /// `f64::NEG_INFINITY`.
    fn max(&self, local: f64) -> Result<f64, AsperityError>;
}

/// The default single-process collaborator: every reduction is the identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialReduction;

impl Reduction for SerialReduction {
    fn any(&self, local: bool) -> Result<bool, AsperityError> {
        Ok(local)
    }

    fn sum(&self, local: f64) -> Result<f64, AsperityError> {
        Ok(local)
    }

    fn min(&self, local: f64) -> Result<f64, AsperityError> {
        Ok(local)
    }

    fn max(&self, local: f64) -> Result<f64, AsperityError> {
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(loc: [usize; 2], n: [usize; 2], global: [usize; 2]) -> Decomposition {
        Decomposition {
            nb_grid_pts: global,
            subdomain_locations: loc,
            nb_subdomain_grid_pts: n,
        }
    }

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let bad = sub([6, 0], [4, 8], [8, 8]);
        assert!(matches!(
            bad.validate(),
            Err(AsperityError::Decomposition(_))
        ));
    }

    #[test]
    fn test_exact_partition_passes() {
        let global = [8, 6];
        let parts = vec![
            sub([0, 0], [4, 6], global),
            sub([4, 0], [4, 3], global),
            sub([4, 3], [4, 3], global),
        ];
        partition_is_exact(global, &parts).unwrap();
    }

    #[test]
    fn test_partition_with_gap_fails() {
        let global = [4, 4];
        let parts = vec![sub([0, 0], [2, 4], global)];
        let err = partition_is_exact(global, &parts).unwrap_err();
        assert!(err.to_string().contains("not covered"));
    }

    #[test]
    fn test_partition_with_overlap_fails() {
        let global = [4, 4];
        let parts = vec![sub([0, 0], [3, 4], global), sub([2, 0], [2, 4], global)];
        let err = partition_is_exact(global, &parts).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn test_serial_reduction_is_identity() {
        let red = SerialReduction;
        assert!(red.any(true).unwrap());
        assert!(!red.any(false).unwrap());
        assert_eq!(red.sum(2.5).unwrap(), 2.5);
        assert_eq!(red.min(-1.0).unwrap(), -1.0);
        assert_eq!(red.max(7.0).unwrap(), 7.0);
    }
}
