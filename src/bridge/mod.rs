// In: src/bridge/mod.rs

//! The boundary between external readers and the core.
//!
//! File-format readers and synthetic generators live outside this crate;
//! they hand over a raw payload (height buffer, physical sizes, periodicity
//! flag, metadata map, and, for parallel runs, the subdomain descriptor)
//! and the bridge marshals it into a base entity, applying the configured
//! consistency policy on the way in.

use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::config::{CoreConfig, SizeMismatchPolicy};
use crate::error::AsperityError;
use crate::parallel::{Decomposition, Reduction, SerialReduction};
use crate::surface::{InfoMap, NonuniformLineScan, Topography, UniformLineScan};

/// Raw payload of a 1D uniform reader channel.
#[derive(Debug, Clone)]
pub struct RawLineScan {
    pub heights: Vec<f64>,
    pub physical_size: f64,
    pub periodic: bool,
    pub info: InfoMap,
}

/// Raw payload of a 2D reader channel. `nb_grid_pts` is the row-major shape
/// of the delivered buffer: the subdomain shape when `decomposition` is
/// present, the full grid otherwise.
#[derive(Debug, Clone)]
pub struct RawTopographyMap {
    pub heights: Vec<f64>,
    pub nb_grid_pts: [usize; 2],
    pub physical_sizes: [f64; 2],
    pub periodic: bool,
    pub info: InfoMap,
    pub decomposition: Option<Decomposition>,
}

/// Raw payload of a nonuniform (variable-spacing) reader channel.
#[derive(Debug, Clone)]
pub struct RawNonuniformLineScan {
    pub positions: Vec<f64>,
    pub heights: Vec<f64>,
    pub info: InfoMap,
}

/// A reader may record the physical sizes it parsed in the metadata map
/// under this key; the bridge cross-checks it against the caller's values.
pub const PHYSICAL_SIZES_INFO_KEY: &str = "physical_sizes";

/// Soft consistency check between caller-supplied sizes and sizes recorded
/// in the metadata. The caller-supplied value always wins; the configured
/// policy decides whether the conflict warns, stays silent, or rejects.
fn reconcile_sizes(
    info: &InfoMap,
    supplied: &[f64],
    config: &CoreConfig,
) -> Result<(), AsperityError> {
    let Some(value) = info.get(PHYSICAL_SIZES_INFO_KEY) else {
        return Ok(());
    };
    let Some(entries) = value.as_array() else {
        return Ok(());
    };
    let recorded: Vec<f64> = entries.iter().filter_map(|v| v.as_f64()).collect();
    if recorded.len() != entries.len() {
        return Ok(());
    }
    if recorded.as_slice() == supplied {
        return Ok(());
    }
    match config.size_mismatch {
        SizeMismatchPolicy::Silent => Ok(()),
        SizeMismatchPolicy::Warn => {
            log::warn!(
                "Physical sizes given by the caller (= {:?}) differ from the sizes recorded \
                 in the metadata (= {:?}). Using the caller values.",
                supplied,
                recorded
            );
            Ok(())
        }
        SizeMismatchPolicy::Strict => Err(AsperityError::MetadataConflict {
            supplied: format!("{:?}", supplied),
            recorded: format!("{:?}", recorded),
        }),
    }
}

/// Builds a uniform line scan from a reader payload.
pub fn build_line_scan(
    raw: RawLineScan,
    config: &CoreConfig,
) -> Result<UniformLineScan, AsperityError> {
    reconcile_sizes(&raw.info, &[raw.physical_size], config)?;
    UniformLineScan::new(
        Array1::from_vec(raw.heights),
        raw.physical_size,
        raw.periodic,
        raw.info,
    )
}

/// Builds a topography map from a reader payload. A decomposed payload needs
/// the caller's reduction collaborator; serial payloads may pass `None`.
pub fn build_topography(
    raw: RawTopographyMap,
    config: &CoreConfig,
    reduction: Option<Arc<dyn Reduction>>,
) -> Result<Topography, AsperityError> {
    reconcile_sizes(&raw.info, &raw.physical_sizes, config)?;
    let expected = raw.nb_grid_pts[0] * raw.nb_grid_pts[1];
    if raw.heights.len() != expected {
        return Err(AsperityError::BufferMismatch {
            expected,
            actual: raw.heights.len(),
        });
    }
    let heights = Array2::from_shape_vec((raw.nb_grid_pts[0], raw.nb_grid_pts[1]), raw.heights)
        .map_err(|e| AsperityError::Internal(e.to_string()))?;
    match raw.decomposition {
        Some(decomposition) => Topography::with_decomposition(
            heights,
            raw.physical_sizes,
            raw.periodic,
            raw.info,
            decomposition,
            reduction.unwrap_or_else(|| Arc::new(SerialReduction)),
        ),
        None => Topography::new(heights, raw.physical_sizes, raw.periodic, raw.info),
    }
}

/// Detrends an entity with the mode configured at the application boundary.
pub fn detrend_with_default(
    surface: &Arc<dyn crate::surface::HeightField>,
    config: &CoreConfig,
) -> Result<Arc<dyn crate::surface::HeightField>, AsperityError> {
    use crate::pipeline::PipelineExt;
    surface.detrend(config.default_detrend_mode)
}

/// Builds a nonuniform line scan from a reader payload.
pub fn build_nonuniform_line_scan(
    raw: RawNonuniformLineScan,
    _config: &CoreConfig,
) -> Result<NonuniformLineScan, AsperityError> {
    NonuniformLineScan::new(
        Array1::from_vec(raw.positions),
        Array1::from_vec(raw.heights),
        raw.info,
    )
}

/// Turns on logging of dispatch traces and soft-inconsistency warnings.
/// Safe to call more than once; subsequent calls are ignored.
pub fn enable_verbose_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SurfaceAnalysis;
    use crate::surface::HeightField;
    use serde_json::json;

    fn info_with_sizes(sizes: &[f64]) -> InfoMap {
        let mut info = InfoMap::new();
        info.insert(PHYSICAL_SIZES_INFO_KEY.to_string(), json!(sizes));
        info
    }

    #[test]
    fn test_build_line_scan() {
        let scan = build_line_scan(
            RawLineScan {
                heights: vec![0.0, 1.0, 2.0],
                physical_size: 3.0,
                periodic: false,
                info: InfoMap::new(),
            },
            &CoreConfig::default(),
        )
        .unwrap();
        assert_eq!(scan.nb_grid_pts(), vec![3]);
        assert!((scan.mean().unwrap() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_matching_metadata_sizes_pass_strict() {
        let config = CoreConfig {
            size_mismatch: SizeMismatchPolicy::Strict,
            ..CoreConfig::default()
        };
        let raw = RawLineScan {
            heights: vec![0.0, 1.0],
            physical_size: 2.0,
            periodic: false,
            info: info_with_sizes(&[2.0]),
        };
        assert!(build_line_scan(raw, &config).is_ok());
    }

    #[test]
    fn test_conflicting_metadata_sizes_warn_but_caller_wins() {
        let raw = RawLineScan {
            heights: vec![0.0, 1.0],
            physical_size: 2.0,
            periodic: false,
            info: info_with_sizes(&[5.0]),
        };
        let scan = build_line_scan(raw, &CoreConfig::default()).unwrap();
        assert_eq!(scan.physical_sizes(), vec![2.0]);
    }

    #[test]
    fn test_conflicting_metadata_sizes_reject_under_strict() {
        let config = CoreConfig {
            size_mismatch: SizeMismatchPolicy::Strict,
            ..CoreConfig::default()
        };
        let raw = RawLineScan {
            heights: vec![0.0, 1.0],
            physical_size: 2.0,
            periodic: false,
            info: info_with_sizes(&[5.0]),
        };
        let err = build_line_scan(raw, &config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2.0") && msg.contains("5.0"));
    }

    #[test]
    fn test_detrend_with_default_uses_configured_mode() {
        let config = CoreConfig {
            default_detrend_mode: crate::types::DetrendMode::Center,
            ..CoreConfig::default()
        };
        let scan: Arc<dyn HeightField> = Arc::new(
            build_line_scan(
                RawLineScan {
                    heights: vec![1.0, 3.0, 5.0],
                    physical_size: 1.0,
                    periodic: false,
                    info: InfoMap::new(),
                },
                &config,
            )
            .unwrap(),
        );
        let detrended = detrend_with_default(&scan, &config).unwrap();
        assert!((detrended.mean().unwrap()).abs() < 1e-15);
        // Center mode only removes the offset; the slope survives.
        assert_eq!(detrended.heights().unwrap().values()[[0]], -2.0);
    }

    #[test]
    fn test_build_topography_checks_buffer_length() {
        let raw = RawTopographyMap {
            heights: vec![0.0; 5],
            nb_grid_pts: [2, 3],
            physical_sizes: [1.0, 1.0],
            periodic: false,
            info: InfoMap::new(),
            decomposition: None,
        };
        assert!(matches!(
            build_topography(raw, &CoreConfig::default(), None),
            Err(AsperityError::BufferMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_build_decomposed_topography() {
        let raw = RawTopographyMap {
            heights: vec![0.0; 8],
            nb_grid_pts: [2, 4],
            physical_sizes: [4.0, 4.0],
            periodic: true,
            info: InfoMap::new(),
            decomposition: Some(Decomposition {
                nb_grid_pts: [4, 4],
                subdomain_locations: [2, 0],
                nb_subdomain_grid_pts: [2, 4],
            }),
        };
        let top = build_topography(raw, &CoreConfig::default(), None).unwrap();
        assert_eq!(top.nb_grid_pts(), vec![4, 4]);
        assert_eq!(top.subdomain_locations(), vec![2, 0]);
    }
}
