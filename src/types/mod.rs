//! This module defines the core, strongly-typed vocabulary used throughout the
//! asperity pipeline.
//!
//! It replaces fragile string-based mode arguments with safe, serializable
//! enums. String forms are still accepted at the application boundary (the
//! dynamic operation dispatch) and are parsed here.

use crate::error::AsperityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The polynomial trend that a [`DetrendedTopography`](crate::pipeline::DetrendedTopography)
/// removes from its parent.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetrendMode {
    /// Subtract the mean height. The only mode that keeps a periodic
    /// topography periodic.
    Center,

    /// Least-squares fit of a line (1D) or plane (2D), minimizing the rms
    /// residual height. This is the recommended default.
    #[default]
    Height,

    /// Estimate the gradient as the mean of the measured first derivative
    /// instead of fitting positions. Avoids amplifying high-frequency noise
    /// the way a positional fit would.
    Slope,

    /// Least-squares fit of a quadratic (1D) or biquadratic (2D) surface,
    /// same minimization criterion as `Height`.
    Curvature,
}

impl DetrendMode {
    /// Parses a boundary-supplied mode string. `kind` identifies the entity
    /// the mode was requested for and only feeds the error message.
    pub fn parse(mode: &str, kind: &str) -> Result<Self, AsperityError> {
        match mode {
            "center" => Ok(Self::Center),
            "height" => Ok(Self::Height),
            "slope" => Ok(Self::Slope),
            "curvature" => Ok(Self::Curvature),
            _ => Err(AsperityError::UnsupportedDetrendMode {
                mode: mode.to_string(),
                kind: kind.to_string(),
            }),
        }
    }
}

impl fmt::Display for DetrendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Center => "center",
            Self::Height => "height",
            Self::Slope => "slope",
            Self::Curvature => "curvature",
        };
        write!(f, "{}", name)
    }
}

/// Selects the averaging region of [`rms_height`](crate::analysis::SurfaceAnalysis::rms_height).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HeightKind {
    /// `Sq`: root mean square over the full grid.
    #[default]
    Sq,
    /// `Rq`: root mean square of per-profile residuals along the first axis.
    Rq,
}

impl HeightKind {
    pub fn parse(kind: &str) -> Result<Self, AsperityError> {
        match kind {
            "Sq" => Ok(Self::Sq),
            "Rq" => Ok(Self::Rq),
            _ => Err(AsperityError::UnsupportedRmsKind(kind.to_string())),
        }
    }
}

impl fmt::Display for HeightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sq => write!(f, "Sq"),
            Self::Rq => write!(f, "Rq"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detrend_mode_parse_roundtrip() {
        for mode in [
            DetrendMode::Center,
            DetrendMode::Height,
            DetrendMode::Slope,
            DetrendMode::Curvature,
        ] {
            assert_eq!(
                DetrendMode::parse(&mode.to_string(), "line scan").unwrap(),
                mode
            );
        }
    }

    #[test]
    fn test_detrend_mode_parse_rejects_unknown() {
        let err = DetrendMode::parse("warp", "2D topography map").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("warp"));
        assert!(msg.contains("2D topography map"));
    }

    #[test]
    fn test_height_kind_parse() {
        assert_eq!(HeightKind::parse("Sq").unwrap(), HeightKind::Sq);
        assert_eq!(HeightKind::parse("Rq").unwrap(), HeightKind::Rq);
        assert!(HeightKind::parse("Zq").is_err());
    }

    #[test]
    fn test_serde_tags_are_snake_case() {
        let json = serde_json::to_string(&DetrendMode::Curvature).unwrap();
        assert_eq!(json, "\"curvature\"");
    }
}
