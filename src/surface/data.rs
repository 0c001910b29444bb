// In: src/surface/data.rs

//! Carrier types moved between entities of the decorator chain: a height
//! buffer paired with its validity channel, and the per-dimensionality
//! position grids.

use ndarray::{Array1, Array2, ArrayD};

use crate::error::AsperityError;
use crate::validity::ValidityMask;

/// A height buffer (rank 1 or 2) plus the optional validity bitmap marking
/// undefined samples. `mask == None` means every sample is defined.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightData {
    values: ArrayD<f64>,
    mask: Option<ValidityMask>,
}

impl HeightData {
    /// Wraps a raw buffer, automatically masking every non-finite sample.
    pub fn from_values(values: ArrayD<f64>) -> Self {
        let mask = ValidityMask::from_finite(&values);
        Self { values, mask }
    }

    /// Pairs a buffer with an explicit mask. Shapes must agree.
    pub fn new(values: ArrayD<f64>, mask: Option<ValidityMask>) -> Result<Self, AsperityError> {
        if let Some(m) = &mask {
            if m.shape() != values.shape() {
                return Err(AsperityError::Internal(format!(
                    "Validity mask shape {:?} does not match buffer shape {:?}.",
                    m.shape(),
                    values.shape()
                )));
            }
        }
        Ok(Self { values, mask })
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub fn mask(&self) -> Option<&ValidityMask> {
        self.mask.as_ref()
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_undefined(&self) -> bool {
        self.mask.as_ref().map_or(false, |m| m.any_invalid())
    }

    pub fn into_parts(self) -> (ArrayD<f64>, Option<ValidityMask>) {
        (self.values, self.mask)
    }

    /// Applies an elementwise transform to the values; the validity channel
    /// passes through unchanged.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            values: self.values.mapv(&f),
            mask: self.mask.clone(),
        }
    }

    /// Elementwise sum of two buffers; a sample of the result is valid only
    /// if it is valid in both inputs.
    pub fn try_add(&self, other: &Self) -> Result<Self, AsperityError> {
        if self.shape() != other.shape() {
            return Err(AsperityError::Internal(format!(
                "Cannot add height buffers of shapes {:?} and {:?}.",
                self.shape(),
                other.shape()
            )));
        }
        let values = &self.values + &other.values;
        let mask = match (&self.mask, &other.mask) {
            (None, None) => None,
            (Some(m), None) | (None, Some(m)) => Some(m.clone()),
            (Some(a), Some(b)) => Some(a.intersect(b)?),
        };
        Ok(Self { values, mask })
    }

    /// Iterates over the defined samples in row-major order.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        let mask = self.mask.as_ref();
        self.values
            .iter()
            .enumerate()
            .filter(move |(i, _)| mask.map_or(true, |m| m.is_valid(*i)))
            .map(|(_, v)| *v)
    }

    /// Sum and count of the defined samples (local to this buffer).
    pub fn sum_and_count(&self) -> (f64, usize) {
        let mut sum = 0.0;
        let mut count = 0;
        for v in self.valid_values() {
            sum += v;
            count += 1;
        }
        (sum, count)
    }

    pub fn local_min(&self) -> Option<f64> {
        self.valid_values().fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.min(v)))
        })
    }

    pub fn local_max(&self) -> Option<f64> {
        self.valid_values().fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.max(v)))
        })
    }

    /// Borrow of the raw buffer, failing if any sample is undefined. Used by
    /// the derivative engine, which has no meaningful stencil over missing
    /// samples.
    pub fn require_fully_defined(
        &self,
        what: &'static str,
    ) -> Result<&ArrayD<f64>, AsperityError> {
        if self.has_undefined() {
            return Err(AsperityError::UndefinedData(what));
        }
        Ok(&self.values)
    }
}

/// Grid positions of an entity: a single coordinate axis for line scans, a
/// meshgrid pair for 2D maps. Positions of decomposed entities are global,
/// i.e. already offset by the subdomain location.
#[derive(Debug, Clone, PartialEq)]
pub enum Positions {
    Profile(Array1<f64>),
    Map { x: Array2<f64>, y: Array2<f64> },
}

impl Positions {
    /// The x-axis coordinates of a line scan.
    pub fn profile(&self) -> Result<&Array1<f64>, AsperityError> {
        match self {
            Positions::Profile(x) => Ok(x),
            Positions::Map { .. } => Err(AsperityError::Internal(
                "Expected line-scan positions, got a 2D meshgrid.".to_string(),
            )),
        }
    }

    /// The meshgrid pair of a 2D map.
    pub fn map(&self) -> Result<(&Array2<f64>, &Array2<f64>), AsperityError> {
        match self {
            Positions::Map { x, y } => Ok((x, y)),
            Positions::Profile(_) => Err(AsperityError::Internal(
                "Expected 2D meshgrid positions, got a line scan.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_values_masks_non_finite() {
        let data = HeightData::from_values(array![1.0, f64::NAN, 3.0].into_dyn());
        assert!(data.has_undefined());
        assert_eq!(data.sum_and_count(), (4.0, 2));
    }

    #[test]
    fn test_map_preserves_mask() {
        let data = HeightData::from_values(array![1.0, f64::NAN, 3.0].into_dyn());
        let scaled = data.map(|v| 2.0 * v);
        assert!(scaled.has_undefined());
        assert_eq!(scaled.sum_and_count(), (8.0, 2));
    }

    #[test]
    fn test_try_add_intersects_masks() {
        let a = HeightData::from_values(array![1.0, f64::NAN, 3.0].into_dyn());
        let b = HeightData::from_values(array![1.0, 1.0, f64::NAN].into_dyn());
        let c = a.try_add(&b).unwrap();
        assert_eq!(c.sum_and_count(), (2.0, 1));
    }

    #[test]
    fn test_try_add_shape_mismatch() {
        let a = HeightData::from_values(array![1.0, 2.0].into_dyn());
        let b = HeightData::from_values(array![1.0, 2.0, 3.0].into_dyn());
        assert!(a.try_add(&b).is_err());
    }

    #[test]
    fn test_min_max_skip_undefined() {
        let data = HeightData::from_values(array![5.0, f64::NAN, -2.0].into_dyn());
        assert_eq!(data.local_min(), Some(-2.0));
        assert_eq!(data.local_max(), Some(5.0));
    }

    #[test]
    fn test_require_fully_defined() {
        let ok = HeightData::from_values(array![1.0, 2.0].into_dyn());
        assert!(ok.require_fully_defined("derivative").is_ok());

        let bad = HeightData::from_values(array![1.0, f64::NAN].into_dyn());
        assert!(matches!(
            bad.require_fully_defined("derivative"),
            Err(AsperityError::UndefinedData("derivative"))
        ));
    }
}
