// In: src/validity.rs

//! This module contains the pure, stateless kernels for handling undefined
//! height samples. Its primary responsibility is to carry an explicit
//! validity bitmap next to every height buffer, so that "missing data" is a
//! first-class, branch-free channel instead of a NaN sentinel convention.
//!
//! Bit convention follows Arrow: a set bit marks a *valid* sample.

use bitvec::prelude::*;
use ndarray::ArrayD;

use crate::error::AsperityError;

/// A shape-aware validity bitmap in row-major (logical) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    shape: Vec<usize>,
    bits: BitVec,
}

impl ValidityMask {
    /// Builds a mask flagging every non-finite sample of `values` as invalid.
    /// Returns `None` when every sample is finite, so fully-defined buffers
    /// never pay for a bitmap.
    pub fn from_finite(values: &ArrayD<f64>) -> Option<Self> {
        if values.iter().all(|v| v.is_finite()) {
            return None;
        }
        let bits: BitVec = values.iter().map(|v| v.is_finite()).collect();
        Some(Self {
            shape: values.shape().to_vec(),
            bits,
        })
    }

    /// Builds a mask from explicit per-sample validity flags.
    pub fn from_flags(shape: &[usize], flags: &[bool]) -> Result<Self, AsperityError> {
        let expected: usize = shape.iter().product();
        if flags.len() != expected {
            return Err(AsperityError::Internal(format!(
                "Validity flags have length {} but the buffer holds {} samples.",
                flags.len(),
                expected
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            bits: flags.iter().copied().collect(),
        })
    }

    /// Builds a mask from a boolean array (used by geometric decorators that
    /// reshape their parent's mask).
    pub fn from_array(flags: &ArrayD<bool>) -> Self {
        Self {
            shape: flags.shape().to_vec(),
            bits: flags.iter().copied().collect(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Validity of the sample at row-major position `flat`.
    pub fn is_valid(&self, flat: usize) -> bool {
        self.bits[flat]
    }

    pub fn count_invalid(&self) -> usize {
        self.bits.count_zeros()
    }

    pub fn any_invalid(&self) -> bool {
        self.bits.count_zeros() > 0
    }

    /// Intersection of two masks: a sample is valid only if both inputs agree.
    pub fn intersect(&self, other: &Self) -> Result<Self, AsperityError> {
        if self.shape != other.shape {
            return Err(AsperityError::Internal(format!(
                "Cannot intersect validity masks of shapes {:?} and {:?}.",
                self.shape, other.shape
            )));
        }
        let mut bits = self.bits.clone();
        for (i, valid) in other.bits.iter().by_vals().enumerate() {
            if !valid {
                bits.set(i, false);
            }
        }
        Ok(Self {
            shape: self.shape.clone(),
            bits,
        })
    }

    /// Flattened row-major flags, e.g. for state export.
    pub fn to_flags(&self) -> Vec<bool> {
        self.bits.iter().by_vals().collect()
    }

    /// Expands the bitmap into a boolean array of the carried shape.
    pub fn to_array(&self) -> ArrayD<bool> {
        ArrayD::from_shape_vec(self.shape.clone(), self.to_flags())
            .expect("mask shape and bit count always agree")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_finite_is_none_for_defined_data() {
        let values = array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
        assert!(ValidityMask::from_finite(&values).is_none());
    }

    #[test]
    fn test_from_finite_masks_nan_and_inf() {
        let values = array![1.0, f64::NAN, 3.0, f64::INFINITY].into_dyn();
        let mask = ValidityMask::from_finite(&values).unwrap();
        assert!(mask.is_valid(0));
        assert!(!mask.is_valid(1));
        assert!(mask.is_valid(2));
        assert!(!mask.is_valid(3));
        assert_eq!(mask.count_invalid(), 2);
        assert!(mask.any_invalid());
    }

    #[test]
    fn test_intersect_combines_invalidity() {
        let a = ValidityMask::from_flags(&[4], &[true, false, true, true]).unwrap();
        let b = ValidityMask::from_flags(&[4], &[true, true, false, true]).unwrap();
        let c = a.intersect(&b).unwrap();
        assert_eq!(c.to_flags(), vec![true, false, false, true]);
    }

    #[test]
    fn test_intersect_shape_mismatch_is_internal_error() {
        let a = ValidityMask::from_flags(&[2], &[true, false]).unwrap();
        let b = ValidityMask::from_flags(&[3], &[true, false, true]).unwrap();
        assert!(matches!(
            a.intersect(&b),
            Err(AsperityError::Internal(_))
        ));
    }

    #[test]
    fn test_array_roundtrip_preserves_shape() {
        let values = array![[1.0, f64::NAN], [3.0, 4.0]].into_dyn();
        let mask = ValidityMask::from_finite(&values).unwrap();
        let arr = mask.to_array();
        assert_eq!(arr.shape(), &[2, 2]);
        assert_eq!(ValidityMask::from_array(&arr), mask);
    }
}
