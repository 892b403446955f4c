//! The N-dimensional extent of an input array.

use ndarray::IxDyn;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VerifyError;

/// Smallest supported number of dimensions.
pub const MIN_DIMS: usize = 1;
/// Largest supported number of dimensions.
pub const MAX_DIMS: usize = 5;

/// An ordered, immutable list of positive extents, outermost (slowest varying) first.
///
/// Construction validates the dimension count and every extent, so any `Shape`
/// value in the program describes a non-empty array with 1 to 5 axes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Result<Self, VerifyError> {
        if !(MIN_DIMS..=MAX_DIMS).contains(&dims.len()) {
            return Err(VerifyError::UnsupportedDimensionality(dims.len()));
        }
        if let Some(axis) = dims.iter().position(|&d| d == 0) {
            return Err(VerifyError::InvalidShape(format!(
                "extent of axis {} must be positive",
                axis
            )));
        }
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| {
                VerifyError::InvalidShape(format!("element count of {:?} overflows usize", dims))
            })?;
        Ok(Self { dims })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements. Cannot overflow: checked at construction.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Number of elements in one slab along the outermost axis.
    pub fn slab_len(&self) -> usize {
        self.dims[1..].iter().product()
    }

    /// Byte size of the array for an element of `element_size` bytes.
    pub fn byte_len(&self, element_size: usize) -> Result<usize, VerifyError> {
        self.num_elements()
            .checked_mul(element_size)
            .ok_or_else(|| {
                VerifyError::InvalidShape(format!("byte size of {} overflows usize", self))
            })
    }

    /// The dynamic ndarray dimension for this shape.
    pub fn to_ix(&self) -> IxDyn {
        IxDyn(&self.dims)
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = VerifyError;

    fn try_from(dims: Vec<usize>) -> Result<Self, Self::Error> {
        Shape::new(dims)
    }
}

impl From<Shape> for Vec<usize> {
    fn from(shape: Shape) -> Self {
        shape.dims
    }
}

/// Formats as `2 ( 10 10 )`: the dimension count followed by the extents.
impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ( ", self.dims.len())?;
        for d in &self.dims {
            write!(f, "{} ", d)?;
        }
        write!(f, ")")
    }
}
