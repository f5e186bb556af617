//! Single-partition extent scan.

use serde::Serialize;
use std::ops::Range;
use thiserror::Error;

/// Minimum and maximum of a non-empty run of integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub min: i32,
    pub max: i32,
}

impl Extent {
    /// Componentwise min/max of two extents.
    pub fn merge(self, other: Extent) -> Extent {
        Extent {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Why a scan produced no extent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("range {start}..{end} is empty")]
    RangeEmpty { start: usize, end: usize },

    #[error("range {start}..{end} exceeds array of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Compute the extent of `array[range]`.
///
/// An empty range has no extent and yields [`ScanError::RangeEmpty`].
pub fn scan_extent(array: &[i32], range: Range<usize>) -> Result<Extent, ScanError> {
    let Range { start, end } = range;
    let slice = array.get(start..end).ok_or(ScanError::OutOfBounds {
        start,
        end,
        len: array.len(),
    })?;

    let (&first, rest) = slice
        .split_first()
        .ok_or(ScanError::RangeEmpty { start, end })?;

    Ok(rest.iter().fold(
        Extent {
            min: first,
            max: first,
        },
        |acc, &v| Extent {
            min: acc.min.min(v),
            max: acc.max.max(v),
        },
    ))
}
