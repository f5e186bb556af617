//! Partition planning.
//!
//! Splits `[0, array_size)` into `pnum` contiguous ranges of
//! `array_size / pnum` elements; the final range also takes the
//! `array_size % pnum` leftover elements.

use crate::error::{PminmaxError, Result};
use serde::Serialize;
use std::ops::Range;

/// One worker's contiguous slice of the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub index: u32,
    pub start: usize,
    pub end: usize,
}

impl Partition {
    /// Number of elements covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Plan `pnum` partitions over `array_size` elements.
///
/// When `pnum > array_size` every partition but the last is empty.
pub fn plan_partitions(array_size: usize, pnum: u32) -> Result<Vec<Partition>> {
    if array_size == 0 {
        return Err(PminmaxError::InvalidConfig(
            "array_size must be a positive number".into(),
        ));
    }
    if pnum == 0 {
        return Err(PminmaxError::InvalidConfig(
            "pnum must be a positive number".into(),
        ));
    }

    let part_size = array_size / pnum as usize;
    let partitions = (0..pnum)
        .map(|index| {
            let start = index as usize * part_size;
            let end = if index == pnum - 1 {
                array_size
            } else {
                start + part_size
            };
            Partition { index, start, end }
        })
        .collect();

    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(partitions: &[Partition]) -> Vec<usize> {
        partitions.iter().map(Partition::len).collect()
    }

    fn assert_exact_cover(partitions: &[Partition], array_size: usize) {
        let mut expected_start = 0;
        for (i, p) in partitions.iter().enumerate() {
            assert_eq!(p.index as usize, i);
            assert_eq!(p.start, expected_start, "gap or overlap at {}", i);
            assert!(p.end >= p.start);
            expected_start = p.end;
        }
        assert_eq!(expected_start, array_size);
    }

    #[test]
    fn test_even_split() {
        let partitions = plan_partitions(1000, 4).unwrap();
        assert_eq!(sizes(&partitions), vec![250, 250, 250, 250]);
        assert_exact_cover(&partitions, 1000);
    }

    #[test]
    fn test_remainder_goes_to_last() {
        let partitions = plan_partitions(10, 3).unwrap();
        assert_eq!(sizes(&partitions), vec![3, 3, 4]);
        assert_exact_cover(&partitions, 10);
    }

    #[test]
    fn test_single_partition_spans_everything() {
        let partitions = plan_partitions(17, 1).unwrap();
        assert_eq!(
            partitions,
            vec![Partition {
                index: 0,
                start: 0,
                end: 17
            }]
        );
    }

    #[test]
    fn test_more_partitions_than_elements() {
        let partitions = plan_partitions(3, 5).unwrap();
        assert_eq!(sizes(&partitions), vec![0, 0, 0, 0, 3]);
        assert!(partitions[0].is_empty());
        assert_exact_cover(&partitions, 3);
    }

    #[test]
    fn test_cover_for_many_shapes() {
        for array_size in 1..=64usize {
            for pnum in 1..=array_size as u32 {
                let partitions = plan_partitions(array_size, pnum).unwrap();
                assert_eq!(partitions.len(), pnum as usize);
                assert_exact_cover(&partitions, array_size);

                // Leading partitions share one size; only the last may be larger.
                let base = array_size / pnum as usize;
                let (last, leading) = partitions.split_last().unwrap();
                assert!(leading.iter().all(|p| p.len() == base));
                assert_eq!(last.len(), base + array_size % pnum as usize);
            }
        }
    }

    #[test]
    fn test_zero_inputs_rejected() {
        assert!(matches!(
            plan_partitions(0, 4),
            Err(PminmaxError::InvalidConfig(_))
        ));
        assert!(matches!(
            plan_partitions(10, 0),
            Err(PminmaxError::InvalidConfig(_))
        ));
    }
}
