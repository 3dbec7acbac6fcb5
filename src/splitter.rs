//! Range splitter.

use std::fmt;
use std::fmt::Debug;
use std::time::Instant;

use log;
use rayon::slice::ParallelSliceMut;

use crate::error::{Component, SortError};
use crate::executor::{Handle, ObjectStore};

/// Checks that split points are non-decreasing.
pub fn validate_split_points<T>(split_points: &[T]) -> Result<(), SortError>
where
    T: Ord + Debug,
{
    if let Some(idx) = split_points.windows(2).position(|pair| pair[0] > pair[1]) {
        return Err(SortError::invalid_argument(
            Component::Splitter,
            format!(
                "split points not sorted at {}: {:?} > {:?}",
                idx + 1,
                split_points[idx],
                split_points[idx + 1]
            ),
        ));
    }

    return Ok(());
}

/// Sorts partition records and slices them into `split_points.len() + 1` ranges.
///
/// Range `i` holds records `v` with `split_points[i - 1] < v <= split_points[i]`, the first and the last
/// ranges are unbounded below and above respectively. A record equal to a split point belongs to the lower range.
/// Empty ranges are kept so the result always has one entry per range.
///
/// # Arguments
/// * `partition` - Index of the split partition, used for error reporting
/// * `records` - Partition records, in any order
/// * `split_points` - Non-decreasing range boundaries
pub fn split_partition<T>(partition: usize, records: &[T], split_points: &[T]) -> Result<Vec<Vec<T>>, SortError>
where
    T: Ord + Clone + Send + Debug,
{
    validate_split_points(split_points).map_err(|err| match err {
        SortError::InvalidArgument { component, reason } => {
            SortError::invalid_argument(component, format!("partition {}: {}", partition, reason))
        }
        err => err,
    })?;

    let started = Instant::now();
    let mut sorted = records.to_vec();
    sorted.par_sort_unstable();

    let mut range_lens = Vec::with_capacity(split_points.len() + 1);
    let mut cursor = 0;
    for split_point in split_points {
        let range_len = sorted[cursor..].partition_point(|record| record <= split_point);
        range_lens.push(range_len);
        cursor += range_len;
    }
    range_lens.push(sorted.len() - cursor);

    let mut sorted = sorted.into_iter();
    let ranges = Vec::from_iter(range_lens.into_iter().map(|len| Vec::from_iter(sorted.by_ref().take(len))));

    log::debug!(
        "split partition {} into {} ranges ({} records) in {:?}",
        partition,
        ranges.len(),
        records.len(),
        started.elapsed()
    );

    return Ok(ranges);
}

/// Sub-range handles of a run addressed by `(partition, range)`.
pub struct SubRangeGrid<T> {
    ranges_number: usize,
    cells: Vec<Handle<Vec<T>>>,
}

impl<T> fmt::Debug for SubRangeGrid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubRangeGrid")
            .field("partitions", &self.partitions_number())
            .field("ranges", &self.ranges_number)
            .field("cells", &self.cells)
            .finish()
    }
}

impl<T> SubRangeGrid<T> {
    /// Builds a grid from per-partition rows of sub-range handles ordered by range index.
    /// Every row must hold exactly `ranges_number` handles.
    pub fn from_rows<R>(rows: R, ranges_number: usize) -> Result<Self, SortError>
    where
        R: IntoIterator,
        R::Item: AsRef<[Handle<Vec<T>>]>,
    {
        let mut cells = Vec::new();
        for (partition, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            if row.len() != ranges_number {
                return Err(SortError::invalid_argument(
                    Component::Driver,
                    format!(
                        "partition {} produced {} sub-ranges, expected {}",
                        partition,
                        row.len(),
                        ranges_number
                    ),
                ));
            }
            cells.extend_from_slice(row);
        }

        return Ok(SubRangeGrid { ranges_number, cells });
    }

    pub fn partitions_number(&self) -> usize {
        if self.ranges_number == 0 {
            0
        } else {
            self.cells.len() / self.ranges_number
        }
    }

    pub fn ranges_number(&self) -> usize {
        self.ranges_number
    }

    /// Returns the handle of a partition's sub-range.
    pub fn get(&self, partition: usize, range: usize) -> Option<Handle<Vec<T>>> {
        if range >= self.ranges_number {
            return None;
        }
        self.cells.get(partition * self.ranges_number + range).copied()
    }

    /// Returns the handles of one range across every partition, ordered by partition index.
    pub fn range(&self, range: usize) -> Vec<Handle<Vec<T>>> {
        Vec::from_iter((0..self.partitions_number()).filter_map(|partition| self.get(partition, range)))
    }

    /// Drops every sub-range from the store.
    pub fn release(&self, store: &ObjectStore) {
        for handle in &self.cells {
            store.release(handle.id());
        }
    }
}
