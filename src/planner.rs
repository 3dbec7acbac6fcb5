//! Split-point planner.

use log;

use crate::error::{Component, SortError};

/// Derives split points from per-partition samples.
///
/// All samples are merged and sorted, and for every `i` in `1..k` (where `k` is the number of samples) split
/// point `i - 1` is the merged sample value at index `i * total / k`. The returned sequence has `k - 1`
/// non-decreasing values. Equal adjacent split points are kept, the ranges between them are empty.
///
/// # Arguments
/// * `samples` - One sample per partition
pub fn plan_split_points<T>(samples: &[&[T]]) -> Result<Vec<T>, SortError>
where
    T: Ord + Clone + std::fmt::Debug,
{
    if samples.is_empty() {
        return Err(SortError::invalid_argument(
            Component::Planner,
            "at least one partition sample is required",
        ));
    }

    if let Some(partition) = samples.iter().position(|sample| sample.is_empty()) {
        return Err(SortError::invalid_argument(
            Component::Planner,
            format!("sample of partition {} is empty", partition),
        ));
    }

    let partitions_number = samples.len();
    let mut global_sample = Vec::with_capacity(samples.iter().map(|sample| sample.len()).sum());
    for sample in samples {
        global_sample.extend_from_slice(sample);
    }
    global_sample.sort_unstable();

    let total = global_sample.len();
    let split_points = Vec::from_iter((1..partitions_number).map(|i| global_sample[i * total / partitions_number].clone()));

    for (idx, split_point) in split_points.iter().enumerate() {
        log::debug!("split point {} at {:?}", idx, split_point);
    }

    return Ok(split_points);
}
