//! Partition sampler.

use std::time::Instant;

use log;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Component, SortError};

/// Derives the sampling seed of a partition from the run's base seed.
pub fn partition_seed(base_seed: u64, partition: usize) -> u64 {
    base_seed.wrapping_add(partition as u64)
}

/// Draws `sample_size` records uniformly at random, with replacement, from a partition.
/// The sample keeps the order the records were drawn in. Same records and seed always give the same sample.
///
/// # Arguments
/// * `partition` - Index of the sampled partition, used for error reporting
/// * `records` - Partition records
/// * `sample_size` - Number of records to draw
/// * `seed` - Random generator seed
pub fn sample<T>(partition: usize, records: &[T], sample_size: usize, seed: u64) -> Result<Vec<T>, SortError>
where
    T: Clone,
{
    if records.is_empty() && sample_size > 0 {
        return Err(SortError::invalid_argument(
            Component::Sampler,
            format!(
                "partition {} is empty, can't draw {} sample records",
                partition, sample_size
            ),
        ));
    }

    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let sample = Vec::from_iter((0..sample_size).map(|_| records[rng.gen_range(0..records.len())].clone()));

    log::debug!(
        "sampled partition {} (seed: {}): {} of {} records in {:?}",
        partition,
        seed,
        sample.len(),
        records.len(),
        started.elapsed()
    );

    return Ok(sample);
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::{partition_seed, sample};
    use crate::error::Component;

    #[fixture]
    fn records() -> Vec<u32> {
        Vec::from_iter((0..500).map(|v| v * 7 % 1009))
    }

    #[rstest]
    fn test_sample_is_reproducible(records: Vec<u32>) {
        let first = sample(0, &records, 100, 17).unwrap();
        let second = sample(0, &records, 100, 17).unwrap();

        assert_eq!(first.len(), 100);
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_sample_draws_from_partition(records: Vec<u32>) {
        let drawn = sample(1, &records, 250, 3).unwrap();
        assert!(drawn.iter().all(|value| records.contains(value)));
    }

    #[rstest]
    fn test_seeds_give_different_samples(records: Vec<u32>) {
        let first = sample(0, &records, 50, partition_seed(10, 0)).unwrap();
        let second = sample(1, &records, 50, partition_seed(10, 1)).unwrap();
        assert_ne!(first, second);
    }

    #[rstest]
    #[case(vec![4], 3, vec![4, 4, 4])]
    #[case(vec![1, 2, 3], 0, vec![])]
    #[case(vec![], 0, vec![])]
    fn test_sample_edge_cases(#[case] records: Vec<u32>, #[case] size: usize, #[case] expected: Vec<u32>) {
        assert_eq!(sample(0, &records, size, 1).unwrap(), expected);
    }

    #[test]
    fn test_empty_partition() {
        let err = sample::<u32>(5, &[], 10, 0).unwrap_err();
        assert!(err.is_invalid_argument_of(Component::Sampler));
        assert!(err.to_string().contains("partition 5"), "{}", err);
    }

    #[test]
    fn test_partition_seed() {
        assert_eq!(partition_seed(100, 3), 103);
        assert_eq!(partition_seed(u64::MAX, 1), 0);
    }
}
