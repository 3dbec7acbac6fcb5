//! Output shard merger.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;

use log;

use crate::error::{Component, ExecutorErrorKind, SortError};
use crate::executor::{Handle, ObjectStore};

/// Algorithm used to merge the sub-ranges of one range into an output shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Binary heap k-way merge of the already sorted sub-ranges.
    KWay,
    /// Concatenation followed by a full sort.
    Concatenate,
}

impl Default for MergeStrategy {
    fn default() -> Self {
        MergeStrategy::KWay
    }
}

/// Binary heap merger implementation.
/// Merges multiple sorted inputs into a single sorted output.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number of items,
/// *n* is the number of inputs.
pub struct KWayMerger<T, I>
where
    T: Ord,
    I: Iterator<Item = T>,
{
    // binary heap is max-heap by default so we reverse it to convert it to min-heap,
    // equal items are taken in input order
    items: BinaryHeap<Reverse<(T, usize)>>,
    inputs: Vec<I>,
    initiated: bool,
}

impl<T, I> KWayMerger<T, I>
where
    T: Ord,
    I: Iterator<Item = T>,
{
    /// Creates an instance of a merger.
    /// Input items should be sorted in ascending order otherwise the result is undefined.
    pub fn new<C>(inputs: C) -> Self
    where
        C: IntoIterator,
        C::Item: IntoIterator<Item = T, IntoIter = I>,
    {
        let inputs = Vec::from_iter(inputs.into_iter().map(|input| input.into_iter()));
        let items = BinaryHeap::with_capacity(inputs.len());

        return KWayMerger {
            inputs,
            items,
            initiated: false,
        };
    }
}

impl<T, I> Iterator for KWayMerger<T, I>
where
    T: Ord,
    I: Iterator<Item = T>,
{
    type Item = T;

    /// Returns the next item from the inputs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if !self.initiated {
            for (idx, input) in self.inputs.iter_mut().enumerate() {
                if let Some(item) = input.next() {
                    self.items.push(Reverse((item, idx)));
                }
            }
            self.initiated = true;
        }

        let Reverse((result, idx)) = self.items.pop()?;
        if let Some(item) = self.inputs[idx].next() {
            self.items.push(Reverse((item, idx)));
        }

        return Some(result);
    }
}

/// Merges sorted sub-ranges into one sorted shard.
pub fn merge_sorted<T>(sub_ranges: &[Arc<Vec<T>>], strategy: MergeStrategy) -> Vec<T>
where
    T: Ord + Clone,
{
    let total = sub_ranges.iter().map(|sub_range| sub_range.len()).sum();
    let mut shard = Vec::with_capacity(total);

    match strategy {
        MergeStrategy::KWay => {
            shard.extend(KWayMerger::new(sub_ranges.iter().map(|sub_range| sub_range.iter().cloned())));
        }
        MergeStrategy::Concatenate => {
            for sub_range in sub_ranges {
                shard.extend_from_slice(sub_range);
            }
            shard.sort_unstable();
        }
    }

    return shard;
}

/// Resolves one range's sub-ranges from every partition and merges them into an output shard.
///
/// # Arguments
/// * `store` - Object store holding the sub-ranges
/// * `range` - Index of the merged range, used for error reporting
/// * `sub_ranges` - Sub-range handles ordered by partition index
/// * `partitions_number` - Expected number of sub-ranges
/// * `strategy` - Merge algorithm
pub fn merge_range<T>(
    store: &ObjectStore,
    range: usize,
    sub_ranges: &[Handle<Vec<T>>],
    partitions_number: usize,
    strategy: MergeStrategy,
) -> Result<Vec<T>, SortError>
where
    T: Ord + Clone + Send + Sync + 'static,
{
    if sub_ranges.len() != partitions_number {
        return Err(SortError::invalid_argument(
            Component::Merger,
            format!(
                "range {}: got {} sub-ranges, expected one per partition ({})",
                range,
                sub_ranges.len(),
                partitions_number
            ),
        ));
    }

    let started = Instant::now();
    let mut resolved = Vec::with_capacity(sub_ranges.len());
    for (partition, handle) in sub_ranges.iter().enumerate() {
        let sub_range = store.get(handle).map_err(|err| match err {
            SortError::ExecutorFailure(failure) if failure.kind == ExecutorErrorKind::MissingObject => {
                SortError::invalid_argument(
                    Component::Merger,
                    format!("range {}: sub-range of partition {} is missing ({})", range, partition, handle.id()),
                )
            }
            err => err,
        })?;
        resolved.push(sub_range);
    }

    let shard = merge_sorted(&resolved, strategy);
    log::debug!(
        "merged range {} from {} sub-ranges: {} records in {:?}",
        range,
        resolved.len(),
        shard.len(),
        started.elapsed()
    );

    return Ok(shard);
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use std::sync::Arc;

    use rand::seq::SliceRandom;
    use rstest::*;

    use super::{merge_range, merge_sorted, KWayMerger, MergeStrategy};
    use crate::error::Component;
    use crate::executor::ObjectStore;

    #[rstest]
    #[case(
        vec![],
        vec![],
    )]
    #[case(
        vec![
            vec![],
            vec![]
        ],
        vec![],
    )]
    #[case(
        vec![
            vec![4, 5, 7],
            vec![1, 6],
            vec![3],
            vec![],
        ],
        vec![1, 3, 4, 5, 6, 7],
    )]
    #[case(
        vec![
            vec![2, 2, 8],
            vec![2, 8, 8],
        ],
        vec![2, 2, 2, 8, 8, 8],
    )]
    fn test_merger(#[case] inputs: Vec<Vec<i32>>, #[case] expected_result: Vec<i32>) {
        let merger = KWayMerger::new(inputs);
        let actual_result = Vec::from_iter(merger);
        assert_eq!(actual_result, expected_result);
    }

    #[test]
    fn test_merger_takes_equal_items_in_input_order() {
        // ordered by key only, so equal keys are told apart by their tag
        #[derive(Debug, Clone, Copy)]
        struct Tagged(i32, char);

        impl PartialEq for Tagged {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }

        impl Eq for Tagged {}

        impl PartialOrd for Tagged {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for Tagged {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.cmp(&other.0)
            }
        }

        let inputs = vec![
            vec![Tagged(1, 'c'), Tagged(2, 'z')],
            vec![Tagged(1, 'b'), Tagged(2, 'y')],
            vec![Tagged(0, 'x'), Tagged(1, 'a'), Tagged(2, 'x')],
        ];
        let tags = Vec::from_iter(KWayMerger::new(inputs).map(|Tagged(key, tag)| (key, tag)));
        assert_eq!(tags, vec![(0, 'x'), (1, 'c'), (1, 'b'), (1, 'a'), (2, 'z'), (2, 'y'), (2, 'x')]);
    }

    #[rstest]
    #[case(MergeStrategy::KWay)]
    #[case(MergeStrategy::Concatenate)]
    fn test_strategies_agree(#[case] strategy: MergeStrategy) {
        let mut all = Vec::from_iter((0..300).map(|v| v % 41));
        all.shuffle(&mut rand::thread_rng());

        let sub_ranges = Vec::from_iter(all.chunks(70).map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.sort();
            Arc::new(chunk)
        }));

        all.sort();
        assert_eq!(merge_sorted(&sub_ranges, strategy), all);
    }

    #[test]
    fn test_merge_range() {
        let store = ObjectStore::new();
        let handles = vec![store.put(vec![1, 4]), store.put(vec![]), store.put(vec![2, 3, 5])];

        let shard = merge_range(&store, 0, &handles, 3, MergeStrategy::KWay).unwrap();
        assert_eq!(shard, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_merge_range_missing_sub_range() {
        let store = ObjectStore::new();
        let handles = vec![store.put(vec![1]), store.put(vec![2])];
        store.release(handles[1].id());

        let err = merge_range(&store, 3, &handles, 2, MergeStrategy::KWay).unwrap_err();
        assert!(err.is_invalid_argument_of(Component::Merger));
        assert!(err.to_string().contains("partition 1"), "{}", err);

        let err = merge_range(&store, 3, &handles[..1], 2, MergeStrategy::Concatenate).unwrap_err();
        assert!(err.is_invalid_argument_of(Component::Merger));
    }
}
