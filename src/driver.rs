//! Sample sort pipeline driver.

use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use log;

use crate::error::{Component, SortError};
use crate::executor::{Executor, Handle, ObjectId, ObjectStore, RayonExecutor};
use crate::loader::load_partition;
use crate::merger::{merge_range, MergeStrategy};
use crate::phase::{NoopMarkers, PhaseMarkers, RunReport, RunSummary};
use crate::planner::plan_split_points;
use crate::sampler::{partition_seed, sample};
use crate::source::InputSource;
use crate::splitter::{split_partition, SubRangeGrid};

/// Sortable record.
pub trait Record: Ord + Clone + Debug + Send + Sync + 'static {}

impl<T> Record for T where T: Ord + Clone + Debug + Send + Sync + 'static {}

/// Input sources of every partition, one group per partition.
pub type SourceGroups<T> = Vec<Vec<Box<dyn InputSource<T>>>>;

/// Default number of records sampled from every partition.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

fn release_all(store: &ObjectStore, ids: impl IntoIterator<Item = ObjectId>) {
    for id in ids {
        store.release(id);
    }
}

fn ids_of<T>(handles: &[Handle<T>]) -> Vec<ObjectId> {
    Vec::from_iter(handles.iter().map(|handle| handle.id()))
}

/// Sorted output of a run. Shards stay in the object store until the output is dropped.
pub struct SortOutput<T> {
    shards: Vec<Handle<Vec<T>>>,
    store: Arc<ObjectStore>,
}

impl<T> SortOutput<T>
where
    T: Send + Sync + 'static,
{
    /// Returns shard handles ordered by range index.
    pub fn shards(&self) -> &[Handle<Vec<T>>] {
        &self.shards
    }

    /// Returns number of shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Returns the records of one shard.
    pub fn shard(&self, range: usize) -> Result<Arc<Vec<T>>, SortError> {
        let handle = self.shards.get(range).ok_or_else(|| {
            SortError::invalid_argument(
                Component::Driver,
                format!("range {} out of bounds ({} shards)", range, self.shards.len()),
            )
        })?;

        self.store.get(handle)
    }

    /// Returns number of records in every shard, ordered by range index.
    pub fn shard_sizes(&self) -> Result<Vec<usize>, SortError> {
        self.shards
            .iter()
            .map(|handle| self.store.get(handle).map(|shard| shard.len()))
            .collect()
    }

    /// Returns total number of sorted records.
    pub fn total_records(&self) -> Result<usize, SortError> {
        Ok(self.shard_sizes()?.into_iter().sum())
    }

    /// Concatenates all shards into one sorted vector.
    pub fn to_vec(&self) -> Result<Vec<T>, SortError>
    where
        T: Clone,
    {
        let mut sorted = Vec::new();
        for handle in &self.shards {
            sorted.extend_from_slice(&self.store.get(handle)?);
        }

        return Ok(sorted);
    }
}

impl<T> fmt::Debug for SortOutput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortOutput").field("shards", &self.shards).finish()
    }
}

impl<T> Drop for SortOutput<T> {
    fn drop(&mut self) {
        release_all(&self.store, ids_of(&self.shards));
    }
}

/// Result of a run: the output of the last iteration plus a report per iteration.
#[derive(Debug)]
pub struct RunOutcome<T> {
    pub output: SortOutput<T>,
    pub reports: Vec<RunReport>,
    pub summary: RunSummary,
}

/// Sample sort builder. Provides methods for [`SampleSort`] initialization.
#[derive(Clone)]
pub struct SampleSortBuilder<T> {
    /// Number of worker threads.
    threads_number: Option<usize>,
    /// Number of partitions (and output shards). Defaults to the number of source groups.
    partitions_number: Option<usize>,
    /// Number of records sampled from every partition.
    sample_size: usize,
    /// Base seed partition sampling seeds are derived from.
    seed: u64,
    /// Number of measured iterations per run.
    iterations: usize,
    /// Shard merge algorithm.
    merge_strategy: MergeStrategy,

    /// Record type.
    item_type: PhantomData<fn() -> T>,
}

impl<T> SampleSortBuilder<T>
where
    T: Record,
{
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        SampleSortBuilder::default()
    }

    /// Sets number of worker threads.
    pub fn with_threads_number(mut self, threads_number: usize) -> SampleSortBuilder<T> {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets number of partitions.
    pub fn with_partitions_number(mut self, partitions_number: usize) -> SampleSortBuilder<T> {
        self.partitions_number = Some(partitions_number);
        return self;
    }

    /// Sets number of records sampled from every partition.
    pub fn with_sample_size(mut self, sample_size: usize) -> SampleSortBuilder<T> {
        self.sample_size = sample_size;
        return self;
    }

    /// Sets base sampling seed.
    pub fn with_seed(mut self, seed: u64) -> SampleSortBuilder<T> {
        self.seed = seed;
        return self;
    }

    /// Sets number of measured iterations.
    pub fn with_iterations(mut self, iterations: usize) -> SampleSortBuilder<T> {
        self.iterations = iterations;
        return self;
    }

    /// Sets shard merge algorithm.
    pub fn with_merge_strategy(mut self, merge_strategy: MergeStrategy) -> SampleSortBuilder<T> {
        self.merge_strategy = merge_strategy;
        return self;
    }

    fn validate(&self) -> Result<(), SortError> {
        if self.threads_number == Some(0) {
            return Err(SortError::invalid_argument(Component::Config, "threads number must be positive"));
        }
        if self.partitions_number == Some(0) {
            return Err(SortError::invalid_argument(Component::Config, "partitions number must be positive"));
        }
        if self.sample_size == 0 {
            return Err(SortError::invalid_argument(Component::Config, "sample size must be positive"));
        }
        if self.iterations == 0 {
            return Err(SortError::invalid_argument(Component::Config, "iterations number must be positive"));
        }

        return Ok(());
    }

    /// Builds a [`SampleSort`] instance running on a rayon thread pool.
    pub fn build(self) -> Result<SampleSort<T, RayonExecutor>, SortError> {
        self.validate()?;
        let executor = RayonExecutor::new(self.threads_number)?;

        return self.build_with_executor(executor);
    }

    /// Builds a [`SampleSort`] instance running on the provided executor.
    /// The threads number setting is ignored.
    pub fn build_with_executor<X: Executor>(self, executor: X) -> Result<SampleSort<T, X>, SortError> {
        self.validate()?;

        return Ok(SampleSort {
            executor,
            partitions_number: self.partitions_number,
            sample_size: self.sample_size,
            seed: self.seed,
            iterations: self.iterations,
            merge_strategy: self.merge_strategy,
            item_type: PhantomData,
        });
    }
}

impl<T> Default for SampleSortBuilder<T> {
    fn default() -> Self {
        SampleSortBuilder {
            threads_number: None,
            partitions_number: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: 0,
            iterations: 1,
            merge_strategy: MergeStrategy::default(),
            item_type: PhantomData,
        }
    }
}

/// Sample sort pipeline.
pub struct SampleSort<T, X = RayonExecutor> {
    executor: X,
    partitions_number: Option<usize>,
    sample_size: usize,
    seed: u64,
    iterations: usize,
    merge_strategy: MergeStrategy,

    item_type: PhantomData<fn() -> T>,
}

impl<T, X> SampleSort<T, X>
where
    T: Record,
    X: Executor,
{
    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Performs one full run (loading and sorting) without phase markers.
    pub fn sort(&self, groups: SourceGroups<T>) -> Result<SortOutput<T>, SortError> {
        let partitions = self.load(groups)?;
        let output = self.sort_partitions(&partitions);
        release_all(self.executor.store(), ids_of(&partitions));

        return output;
    }

    /// Loads the partitions once (setup phase) and sorts them as many times as configured (measured phase).
    /// Returns the output of the last iteration.
    pub fn run(&self, groups: SourceGroups<T>, markers: &mut dyn PhaseMarkers) -> Result<RunOutcome<T>, SortError> {
        let summary = RunSummary {
            benchmark_name: "sort".to_string(),
            implementation: env!("CARGO_PKG_NAME").to_string(),
            iterations: self.iterations,
            workers: self.executor.workers_number(),
            partitions: groups.len(),
            input_source_base: groups.iter().flatten().next().map(|source| source.name()),
            inputs_number: groups.iter().map(|group| group.len()).sum(),
        };

        markers.begin_setup_phase();
        let partitions = self.load(groups);
        markers.end_setup_phase();
        let partitions = partitions?;

        let result = self.run_iterations(&partitions, markers);
        release_all(self.executor.store(), ids_of(&partitions));
        let (output, reports) = result?;

        return Ok(RunOutcome {
            output,
            reports,
            summary,
        });
    }

    fn run_iterations(
        &self,
        partitions: &[Handle<Vec<T>>],
        markers: &mut dyn PhaseMarkers,
    ) -> Result<(SortOutput<T>, Vec<RunReport>), SortError> {
        let mut reports = Vec::with_capacity(self.iterations);
        let mut last_output = None;

        for iteration in 0..self.iterations {
            markers.begin_measured_phase(iteration);
            let started = Instant::now();
            let output = self.sort_partitions(partitions);
            let elapsed = started.elapsed();
            markers.end_measured_phase(iteration);

            let output = output?;
            reports.push(RunReport {
                iteration,
                shard_sizes: output.shard_sizes()?,
                elapsed,
            });
            last_output = Some(output);
        }

        let output = last_output
            .ok_or_else(|| SortError::invalid_argument(Component::Driver, "no iterations were run"))?;

        return Ok((output, reports));
    }

    fn check_groups(&self, groups: &SourceGroups<T>) -> Result<(), SortError> {
        if groups.is_empty() {
            return Err(SortError::invalid_argument(
                Component::Config,
                "at least one input source group is required",
            ));
        }

        if let Some(partitions_number) = self.partitions_number {
            if partitions_number != groups.len() {
                return Err(SortError::invalid_argument(
                    Component::Config,
                    format!(
                        "{} input source groups given for {} partitions",
                        groups.len(),
                        partitions_number
                    ),
                ));
            }
        }

        return Ok(());
    }

    /// Loads every source group into a partition published in the object store.
    /// Returns partition handles ordered by partition index once every partition is loaded.
    pub fn load(&self, groups: SourceGroups<T>) -> Result<Vec<Handle<Vec<T>>>, SortError> {
        self.check_groups(&groups)?;
        log::info!("loading {} partitions", groups.len());

        let partitions = Vec::from_iter(groups.into_iter().enumerate().map(|(partition, sources)| {
            self.executor
                .submit(format!("load-{}", partition), move |_| load_partition(partition, &sources))
        }));

        if let Err(err) = self.wait_resolved(&partitions) {
            release_all(self.executor.store(), ids_of(&partitions));
            return Err(err);
        }

        return Ok(partitions);
    }

    // all handles are submitted before the first wait
    fn wait_resolved<V>(&self, handles: &[Handle<V>]) -> Result<(), SortError>
    where
        V: Send + Sync + 'static,
    {
        self.executor.await_all(&ids_of(handles))?;
        for handle in handles {
            self.executor.resolve(handle)?;
        }

        return Ok(());
    }

    // waits for every split so that no sub-range is published after a failure is reported,
    // sub-ranges of successful splits are released when any split failed
    fn resolve_split_rows(
        &self,
        splits: &[Handle<Vec<Handle<Vec<T>>>>],
    ) -> Result<Vec<Arc<Vec<Handle<Vec<T>>>>>, SortError> {
        self.executor.await_all(&ids_of(splits))?;

        let mut rows = Vec::with_capacity(splits.len());
        let mut failure = None;
        for split in splits {
            match self.executor.resolve(split) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        match failure {
            None => Ok(rows),
            Some(err) => {
                for row in &rows {
                    release_all(self.executor.store(), ids_of(row.as_slice()));
                }
                Err(err)
            }
        }
    }

    /// Sorts loaded partitions: samples every partition, plans split points, splits every partition into
    /// sub-ranges and merges every range into an output shard.
    pub fn sort_partitions(&self, partitions: &[Handle<Vec<T>>]) -> Result<SortOutput<T>, SortError> {
        let partitions_number = partitions.len();
        if partitions_number == 0 {
            return Err(SortError::invalid_argument(Component::Driver, "no partitions to sort"));
        }
        let store = self.executor.store();

        log::debug!("sampling {} partitions ...", partitions_number);
        let samples = Vec::from_iter(partitions.iter().enumerate().map(|(partition, handle)| {
            let handle = *handle;
            let sample_size = self.sample_size;
            let seed = partition_seed(self.seed, partition);

            self.executor.submit(format!("sample-{}", partition), move |store| {
                let records = store.get(&handle)?;
                sample(partition, &records, sample_size, seed)
            })
        }));
        let resolved = self.executor.resolve_all(&samples);
        release_all(store, ids_of(&samples));
        let resolved = resolved?;

        let views = Vec::from_iter(resolved.iter().map(|drawn| drawn.as_slice()));
        let split_points = Arc::new(plan_split_points(&views)?);
        log::debug!("planned {} split points", split_points.len());

        let splits = Vec::from_iter(partitions.iter().enumerate().map(|(partition, handle)| {
            let handle = *handle;
            let split_points = split_points.clone();

            self.executor.submit(format!("split-{}", partition), move |store| {
                let records = store.get(&handle)?;
                let ranges = split_partition(partition, &records, &split_points)?;
                Ok(Vec::from_iter(ranges.into_iter().map(|range| store.put(range))))
            })
        }));
        let rows = self.resolve_split_rows(&splits);
        release_all(store, ids_of(&splits));
        let rows = rows?;
        let grid: SubRangeGrid<T> = SubRangeGrid::from_rows(rows.iter().map(|row| row.as_slice()), partitions_number)?;
        log::debug!("split {} partitions into {} ranges", grid.partitions_number(), grid.ranges_number());

        let shards = Vec::from_iter((0..grid.ranges_number()).map(|range| {
            let sub_ranges = grid.range(range);
            let merge_strategy = self.merge_strategy;

            self.executor.submit(format!("merge-{}", range), move |store| {
                merge_range(store, range, &sub_ranges, partitions_number, merge_strategy)
            })
        }));
        let merged = self.wait_resolved(&shards);
        grid.release(store);
        if let Err(err) = merged {
            release_all(store, ids_of(&shards));
            return Err(err);
        }
        log::debug!("merged {} shards", shards.len());

        return Ok(SortOutput {
            shards,
            store: store.clone(),
        });
    }
}

/// Run configuration provided by the surrounding harness.
pub struct SortConfig<T> {
    /// Number of worker threads, CPU core based when [`None`].
    pub workers: Option<usize>,
    pub partitions: usize,
    pub input_source_groups: SourceGroups<T>,
    pub sample_size: usize,
    pub seed: u64,
}

/// Performs exactly one full pipeline run and returns once every output shard is materialized.
pub fn run_sort<T>(config: SortConfig<T>) -> Result<SortOutput<T>, SortError>
where
    T: Record,
{
    let mut builder = SampleSortBuilder::new()
        .with_partitions_number(config.partitions)
        .with_sample_size(config.sample_size)
        .with_seed(config.seed);
    if let Some(workers) = config.workers {
        builder = builder.with_threads_number(workers);
    }

    let sorter = builder.build()?;
    let outcome = sorter.run(config.input_source_groups, &mut NoopMarkers)?;

    return Ok(outcome.output);
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;
    use std::thread;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    use super::{run_sort, SampleSort, SampleSortBuilder, SortConfig, SourceGroups};
    use crate::error::{Component, ExecutorErrorKind, SortError};
    use crate::executor::{Executor, InlineExecutor, RayonExecutor};
    use crate::merger::MergeStrategy;
    use crate::phase::TimingMarkers;
    use crate::source::{InputSource, MemorySource};

    fn groups_of(partitions: Vec<Vec<i64>>) -> SourceGroups<i64> {
        Vec::from_iter(partitions.into_iter().enumerate().map(|(idx, records)| {
            vec![Box::new(MemorySource::new(format!("mem-{}", idx), records)) as Box<dyn InputSource<i64>>]
        }))
    }

    fn random_partitions(partitions: usize, records: usize, max: i64, seed: u64) -> Vec<Vec<i64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        Vec::from_iter((0..partitions).map(|_| Vec::from_iter((0..records).map(|_| rng.gen_range(0..max)))))
    }

    #[fixture]
    fn sorter() -> SampleSort<i64, RayonExecutor> {
        SampleSortBuilder::new()
            .with_threads_number(4)
            .with_sample_size(100)
            .with_seed(11)
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_four_partitions(sorter: SampleSort<i64, RayonExecutor>) {
        let partitions = random_partitions(4, 1000, 10_000, 1);
        let mut expected = partitions.concat();
        expected.sort();

        let output = sorter.sort(groups_of(partitions)).unwrap();
        assert_eq!(output.len(), 4);
        assert_eq!(output.total_records().unwrap(), 4000);

        let shards = Vec::from_iter((0..4).map(|range| output.shard(range).unwrap()));
        for shard in &shards {
            assert!(shard.windows(2).all(|pair| pair[0] <= pair[1]));
        }
        for pair in shards.windows(2) {
            if let (Some(max), Some(min)) = (pair[0].last(), pair[1].first()) {
                assert!(max <= min);
            }
        }
        // boundaries follow the sampled quartiles, allow generous slack for sampling noise
        for (range, shard) in shards.iter().take(3).enumerate() {
            let boundary = *shard.last().unwrap();
            let quartile = 2500 * (range as i64 + 1);
            assert!((boundary - quartile).abs() < 1500, "range {} ends at {}", range, boundary);
        }

        assert_eq!(output.to_vec().unwrap(), expected);
    }

    #[test]
    fn test_single_partition() {
        let sorter: SampleSort<i64, _> = SampleSortBuilder::new()
            .with_partitions_number(1)
            .with_sample_size(10)
            .build_with_executor(InlineExecutor::new())
            .unwrap();

        let output = sorter.sort(groups_of(vec![vec![5, -1, 3, 3, 0]])).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(*output.shard(0).unwrap(), vec![-1, 0, 3, 3, 5]);
    }

    #[rstest]
    fn test_identical_records(sorter: SampleSort<i64, RayonExecutor>) {
        let output = sorter.sort(groups_of(vec![vec![7; 50], vec![7; 20], vec![7; 30]])).unwrap();

        let sizes = output.shard_sizes().unwrap();
        assert_eq!(sizes, vec![100, 0, 0]);
        assert_eq!(output.to_vec().unwrap(), vec![7; 100]);
    }

    #[rstest]
    fn test_empty_partition(sorter: SampleSort<i64, RayonExecutor>) {
        let err = sorter.sort(groups_of(vec![vec![1, 2], vec![]])).unwrap_err();
        assert!(err.is_invalid_argument_of(Component::Sampler), "{}", err);
        assert!(err.to_string().contains("partition 1"), "{}", err);
    }

    #[rstest]
    #[case(MergeStrategy::KWay)]
    #[case(MergeStrategy::Concatenate)]
    fn test_inline_and_pool_agree(#[case] merge_strategy: MergeStrategy) {
        let partitions = random_partitions(5, 300, 500, 9);
        let builder = SampleSortBuilder::new()
            .with_sample_size(20)
            .with_seed(3)
            .with_merge_strategy(merge_strategy);

        let inline = builder.clone().build_with_executor(InlineExecutor::new()).unwrap();
        let pool = builder.with_threads_number(3).build().unwrap();

        let inline_output = inline.sort(groups_of(partitions.clone())).unwrap();
        let pool_output = pool.sort(groups_of(partitions)).unwrap();

        assert_eq!(inline_output.shard_sizes().unwrap(), pool_output.shard_sizes().unwrap());
        assert_eq!(inline_output.to_vec().unwrap(), pool_output.to_vec().unwrap());
    }

    #[test]
    fn test_iterations_are_reported() {
        let sorter: SampleSort<i64, _> = SampleSortBuilder::new()
            .with_sample_size(10)
            .with_iterations(3)
            .build_with_executor(InlineExecutor::new())
            .unwrap();
        let mut markers = TimingMarkers::new();

        let outcome = sorter.run(groups_of(random_partitions(3, 100, 1000, 5)), &mut markers).unwrap();
        assert_eq!(outcome.reports.len(), 3);
        assert!(outcome.reports.iter().all(|report| report.total_records() == 300));
        assert_eq!(outcome.reports[0].shard_sizes, outcome.reports[2].shard_sizes);
        assert_eq!(markers.measured_elapsed().len(), 3);
        assert!(markers.setup_elapsed().is_some());

        assert_eq!(outcome.summary.iterations, 3);
        assert_eq!(outcome.summary.partitions, 3);
        assert_eq!(outcome.summary.inputs_number, 3);
        assert_eq!(outcome.summary.input_source_base.as_deref(), Some("mem-0"));

        // only the last output stays in the store
        assert_eq!(sorter.executor().store().len(), 3);
        drop(outcome);
        assert!(sorter.executor().store().is_empty());
    }

    #[rstest]
    #[case(SampleSortBuilder::new().with_threads_number(0))]
    #[case(SampleSortBuilder::new().with_partitions_number(0))]
    #[case(SampleSortBuilder::new().with_sample_size(0))]
    #[case(SampleSortBuilder::new().with_iterations(0))]
    fn test_invalid_config(#[case] builder: SampleSortBuilder<i64>) {
        match builder.build() {
            Err(err) => assert!(err.is_invalid_argument_of(Component::Config), "{}", err),
            Ok(_) => panic!("invalid configuration accepted"),
        }
    }

    #[test]
    fn test_groups_must_match_partitions() {
        let sorter: SampleSort<i64, _> = SampleSortBuilder::new()
            .with_partitions_number(3)
            .build_with_executor(InlineExecutor::new())
            .unwrap();

        let err = sorter.sort(groups_of(vec![vec![1], vec![2]])).unwrap_err();
        assert!(err.is_invalid_argument_of(Component::Config), "{}", err);

        let err = sorter.sort(Vec::new()).unwrap_err();
        assert!(err.is_invalid_argument_of(Component::Config), "{}", err);
    }

    #[test]
    fn test_failed_load_aborts_run() {
        struct Unreadable;

        impl InputSource<i64> for Unreadable {
            fn name(&self) -> String {
                "unreadable".to_string()
            }

            fn read_records(&self) -> std::io::Result<Vec<i64>> {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            }
        }

        let sorter: SampleSort<i64, _> = SampleSortBuilder::new()
            .build_with_executor(InlineExecutor::new())
            .unwrap();
        let mut groups = groups_of(vec![vec![1, 2, 3], vec![4]]);
        groups[1].push(Box::new(Unreadable));

        match sorter.sort(groups).unwrap_err() {
            SortError::IO {
                partition, source_name, ..
            } => {
                assert_eq!(partition, 1);
                assert_eq!(source_name, "unreadable");
            }
            err => panic!("unexpected error: {}", err),
        }
        assert!(sorter.executor().store().is_empty());
    }

    /// Record whose comparison panics for a pair of 999s on pool workers.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Fragile(i64);

    impl Ord for Fragile {
        fn cmp(&self, other: &Self) -> Ordering {
            let on_worker = thread::current()
                .name()
                .map_or(false, |name| name.starts_with("sort-worker"));
            if on_worker && self.0 == 999 && other.0 == 999 {
                panic!("fragile comparison");
            }
            self.0.cmp(&other.0)
        }
    }

    impl PartialOrd for Fragile {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    #[test]
    fn test_failed_split_releases_sub_ranges() {
        let sorter: SampleSort<Fragile, _> = SampleSortBuilder::new()
            .with_threads_number(2)
            .with_sample_size(4)
            .build()
            .unwrap();

        let partitions = vec![Vec::from_iter((0..50).map(Fragile)), vec![Fragile(999), Fragile(999)]];
        let groups = Vec::from_iter(partitions.into_iter().enumerate().map(|(idx, records)| {
            vec![Box::new(MemorySource::new(format!("mem-{}", idx), records)) as Box<dyn InputSource<Fragile>>]
        }));

        match sorter.sort(groups).unwrap_err() {
            SortError::ExecutorFailure(err) => {
                assert_eq!(err.kind, ExecutorErrorKind::TaskPanicked);
                assert_eq!(err.task, "split-1");
            }
            err => panic!("unexpected error: {}", err),
        }
        assert!(sorter.executor().store().is_empty());
    }

    #[test]
    fn test_output_debug() {
        let sorter: SampleSort<i64, _> = SampleSortBuilder::new()
            .with_sample_size(4)
            .build_with_executor(InlineExecutor::new())
            .unwrap();

        let output = sorter.sort(groups_of(vec![vec![3, 1], vec![2]])).unwrap();
        let formatted = format!("{:?}", output);
        assert!(formatted.starts_with("SortOutput"), "{}", formatted);
        assert!(formatted.contains("shards"), "{}", formatted);
    }

    #[test]
    fn test_run_sort() {
        let partitions = random_partitions(3, 200, 1_000_000, 21);
        let mut expected = partitions.concat();
        expected.sort();

        let output = run_sort(SortConfig {
            workers: Some(2),
            partitions: 3,
            input_source_groups: groups_of(partitions),
            sample_size: 50,
            seed: 0,
        })
        .unwrap();

        assert_eq!(output.shard_sizes().unwrap().len(), 3);
        assert_eq!(output.to_vec().unwrap(), expected);
    }
}
