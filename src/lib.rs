//! `sample-sort` is a parallel sample sort over partitioned numeric inputs.
//!
//! Input records arrive as a number of partitions, each one loaded from a group of input sources. Instead of
//! merging all partitions on a single node the records are range-partitioned: a random sample of every partition
//! is taken, the merged sample defines split points dividing the value domain into ranges of roughly equal size,
//! every partition is sorted and sliced along the split points, and the slices of every range are merged into one
//! sorted output shard. Concatenated in range order the shards form the fully sorted input.
//!
//! # Overview
//!
//! Every step runs as independent tasks on an [`Executor`]. Intermediate results (partitions, samples,
//! sub-ranges, shards) are immutable objects in a shared [`ObjectStore`] referenced by [`Handle`]s, so large
//! record sequences are never copied through the driver.
//!
//! * **Loader:** [`loader::load_partition`] concatenates the records of a source group.
//! * **Sampler:** [`sampler::sample`] draws a seeded uniform sample with replacement.
//! * **Planner:** [`planner::plan_split_points`] derives split points from all samples.
//! * **Splitter:** [`splitter::split_partition`] sorts a partition and slices it into ranges.
//! * **Merger:** [`merger::merge_range`] merges one range's sub-ranges into an output shard.
//! * **Driver:** [`SampleSort`] sequences the steps with a barrier between each of them.
//!
//! # Example
//!
//! ```no_run
//! use sample_sort::{group_sources, InputSource, SampleSortBuilder, TextFileSource};
//!
//! fn main() {
//!     let sources = Vec::from_iter((0..8).map(|idx| {
//!         Box::new(TextFileSource::<i64>::new(format!("input-{}.txt", idx))) as Box<dyn InputSource<i64>>
//!     }));
//!
//!     let sorter = SampleSortBuilder::new()
//!         .with_threads_number(4)
//!         .with_sample_size(1000)
//!         .build()
//!         .unwrap();
//!
//!     let output = sorter.sort(group_sources(sources, 4)).unwrap();
//!     for (range, size) in output.shard_sizes().unwrap().into_iter().enumerate() {
//!         println!("shard {}: {} records", range, size);
//!     }
//! }
//! ```

pub mod driver;
pub mod error;
pub mod executor;
pub mod loader;
pub mod merger;
pub mod phase;
pub mod planner;
pub mod sampler;
pub mod source;
pub mod splitter;

pub use driver::{run_sort, Record, RunOutcome, SampleSort, SampleSortBuilder, SortConfig, SortOutput, SourceGroups};
pub use error::{Component, ExecutorError, ExecutorErrorKind, SortError};
pub use executor::{Executor, Handle, InlineExecutor, ObjectId, ObjectStore, RayonExecutor};
pub use merger::{KWayMerger, MergeStrategy};
pub use phase::{LogReportSink, NoopMarkers, PhaseMarkers, ReportSink, RunReport, RunSummary, TimingMarkers};
pub use source::{group_sources, InputSource, MemorySource, RmpFileSource, TextFileSource};
pub use splitter::SubRangeGrid;
