//! Partition loader.

use std::time::Instant;

use log;

use crate::error::SortError;
use crate::source::InputSource;

/// Reads every source of a group, in the given order, into a single partition.
/// The resulting partition is not sorted.
///
/// # Arguments
/// * `partition` - Index of the partition being loaded, used for error reporting
/// * `sources` - Input sources the partition consists of
pub fn load_partition<T>(partition: usize, sources: &[Box<dyn InputSource<T>>]) -> Result<Vec<T>, SortError> {
    let started = Instant::now();
    let mut records = Vec::new();

    for source in sources {
        let mut source_records = source.read_records().map_err(|err| SortError::IO {
            partition,
            source_name: source.name(),
            err,
        })?;
        records.append(&mut source_records);
    }

    log::debug!(
        "loaded partition {} from {} source(s): {} records in {:?}",
        partition,
        sources.len(),
        records.len(),
        started.elapsed()
    );

    return Ok(records);
}
