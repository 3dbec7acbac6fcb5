//! Input sources partitions are loaded from.

use std::fmt::Display;
use std::fs;
use std::io::{self, prelude::*};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde;

/// Input source interface. Provides all records of one input (file, in-memory buffer, etc.).
pub trait InputSource<T>: Send + Sync {
    /// Returns the source name used in logs and error messages.
    fn name(&self) -> String;

    /// Reads all records of the source in their stored order.
    fn read_records(&self) -> io::Result<Vec<T>>;
}

/// MessagePack file source. The file is a plain stream of MessagePack encoded records.
/// For more information see https://msgpack.org/.
pub struct RmpFileSource<T> {
    path: PathBuf,
    rw_buf_size: Option<usize>,

    item_type: PhantomData<fn() -> T>,
}

impl<T> RmpFileSource<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RmpFileSource {
            path: path.into(),
            rw_buf_size: None,
            item_type: PhantomData,
        }
    }

    /// Sets file read buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> Self {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

impl<T> InputSource<T> for RmpFileSource<T>
where
    T: serde::de::DeserializeOwned,
{
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_records(&self) -> io::Result<Vec<T>> {
        let file = fs::File::open(&self.path)?;
        let file_len = file.metadata()?.len();

        let reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };
        let mut reader = reader.take(file_len);

        let mut records = Vec::new();
        while reader.limit() > 0 {
            let record = rmp_serde::decode::from_read(&mut reader)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            records.push(record);
        }

        return Ok(records);
    }
}

/// Writes records to a file as a MessagePack stream readable by [`RmpFileSource`].
pub fn write_rmp_file<T>(path: &Path, items: impl IntoIterator<Item = T>) -> io::Result<()>
where
    T: serde::ser::Serialize,
{
    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    for item in items.into_iter() {
        rmp_serde::encode::write(&mut writer, &item).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    }
    writer.flush()?;

    return Ok(());
}

/// Text file source. Every non-blank line holds one record.
pub struct TextFileSource<T> {
    path: PathBuf,

    item_type: PhantomData<fn() -> T>,
}

impl<T> TextFileSource<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TextFileSource {
            path: path.into(),
            item_type: PhantomData,
        }
    }
}

impl<T> InputSource<T> for TextFileSource<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_records(&self) -> io::Result<Vec<T>> {
        let reader = io::BufReader::new(fs::File::open(&self.path)?);

        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record = line.parse::<T>().map_err(|err| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line {}: '{}': {}", line_no + 1, line, err),
                )
            })?;
            records.push(record);
        }

        return Ok(records);
    }
}

/// Writes records to a file one per line, readable by [`TextFileSource`].
pub fn write_text_file<T>(path: &Path, items: impl IntoIterator<Item = T>) -> io::Result<()>
where
    T: Display,
{
    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    for item in items.into_iter() {
        writeln!(writer, "{}", item)?;
    }
    writer.flush()?;

    return Ok(());
}

/// In-memory source.
pub struct MemorySource<T> {
    name: String,
    records: Vec<T>,
}

impl<T> MemorySource<T> {
    pub fn new(name: impl Into<String>, records: Vec<T>) -> Self {
        MemorySource {
            name: name.into(),
            records,
        }
    }
}

impl<T> InputSource<T> for MemorySource<T>
where
    T: Clone + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_records(&self) -> io::Result<Vec<T>> {
        Ok(self.records.clone())
    }
}

/// Splits a list of sources into `groups_number` contiguous groups of nearly equal size.
/// Leading groups take one extra source each when the sources don't divide evenly.
/// Groups are empty when there are fewer sources than groups.
pub fn group_sources<S>(sources: Vec<S>, groups_number: usize) -> Vec<Vec<S>> {
    if groups_number == 0 {
        return Vec::new();
    }

    let base = sources.len() / groups_number;
    let extra = sources.len() % groups_number;

    let mut sources = sources.into_iter();
    return (0..groups_number)
        .map(|idx| {
            let size = if idx < extra { base + 1 } else { base };
            sources.by_ref().take(size).collect()
        })
        .collect();
}

#[cfg(test)]
mod test {
    use std::io;

    use rstest::*;

    use super::{group_sources, write_rmp_file, write_text_file, InputSource, RmpFileSource, TextFileSource};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    fn test_rmp_source(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input.rmp");
        let saved = vec![5i64, -3, 1_000_000_000_000, 0, 5];
        write_rmp_file(&path, saved.clone()).unwrap();

        let source = RmpFileSource::<i64>::new(&path).with_rw_buf_size(16);
        assert_eq!(source.read_records().unwrap(), saved);
    }

    #[rstest]
    fn test_text_source(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input.txt");
        write_text_file(&path, vec![42u32, 7, 7, 19]).unwrap();

        let source = TextFileSource::<u32>::new(&path);
        assert_eq!(source.read_records().unwrap(), vec![42, 7, 7, 19]);
    }

    #[rstest]
    fn test_text_source_malformed_line(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input.txt");
        std::fs::write(&path, "1\n\n2\nthree\n").unwrap();

        let err = TextFileSource::<u32>::new(&path).read_records().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().starts_with("line 4: 'three'"), "{}", err);
    }

    #[rstest]
    fn test_missing_file(tmp_dir: tempfile::TempDir) {
        let source = RmpFileSource::<i64>::new(tmp_dir.path().join("absent.rmp"));
        let err = source.read_records().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[rstest]
    #[case(vec![1, 2, 3, 4, 5, 6], 3, vec![vec![1, 2], vec![3, 4], vec![5, 6]])]
    #[case(vec![1, 2, 3, 4, 5], 3, vec![vec![1, 2], vec![3, 4], vec![5]])]
    #[case(vec![1, 2], 4, vec![vec![1], vec![2], vec![], vec![]])]
    #[case(vec![1, 2, 3], 1, vec![vec![1, 2, 3]])]
    #[case(vec![1, 2, 3], 0, vec![])]
    fn test_group_sources(#[case] sources: Vec<i32>, #[case] groups: usize, #[case] expected: Vec<Vec<i32>>) {
        assert_eq!(group_sources(sources, groups), expected);
    }
}
