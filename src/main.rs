use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use sample_sort::source::{write_rmp_file, write_text_file};
use sample_sort::{
    group_sources, InputSource, LogReportSink, MergeStrategy, ReportSink, RmpFileSource, SampleSortBuilder,
    SortOutput, TextFileSource, TimingMarkers,
};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let format: Format = arg_parser.value_of_t_or_exit("format");
    let merge: Merge = arg_parser.value_of_t_or_exit("merge");
    let partitions: usize = arg_parser.value_of_t_or_exit("partitions");
    let sample_size: usize = arg_parser.value_of_t_or_exit("sample_size");
    let seed: u64 = arg_parser.value_of_t_or_exit("seed");
    let iterations: usize = arg_parser.value_of_t_or_exit("iterations");
    let workers: Option<usize> = arg_parser
        .is_present("workers")
        .then(|| arg_parser.value_of_t_or_exit("workers"));
    let output_dir: Option<&str> = arg_parser.value_of("output_dir");

    let inputs = Vec::from_iter(arg_parser.values_of("inputs").expect("value is required").map(PathBuf::from));
    let sources = Vec::from_iter(inputs.iter().map(|path| match format {
        Format::Text => Box::new(TextFileSource::<i64>::new(path)) as Box<dyn InputSource<i64>>,
        Format::Rmp => Box::new(RmpFileSource::<i64>::new(path)) as Box<dyn InputSource<i64>>,
    }));

    let mut sorter_builder = SampleSortBuilder::new()
        .with_partitions_number(partitions)
        .with_sample_size(sample_size)
        .with_seed(seed)
        .with_iterations(iterations)
        .with_merge_strategy(match merge {
            Merge::Kway => MergeStrategy::KWay,
            Merge::Concat => MergeStrategy::Concatenate,
        });
    if let Some(workers) = workers {
        sorter_builder = sorter_builder.with_threads_number(workers);
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let mut markers = TimingMarkers::new();
    let outcome = match sorter.run(group_sources(sources, partitions), &mut markers) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };

    LogReportSink.report(&outcome.summary, &outcome.reports);
    if let Some(report) = outcome.reports.last() {
        for (range, size) in report.shard_sizes.iter().enumerate() {
            log::info!(
                "shard {}: {} records ({})",
                range,
                size,
                ByteSize((size * mem::size_of::<i64>()) as u64)
            );
        }
    }

    if let Some(output_dir) = output_dir {
        if let Err(err) = save_shards(&outcome.output, Path::new(output_dir), format) {
            log::error!("data saving error: {}", err);
            process::exit(1);
        }
    }
}

fn save_shards(output: &SortOutput<i64>, output_dir: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;

    for range in 0..output.len() {
        let shard = output.shard(range)?;
        let path = output_dir.join(format!("shard-{}.{}", range, format.extension()));
        match format {
            Format::Text => write_text_file(&path, shard.iter())?,
            Format::Rmp => write_rmp_file(&path, shard.iter())?,
        }
        log::debug!("shard {} saved to {}", range, path.display());
    }

    return Ok(());
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum Format {
    Text,
    Rmp,
}

impl Format {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Format::value_variants().iter().filter_map(|v| v.to_possible_value())
    }

    fn extension(&self) -> &'static str {
        match self {
            Format::Text => "txt",
            Format::Rmp => "rmp",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Format as clap::ArgEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum Merge {
    Kway,
    Concat,
}

impl Merge {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Merge::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Merge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Merge as clap::ArgEnum>::from_str(s, false)
    }
}

fn positive_number(v: &str) -> Result<(), String> {
    match v.parse::<usize>() {
        Ok(0) => Err("value must be positive".to_string()),
        Ok(_) => Ok(()),
        Err(err) => Err(format!("number format incorrect: {}", err)),
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("sample-sort")
        .about("distributed sample sort")
        .arg(
            clap::Arg::new("inputs")
                .help("files to be sorted, grouped into partitions in the given order")
                .required(true)
                .takes_value(true)
                .multiple_values(true),
        )
        .arg(
            clap::Arg::new("partitions")
                .short('p')
                .long("partitions")
                .help("number of partitions (and output shards)")
                .required(true)
                .takes_value(true)
                .validator(positive_number),
        )
        .arg(
            clap::Arg::new("workers")
                .short('w')
                .long("workers")
                .help("number of worker threads")
                .takes_value(true)
                .validator(positive_number),
        )
        .arg(
            clap::Arg::new("sample_size")
                .short('n')
                .long("sample-size")
                .help("number of records sampled from every partition")
                .takes_value(true)
                .default_value("1000")
                .validator(positive_number),
        )
        .arg(
            clap::Arg::new("seed")
                .short('s')
                .long("seed")
                .help("base sampling seed")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            clap::Arg::new("iterations")
                .short('r')
                .long("iterations")
                .help("number of measured sorting iterations")
                .takes_value(true)
                .default_value("1")
                .validator(positive_number),
        )
        .arg(
            clap::Arg::new("format")
                .short('f')
                .long("format")
                .help("input and output file format")
                .takes_value(true)
                .default_value("text")
                .possible_values(Format::possible_values()),
        )
        .arg(
            clap::Arg::new("merge")
                .short('m')
                .long("merge")
                .help("shard merge algorithm")
                .takes_value(true)
                .default_value("kway")
                .possible_values(Merge::possible_values()),
        )
        .arg(
            clap::Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .help("directory sorted shards are saved to")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
