use std::fs;
use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use tape_sort::{FileTape, LatencyConfig, LatentTape, RawFormat, RmpFormat, RunFormat, SortSummary, TapeSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let format: Format = arg_parser.value_of_t_or_exit("format");
    let memory_limit: usize = arg_parser.value_of_t_or_exit("memory_limit");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let rw_buf_size: Option<usize> = arg_parser.value_of("rw_buf_size").map(|v| {
        v.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize
    });

    let config_path = arg_parser.value_of("config").expect("value has default");
    let config = LatencyConfig::load(path::Path::new(config_path));
    log::info!(
        "tape latency: read {:?}, write {:?}",
        config.read_delay,
        config.write_delay
    );

    let input = arg_parser.value_of("input").expect("value is required");
    let output = arg_parser.value_of("output").expect("value is required");
    if is_same_file(path::Path::new(input), path::Path::new(output)) {
        log::error!("input and output must be different files: {}", input);
        process::exit(1);
    }

    let mut sorter_builder = TapeSorterBuilder::<RawFormat>::new().with_memory_limit(memory_limit);
    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(rw_buf_size) = rw_buf_size {
        sorter_builder = sorter_builder.with_rw_buf_size(rw_buf_size);
    }

    let summary = match format {
        Format::Raw => sort(sorter_builder, input, output, config),
        Format::Rmp => sort(sorter_builder.with_format::<RmpFormat>(), input, output, config),
    };
    log::debug!("{} values sorted using {} runs", summary.values, summary.runs);

    println!("Sort is finished. Result in file: {}", output);
}

/// Sorts the input file into the output file. The output file is only created once the sorter is ready.
fn sort<F: RunFormat>(
    sorter_builder: TapeSorterBuilder<F>,
    input: &str,
    output: &str,
    config: LatencyConfig,
) -> SortSummary {
    let mut sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let input_tape = match FileTape::open(input) {
        Ok(tape) => LatentTape::new(tape, config),
        Err(err) => {
            log::error!("input tape opening error: {}", err);
            process::exit(1);
        }
    };

    let output_tape = match FileTape::create(output) {
        Ok(tape) => LatentTape::new(tape, config),
        Err(err) => {
            log::error!("output tape creation error: {}", err);
            process::exit(1);
        }
    };

    match sorter.sort(input_tape, output_tape) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    }
}

/// Checks if both paths point to the same existing file.
fn is_same_file(first: &path::Path, second: &path::Path) -> bool {
    match (fs::canonicalize(first), fs::canonicalize(second)) {
        (Ok(first), Ok(second)) => first == second,
        _ => false,
    }
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
    Raw,
    Rmp,
}

impl Format {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Format::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Format as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("tape-sort")
        .about("external sorter for sequential-access tapes")
        .arg(
            clap::Arg::new("input")
                .help("tape file to be sorted")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("output")
                .help("result tape file")
                .required(true)
                .index(2),
        )
        .arg(
            clap::Arg::new("memory_limit")
                .short('m')
                .long("memory-limit")
                .help("maximum number of values kept in memory")
                .takes_value(true)
                .default_value("100")
                .validator(|v| match v.parse::<usize>() {
                    Ok(0) => Err(String::from("Memory limit must be at least 1")),
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Memory limit format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("tape latency configuration file")
                .takes_value(true)
                .default_value("config.txt"),
        )
        .arg(
            clap::Arg::new("format")
                .short('f')
                .long("format")
                .help("temporary run file format")
                .takes_value(true)
                .default_value("raw")
                .possible_values(Format::possible_values()),
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
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("run file read/write buffer size")
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Buffer size format incorrect: {}", err)),
                }),
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
