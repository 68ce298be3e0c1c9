//! `tape-sort` is an external sort implementation for sequential-access storage devices.
//!
//! A tape only supports forward reads, forward writes, rewinding and end-of-data detection, so the data being
//! sorted can neither be loaded into memory at once nor accessed randomly. Sorting is achieved in two passes.
//! During the first pass the input tape is split into runs of at most `memory_limit` values, each run is sorted
//! in memory and saved to temporary storage. During the second pass the runs are merged into the output tape
//! keeping only one pending value per run in memory. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! `tape-sort` supports the following features:
//!
//! * **Device agnostic:**
//!   the sorter works with any type implementing the [`Tape`] trait. File backed, in-memory and latency
//!   simulating tapes are provided.
//! * **Latency simulation:**
//!   per-operation read and write delays can be configured, the delay source is injectable so that the same
//!   code paths can be exercised without waiting in real time.
//! * **Storage agnostic:**
//!   runs are kept by a [`RunStore`], the default one keeps them in a temporary directory as raw native-endian
//!   integers, `MessagePack` encoding and an in-memory store are available as well.
//! * **Guaranteed cleanup:**
//!   temporary runs are removed whether sorting succeeds or fails.
//!
//! # Example
//!
//! ```no_run
//! use std::path;
//!
//! use tape_sort::{FileTape, LatencyConfig, LatentTape, TapeSorterBuilder};
//!
//! fn main() {
//!     let config = LatencyConfig::load(path::Path::new("config.txt"));
//!     let input = LatentTape::new(FileTape::open("input.txt").unwrap(), config);
//!     let output = LatentTape::new(FileTape::create("output.txt").unwrap(), config);
//!
//!     let mut sorter = TapeSorterBuilder::<tape_sort::RawFormat>::new()
//!         .with_memory_limit(1000)
//!         .with_tmp_dir(path::Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     sorter.sort(input, output).unwrap();
//! }
//! ```

pub mod buffer;
pub mod builder;
pub mod config;
pub mod device;
pub mod latency;
pub mod merger;
pub mod run;
pub mod sort;
pub mod tape;

pub use buffer::LimitedBuffer;
pub use builder::build_runs;
pub use config::LatencyConfig;
pub use device::FileTape;
pub use latency::{Clock, LatentTape, ManualClock, SystemClock};
pub use merger::{merge, RunMerger};
pub use run::{FileRunStore, MemoryRunStore, RawFormat, RmpFormat, Run, RunError, RunFormat, RunStore};
pub use sort::{SortError, SortSummary, TapeSorter, TapeSorterBuilder};
pub use tape::{MemoryTape, Tape, TapeError, Value};
