//! Tape sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::marker::PhantomData;
use std::path::Path;

use crate::builder::build_runs;
use crate::merger::merge;
use crate::run::{FileRunStore, RawFormat, RunError, RunFormat, RunStore};
use crate::tape::{Tape, TapeError};

/// Default memory limit in values.
pub const DEFAULT_MEMORY_LIMIT: usize = 100;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Memory limit must allow at least one value.
    InvalidMemoryLimit,
    /// Temporary directory creation error.
    TempDir(io::Error),
    /// Input tape error.
    Input(TapeError),
    /// Output tape error.
    Output(TapeError),
    /// Run storage error.
    RunStore(RunError),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::InvalidMemoryLimit => None,
            SortError::TempDir(err) => Some(err),
            SortError::Input(err) => Some(err),
            SortError::Output(err) => Some(err),
            SortError::RunStore(err) => Some(err),
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::InvalidMemoryLimit => write!(f, "memory limit must be at least one value"),
            SortError::TempDir(err) => write!(f, "temporary directory not created: {}", err),
            SortError::Input(err) => write!(f, "input tape error: {}", err),
            SortError::Output(err) => write!(f, "output tape error: {}", err),
            SortError::RunStore(err) => write!(f, "run storage error: {}", err),
        }
    }
}

/// Sorting result summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of values written to the output tape.
    pub values: u64,
    /// Number of runs the input was split into.
    pub runs: usize,
}

/// Tape sorter builder. Provides methods for [`TapeSorter`] initialization.
#[derive(Clone)]
pub struct TapeSorterBuilder<F = RawFormat>
where
    F: RunFormat,
{
    /// Maximum number of values kept in memory during run formation.
    memory_limit: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,

    /// Run format type.
    format_type: PhantomData<F>,
}

impl<F: RunFormat> TapeSorterBuilder<F> {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        TapeSorterBuilder::default()
    }

    /// Builds a [`TapeSorter`] instance using provided configuration.
    pub fn build(self) -> Result<TapeSorter<FileRunStore<F>>, SortError> {
        if self.memory_limit == 0 {
            return Err(SortError::InvalidMemoryLimit);
        }

        let store = FileRunStore::new(self.tmp_dir.as_deref(), self.rw_buf_size).map_err(SortError::TempDir)?;

        return Ok(TapeSorter::with_store(store, self.memory_limit));
    }

    /// Sets maximum number of values kept in memory.
    pub fn with_memory_limit(mut self, memory_limit: usize) -> TapeSorterBuilder<F> {
        self.memory_limit = memory_limit;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> TapeSorterBuilder<F> {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> TapeSorterBuilder<F> {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sets run file format.
    pub fn with_format<G: RunFormat>(self) -> TapeSorterBuilder<G> {
        TapeSorterBuilder {
            memory_limit: self.memory_limit,
            tmp_dir: self.tmp_dir,
            rw_buf_size: self.rw_buf_size,
            format_type: PhantomData,
        }
    }
}

impl<F: RunFormat> Default for TapeSorterBuilder<F> {
    fn default() -> Self {
        TapeSorterBuilder {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            tmp_dir: None,
            rw_buf_size: None,
            format_type: PhantomData,
        }
    }
}

/// Tape sorter.
pub struct TapeSorter<S: RunStore> {
    /// Storage of intermediate runs.
    store: S,
    /// Maximum number of values kept in memory during run formation.
    memory_limit: usize,
}

impl<S: RunStore> TapeSorter<S> {
    /// Creates a sorter using the provided run store.
    pub fn with_store(store: S, memory_limit: usize) -> Self {
        TapeSorter { store, memory_limit }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    /// Sorts values of the input tape in ascending order writing them to the output tape.
    /// The input tape is rewound afterwards. Runs are removed from the store whatever the outcome is.
    ///
    /// # Arguments
    /// * `input` - Tape data to be fetched from
    /// * `output` - Tape sorted data to be written to
    pub fn sort<I, O>(&mut self, mut input: I, output: O) -> Result<SortSummary, SortError>
    where
        I: Tape,
        O: Tape,
    {
        let result = self.sort_runs(&mut input, output);

        if let Err(err) = self.store.clear() {
            log::warn!("temporary runs cleanup failed: {}", err);
        }

        let rewound = input.rewind().map_err(SortError::Input);

        let summary = result?;
        rewound?;

        log::info!("sorting done ({} values, {} runs)", summary.values, summary.runs);

        return Ok(summary);
    }

    fn sort_runs<I, O>(&mut self, input: I, output: O) -> Result<SortSummary, SortError>
    where
        I: Tape,
        O: Tape,
    {
        log::debug!("building runs (memory limit: {}) ...", self.memory_limit);
        let runs = build_runs(input, &mut self.store, self.memory_limit)?;
        let runs_number = runs.len();

        let values = merge(runs, &mut self.store, output)?;

        return Ok(SortSummary {
            values,
            runs: runs_number,
        });
    }
}
