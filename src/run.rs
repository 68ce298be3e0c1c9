//! Sorted runs and their storage.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::vec;

use log;
use tempfile;

use crate::tape::Value;

/// Run storage error.
#[derive(Debug)]
pub enum RunError {
    /// Common I/O error.
    IO(io::Error),
    /// Data serialization error.
    SerializationError(rmp_serde::encode::Error),
    /// Data deserialization error.
    DeserializationError(rmp_serde::decode::Error),
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            RunError::IO(err) => err,
            RunError::SerializationError(err) => err,
            RunError::DeserializationError(err) => err,
        })
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RunError::IO(err) => write!(f, "run I/O operation failed: {}", err),
            RunError::SerializationError(err) => write!(f, "run serialization error: {}", err),
            RunError::DeserializationError(err) => write!(f, "run deserialization error: {}", err),
        }
    }
}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        RunError::IO(err)
    }
}

/// Handle of a sorted run kept by a [`RunStore`].
///
/// Handles are not cloneable: a run is deleted by passing its handle to [`RunStore::delete`].
#[derive(Debug, PartialEq, Eq)]
pub struct Run {
    id: usize,
    len: u64,
}

impl Run {
    /// Store assigned run identifier. Identifiers grow monotonically in creation order.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of values in the run.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Checks if the run holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Run storage interface. Provides methods for creating, reading and deleting sorted runs.
pub trait RunStore {
    type Reader: Iterator<Item = Result<Value, RunError>>;

    /// Persists already sorted values as a new run.
    fn create<I>(&mut self, items: I) -> Result<Run, RunError>
    where
        I: IntoIterator<Item = Value>;

    /// Opens a run for sequential reading.
    fn open(&self, run: &Run) -> Result<Self::Reader, RunError>;

    /// Deletes a run.
    fn delete(&mut self, run: Run) -> Result<(), RunError>;

    /// Deletes all runs still kept by the store.
    /// Every run is attempted, the first failure is returned.
    fn clear(&mut self) -> Result<(), RunError>;

    /// Returns number of runs kept by the store.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run file format. Provides methods for dumping values to a run file and reading them back.
pub trait RunFormat {
    type Reader: Iterator<Item = Result<Value, RunError>>;

    /// Dumps values to a run file.
    fn dump(
        writer: &mut io::BufWriter<fs::File>,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<(), RunError>;

    /// Creates a run reader.
    fn reader(reader: io::Take<io::BufReader<fs::File>>) -> Self::Reader;
}

/// Raw run format: fixed-width native-endian integers without any header.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFormat;

pub struct RawRunReader {
    reader: io::Take<io::BufReader<fs::File>>,
}

impl RunFormat for RawFormat {
    type Reader = RawRunReader;

    fn dump(
        writer: &mut io::BufWriter<fs::File>,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<(), RunError> {
        for item in items.into_iter() {
            writer.write_all(&item.to_ne_bytes())?;
        }

        return Ok(());
    }

    fn reader(reader: io::Take<io::BufReader<fs::File>>) -> Self::Reader {
        RawRunReader { reader }
    }
}

impl Iterator for RawRunReader {
    type Item = Result<Value, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.limit() == 0 {
            return None;
        }

        let mut bytes = [0u8; std::mem::size_of::<Value>()];
        return match self.reader.read_exact(&mut bytes) {
            Ok(()) => Some(Ok(Value::from_ne_bytes(bytes))),
            Err(err) => Some(Err(RunError::IO(err))),
        };
    }
}

/// RMP (Rust MessagePack) run format.
/// For more information see https://msgpack.org/.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmpFormat;

pub struct RmpRunReader {
    reader: io::Take<io::BufReader<fs::File>>,
}

impl RunFormat for RmpFormat {
    type Reader = RmpRunReader;

    fn dump(
        mut writer: &mut io::BufWriter<fs::File>,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<(), RunError> {
        for item in items.into_iter() {
            rmp_serde::encode::write(&mut writer, &item).map_err(RunError::SerializationError)?;
        }

        return Ok(());
    }

    fn reader(reader: io::Take<io::BufReader<fs::File>>) -> Self::Reader {
        RmpRunReader { reader }
    }
}

impl Iterator for RmpRunReader {
    type Item = Result<Value, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.limit() == 0 {
            None
        } else {
            match rmp_serde::decode::from_read(&mut self.reader) {
                Ok(result) => Some(Ok(result)),
                Err(err) => Some(Err(RunError::DeserializationError(err))),
            }
        }
    }
}

/// File system run store. Every run is a separate file in a private temporary directory,
/// the directory is removed when the store is dropped.
pub struct FileRunStore<F: RunFormat = RawFormat> {
    /// Directory to be used to store run files.
    tmp_dir: tempfile::TempDir,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Identifier of the next created run.
    next_id: usize,
    /// Paths of runs not deleted yet.
    runs: BTreeMap<usize, PathBuf>,

    /// Run format type.
    format_type: PhantomData<F>,
}

impl<F: RunFormat> FileRunStore<F> {
    /// Creates a new run store.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory the store directory is created in. If parameter is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - Run files read/write buffer size.
    pub fn new(tmp_path: Option<&Path>, rw_buf_size: Option<usize>) -> Result<Self, io::Error> {
        let tmp_dir = if let Some(tmp_path) = tmp_path {
            tempfile::Builder::new().prefix("tape-sort").tempdir_in(tmp_path)
        } else {
            tempfile::Builder::new().prefix("tape-sort").tempdir()
        }?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(FileRunStore {
            tmp_dir,
            rw_buf_size,
            next_id: 0,
            runs: BTreeMap::new(),
            format_type: PhantomData,
        });
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        self.tmp_dir.path()
    }

    /// Returns the file a run is stored in.
    pub fn run_path(&self, run: &Run) -> Option<&Path> {
        self.runs.get(&run.id).map(PathBuf::as_path)
    }

    fn lookup(&self, id: usize) -> Result<&Path, RunError> {
        match self.runs.get(&id) {
            Some(path) => Ok(path.as_path()),
            None => Err(RunError::IO(io::Error::new(
                io::ErrorKind::NotFound,
                format!("run {} is not kept by the store", id),
            ))),
        }
    }
}

impl<F: RunFormat> RunStore for FileRunStore<F> {
    type Reader = F::Reader;

    fn create<I>(&mut self, items: I) -> Result<Run, RunError>
    where
        I: IntoIterator<Item = Value>,
    {
        let id = self.next_id;
        self.next_id += 1;

        let path = self.tmp_dir.path().join(format!("run_{}.dat", id));
        let run_file = fs::File::create(&path)?;
        // registered before writing so that a partially written run is cleaned up too
        self.runs.insert(id, path);

        let mut run_writer = match self.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, run_file),
            None => io::BufWriter::new(run_file),
        };

        let mut len = 0;
        F::dump(&mut run_writer, items.into_iter().inspect(|_| len += 1))?;
        run_writer.flush()?;

        log::debug!("run {} saved ({} values)", id, len);

        return Ok(Run { id, len });
    }

    fn open(&self, run: &Run) -> Result<Self::Reader, RunError> {
        let run_file = fs::File::open(self.lookup(run.id)?)?;
        let file_len = run_file.metadata()?.len();

        let run_reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, run_file),
            None => io::BufReader::new(run_file),
        };

        return Ok(F::reader(run_reader.take(file_len)));
    }

    fn delete(&mut self, run: Run) -> Result<(), RunError> {
        fs::remove_file(self.lookup(run.id)?)?;
        self.runs.remove(&run.id);
        log::debug!("run {} deleted", run.id);

        return Ok(());
    }

    fn clear(&mut self) -> Result<(), RunError> {
        let mut result = Ok(());

        let runs = std::mem::take(&mut self.runs);
        for (id, path) in runs.into_iter() {
            match fs::remove_file(&path) {
                Ok(()) => log::debug!("run {} deleted", id),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    log::warn!("run file {} not deleted: {}", path.display(), err);
                    self.runs.insert(id, path);
                    if result.is_ok() {
                        result = Err(RunError::IO(err));
                    }
                }
            }
        }

        return result;
    }

    fn len(&self) -> usize {
        self.runs.len()
    }
}

/// In-memory run store.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    next_id: usize,
    runs: BTreeMap<usize, Vec<Value>>,
}

pub struct MemoryRunReader {
    inner: vec::IntoIter<Value>,
}

impl Iterator for MemoryRunReader {
    type Item = Result<Value, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Ok)
    }
}

impl MemoryRunStore {
    pub fn new() -> Self {
        MemoryRunStore::default()
    }
}

impl RunStore for MemoryRunStore {
    type Reader = MemoryRunReader;

    fn create<I>(&mut self, items: I) -> Result<Run, RunError>
    where
        I: IntoIterator<Item = Value>,
    {
        let id = self.next_id;
        self.next_id += 1;

        let values = Vec::from_iter(items);
        let len = values.len() as u64;
        self.runs.insert(id, values);

        return Ok(Run { id, len });
    }

    fn open(&self, run: &Run) -> Result<Self::Reader, RunError> {
        match self.runs.get(&run.id) {
            Some(values) => Ok(MemoryRunReader {
                inner: values.clone().into_iter(),
            }),
            None => Err(RunError::IO(io::Error::new(
                io::ErrorKind::NotFound,
                format!("run {} is not kept by the store", run.id),
            ))),
        }
    }

    fn delete(&mut self, run: Run) -> Result<(), RunError> {
        self.runs.remove(&run.id);
        return Ok(());
    }

    fn clear(&mut self) -> Result<(), RunError> {
        self.runs.clear();
        return Ok(());
    }

    fn len(&self) -> usize {
        self.runs.len()
    }
}
