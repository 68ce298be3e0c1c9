//! Sequential storage capability.
//!
//! A tape only supports forward reads, forward writes, rewinding to the start and end-of-data detection.
//! The sorter is written against the [`Tape`] trait, concrete devices are supplied by the caller.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;

/// Value stored on a tape.
pub type Value = i32;

/// Tape operation error.
#[derive(Debug)]
pub enum TapeError {
    /// Backing device can not be opened or accessed.
    Unavailable(io::Error),
    /// Value could not be recorded.
    Write(io::Error),
    /// Stored data is not a valid value.
    Malformed(String),
    /// Operation is not supported by the tape in its current mode.
    Unsupported(&'static str),
}

impl Error for TapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            TapeError::Unavailable(err) => Some(err),
            TapeError::Write(err) => Some(err),
            TapeError::Malformed(_) => None,
            TapeError::Unsupported(_) => None,
        }
    }
}

impl Display for TapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            TapeError::Unavailable(err) => write!(f, "tape device unavailable: {}", err),
            TapeError::Write(err) => write!(f, "tape write failed: {}", err),
            TapeError::Malformed(token) => write!(f, "malformed value on tape: {:?}", token),
            TapeError::Unsupported(op) => write!(f, "operation not supported: {}", op),
        }
    }
}

/// Sequential-access storage device.
pub trait Tape {
    /// Reads the next value advancing the tape position.
    /// Returns `Ok(None)` when the end of data is reached.
    fn read(&mut self) -> Result<Option<Value>, TapeError>;

    /// Writes a value at the current position advancing it.
    fn write(&mut self, value: Value) -> Result<(), TapeError>;

    /// Resets the read position to the start of the tape.
    fn rewind(&mut self) -> Result<(), TapeError>;

    /// Checks if no further reads will succeed.
    fn is_end(&mut self) -> Result<bool, TapeError>;

    /// Flushes buffered writes to the device.
    fn flush(&mut self) -> Result<(), TapeError> {
        Ok(())
    }
}

impl<T: Tape + ?Sized> Tape for &mut T {
    fn read(&mut self) -> Result<Option<Value>, TapeError> {
        (**self).read()
    }

    fn write(&mut self, value: Value) -> Result<(), TapeError> {
        (**self).write(value)
    }

    fn rewind(&mut self) -> Result<(), TapeError> {
        (**self).rewind()
    }

    fn is_end(&mut self) -> Result<bool, TapeError> {
        (**self).is_end()
    }

    fn flush(&mut self) -> Result<(), TapeError> {
        (**self).flush()
    }
}

impl<T: Tape + ?Sized> Tape for Box<T> {
    fn read(&mut self) -> Result<Option<Value>, TapeError> {
        (**self).read()
    }

    fn write(&mut self, value: Value) -> Result<(), TapeError> {
        (**self).write(value)
    }

    fn rewind(&mut self) -> Result<(), TapeError> {
        (**self).rewind()
    }

    fn is_end(&mut self) -> Result<bool, TapeError> {
        (**self).is_end()
    }

    fn flush(&mut self) -> Result<(), TapeError> {
        (**self).flush()
    }
}

/// In-memory tape. Writes are appended to the end, reads start from the beginning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTape {
    values: Vec<Value>,
    position: usize,
}

impl MemoryTape {
    /// Creates an empty tape.
    pub fn new() -> Self {
        MemoryTape::default()
    }

    /// Returns recorded values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Consumes the tape, returning its values.
    pub fn into_inner(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for MemoryTape {
    fn from(values: Vec<Value>) -> Self {
        MemoryTape { values, position: 0 }
    }
}

impl FromIterator<Value> for MemoryTape {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        MemoryTape::from(Vec::from_iter(iter))
    }
}

impl Tape for MemoryTape {
    fn read(&mut self) -> Result<Option<Value>, TapeError> {
        let value = self.values.get(self.position).copied();
        if value.is_some() {
            self.position += 1;
        }

        return Ok(value);
    }

    fn write(&mut self, value: Value) -> Result<(), TapeError> {
        self.values.push(value);
        return Ok(());
    }

    fn rewind(&mut self) -> Result<(), TapeError> {
        self.position = 0;
        return Ok(());
    }

    fn is_end(&mut self) -> Result<bool, TapeError> {
        Ok(self.position >= self.values.len())
    }
}
