//! File backed tape.
//!
//! Values are stored as decimal text separated by whitespace. A tape is either opened for reading
//! or created for writing, never both.

use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use log;

use crate::tape::{Tape, TapeError, Value};

/// Length of the longest value text, `-2147483648`.
const MAX_TOKEN_LEN: usize = 11;

enum Mode {
    Read(io::BufReader<fs::File>),
    Write(io::BufWriter<fs::File>),
}

/// Text file tape.
pub struct FileTape {
    path: PathBuf,
    mode: Mode,
}

impl FileTape {
    /// Opens an existing file as a read-only tape.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TapeError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(TapeError::Unavailable)?;
        log::debug!("tape {} opened for reading", path.display());

        return Ok(FileTape {
            path: path.into(),
            mode: Mode::Read(io::BufReader::new(file)),
        });
    }

    /// Creates a write-only tape. Existing file content is truncated.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TapeError> {
        let path = path.as_ref();
        let file = fs::File::create(path).map_err(TapeError::Unavailable)?;
        log::debug!("tape {} created for writing", path.display());

        return Ok(FileTape {
            path: path.into(),
            mode: Mode::Write(io::BufWriter::new(file)),
        });
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Tape for FileTape {
    fn read(&mut self) -> Result<Option<Value>, TapeError> {
        let reader = match &mut self.mode {
            Mode::Read(reader) => reader,
            Mode::Write(_) => return Err(TapeError::Unsupported("read from a write-only tape")),
        };

        let (token, truncated) = match next_token(reader).map_err(TapeError::Unavailable)? {
            Some(token) => token,
            None => return Ok(None),
        };

        if truncated {
            return Err(TapeError::Malformed(format!("{}...", String::from_utf8_lossy(&token))));
        }

        return match std::str::from_utf8(&token).ok().and_then(|s| s.parse::<Value>().ok()) {
            Some(value) => Ok(Some(value)),
            None => Err(TapeError::Malformed(String::from_utf8_lossy(&token).into_owned())),
        };
    }

    fn write(&mut self, value: Value) -> Result<(), TapeError> {
        match &mut self.mode {
            Mode::Write(writer) => write!(writer, "{} ", value).map_err(TapeError::Write),
            Mode::Read(_) => Err(TapeError::Unsupported("write to a read-only tape")),
        }
    }

    fn rewind(&mut self) -> Result<(), TapeError> {
        match &mut self.mode {
            Mode::Read(reader) => reader.rewind().map_err(TapeError::Unavailable),
            Mode::Write(_) => Err(TapeError::Unsupported("rewind of a write-only tape")),
        }
    }

    fn is_end(&mut self) -> Result<bool, TapeError> {
        match &mut self.mode {
            Mode::Read(reader) => skip_whitespace(reader)
                .map(|has_more| !has_more)
                .map_err(TapeError::Unavailable),
            Mode::Write(_) => Ok(true),
        }
    }

    fn flush(&mut self) -> Result<(), TapeError> {
        match &mut self.mode {
            Mode::Write(writer) => writer.flush().map_err(TapeError::Write),
            Mode::Read(_) => Ok(()),
        }
    }
}

/// Skips leading whitespace. Returns `false` if the end of the file is reached.
fn skip_whitespace(reader: &mut impl BufRead) -> io::Result<bool> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }

        let skipped = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let exhausted = skipped == buf.len();
        reader.consume(skipped);

        if !exhausted {
            return Ok(true);
        }
    }
}

/// Reads the next whitespace delimited token.
/// At most [`MAX_TOKEN_LEN`] bytes are kept, the flag reports whether the token was longer.
/// The rest of an oversized token is skipped so that the next read starts after it.
fn next_token(reader: &mut impl BufRead) -> io::Result<Option<(Vec<u8>, bool)>> {
    if !skip_whitespace(reader)? {
        return Ok(None);
    }

    let mut token = Vec::with_capacity(MAX_TOKEN_LEN);
    let mut truncated = false;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        let len = buf.iter().position(|b| b.is_ascii_whitespace()).unwrap_or(buf.len());
        let room = MAX_TOKEN_LEN - token.len();
        if len > room {
            truncated = true;
        }
        token.extend_from_slice(&buf[..len.min(room)]);
        let complete = len < buf.len();
        reader.consume(len);

        if complete {
            break;
        }
    }

    return Ok(Some((token, truncated)));
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::FileTape;
    use crate::tape::{Tape, TapeError};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir_in("./").unwrap()
    }

    #[rstest]
    fn test_file_tape_read(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input.txt");
        fs::write(&path, "5 3\n-8\t0   1\n\n").unwrap();

        let mut tape = FileTape::open(&path).unwrap();
        let mut values = Vec::new();
        while let Some(value) = tape.read().unwrap() {
            values.push(value);
        }
        assert_eq!(values, vec![5, 3, -8, 0, 1]);
        assert_eq!(tape.is_end().unwrap(), true);

        tape.rewind().unwrap();
        assert_eq!(tape.is_end().unwrap(), false);
        assert_eq!(tape.read().unwrap(), Some(5));
    }

    #[rstest]
    fn test_file_tape_malformed(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input.txt");
        fs::write(&path, "1 two 3").unwrap();

        let mut tape = FileTape::open(&path).unwrap();
        assert_eq!(tape.read().unwrap(), Some(1));
        match tape.read() {
            Err(TapeError::Malformed(token)) => assert_eq!(token, "two"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[rstest]
    fn test_file_tape_oversized_token(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input.txt");
        let mut content = "1".repeat(1_000_000);
        content.push_str(" -2147483648 5");
        fs::write(&path, content).unwrap();

        let mut tape = FileTape::open(&path).unwrap();
        match tape.read() {
            Err(TapeError::Malformed(token)) => assert_eq!(token, "11111111111..."),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(tape.read().unwrap(), Some(i32::MIN));
        assert_eq!(tape.read().unwrap(), Some(5));
        assert_eq!(tape.read().unwrap(), None);
    }

    #[rstest]
    #[case("99999999999")]
    #[case("-9999999999")]
    fn test_file_tape_out_of_range(tmp_dir: tempfile::TempDir, #[case] content: &str) {
        let path = tmp_dir.path().join("input.txt");
        fs::write(&path, content).unwrap();

        let mut tape = FileTape::open(&path).unwrap();
        match tape.read() {
            Err(TapeError::Malformed(token)) => assert_eq!(token, content),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[rstest]
    fn test_file_tape_missing(tmp_dir: tempfile::TempDir) {
        let result = FileTape::open(tmp_dir.path().join("missing.txt"));
        assert!(matches!(result, Err(TapeError::Unavailable(_))));
    }

    #[rstest]
    fn test_file_tape_write_truncates(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("output.txt");
        fs::write(&path, "stale content").unwrap();

        let mut tape = FileTape::create(&path).unwrap();
        tape.write(1).unwrap();
        tape.write(-2).unwrap();
        tape.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1 -2 ");
    }

    #[rstest]
    fn test_file_tape_modes(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("tape.txt");

        let mut writer = FileTape::create(&path).unwrap();
        assert!(matches!(writer.read(), Err(TapeError::Unsupported(_))));
        assert!(matches!(writer.rewind(), Err(TapeError::Unsupported(_))));
        drop(writer);

        let mut reader = FileTape::open(&path).unwrap();
        assert!(matches!(reader.write(1), Err(TapeError::Unsupported(_))));
        assert_eq!(reader.read().unwrap(), None);
    }
}
