//! Run formation.

use log;

use crate::buffer::LimitedBuffer;
use crate::run::{Run, RunStore};
use crate::sort::SortError;
use crate::tape::Tape;

/// Splits the input tape into sorted runs of at most `memory_limit` values each.
/// Returns run handles in creation order. An empty input produces no runs.
///
/// Runs created before a failure stay in the store, they are removed by [`RunStore::clear`].
pub fn build_runs<I, S>(mut input: I, store: &mut S, memory_limit: usize) -> Result<Vec<Run>, SortError>
where
    I: Tape,
    S: RunStore,
{
    if memory_limit == 0 {
        return Err(SortError::InvalidMemoryLimit);
    }

    let mut buffer = LimitedBuffer::new(memory_limit);
    let mut runs = Vec::new();

    while let Some(value) = input.read().map_err(SortError::Input)? {
        buffer.push(value);

        if buffer.is_full() {
            runs.push(flush(&mut buffer, store)?);
        }
    }

    if !buffer.is_empty() {
        runs.push(flush(&mut buffer, store)?);
    }

    log::debug!("run formation done ({} runs)", runs.len());

    return Ok(runs);
}

fn flush<S: RunStore>(buffer: &mut LimitedBuffer, store: &mut S) -> Result<Run, SortError> {
    buffer.sort();
    store.create(buffer.drain()).map_err(SortError::RunStore)
}
