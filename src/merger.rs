//! Binary heap merger.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::error::Error;
use std::marker::PhantomData;

use log;

use crate::run::{Run, RunError, RunStore};
use crate::sort::SortError;
use crate::tape::Tape;

/// Binary heap merger implementation.
/// Merges multiple sorted inputs into a single sorted output.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number of items,
/// *n* is the number of runs (inputs). At most one pending item per input is kept in memory.
pub struct RunMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: Iterator<Item = Result<T, E>>,
{
    // binary heap is max-heap by default so we reverse it to convert it to min-heap
    items: BinaryHeap<Reverse<(T, usize)>>,
    // an input is released as soon as it is exhausted
    runs: Vec<Option<C>>,
    initiated: bool,
    failed: bool,

    /// Input error type.
    error_type: PhantomData<E>,
}

impl<T, E, C> RunMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: Iterator<Item = Result<T, E>>,
{
    /// Creates an instance of a binary heap merger using runs as inputs.
    /// Run items should be sorted in ascending order otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `runs` - Runs to be merged in a single sorted one
    pub fn new<I>(runs: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let runs = Vec::from_iter(runs.into_iter().map(Some));
        let items = BinaryHeap::with_capacity(runs.len());

        return RunMerger {
            runs,
            items,
            initiated: false,
            failed: false,
            error_type: PhantomData,
        };
    }

    /// Returns number of inputs not exhausted yet.
    pub fn active(&self) -> usize {
        self.runs.iter().filter(|run| run.is_some()).count()
    }

    /// Reads the next pending item of an input. An exhausted input is released.
    fn refill(&mut self, idx: usize) -> Result<(), E> {
        let next = match self.runs[idx].as_mut() {
            Some(run) => run.next(),
            None => return Ok(()),
        };

        match next {
            Some(Ok(item)) => self.items.push(Reverse((item, idx))),
            Some(Err(err)) => return Err(err),
            None => self.runs[idx] = None,
        }

        return Ok(());
    }
}

impl<T, E, C> Iterator for RunMerger<T, E, C>
where
    T: Ord,
    E: Error,
    C: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    /// Returns the next item from the inputs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if !self.initiated {
            self.initiated = true;
            for idx in 0..self.runs.len() {
                if let Err(err) = self.refill(idx) {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }

        let Reverse((result, idx)) = self.items.pop()?;
        if let Err(err) = self.refill(idx) {
            self.failed = true;
            return Some(Err(err));
        }

        return Some(Ok(result));
    }
}

/// Merges sorted runs into the output tape, then deletes the runs from the store.
/// Runs are deleted whether the merge succeeds or not.
/// Returns the number of values written.
pub fn merge<S, O>(runs: Vec<Run>, store: &mut S, mut output: O) -> Result<u64, SortError>
where
    S: RunStore,
    O: Tape,
{
    log::debug!("merging {} runs ...", runs.len());

    let result = merge_into(&runs, store, &mut output);

    let mut cleanup = Ok(());
    for run in runs.into_iter() {
        let id = run.id();
        if let Err(err) = store.delete(run) {
            log::warn!("run {} not deleted: {}", id, err);
            if cleanup.is_ok() {
                cleanup = Err(SortError::RunStore(err));
            }
        }
    }

    let written = result?;
    cleanup?;

    log::debug!("merge done ({} values)", written);

    return Ok(written);
}

fn merge_into<S, O>(runs: &[Run], store: &S, output: &mut O) -> Result<u64, SortError>
where
    S: RunStore,
    O: Tape,
{
    let readers: Result<Vec<S::Reader>, RunError> = runs.iter().map(|run| store.open(run)).collect();
    let merger = RunMerger::new(readers.map_err(SortError::RunStore)?);

    let mut written = 0;
    for value in merger {
        let value = value.map_err(SortError::RunStore)?;
        output.write(value).map_err(SortError::Output)?;
        written += 1;
    }
    output.flush().map_err(SortError::Output)?;

    return Ok(written);
}

#[cfg(test)]
mod test {
    use rstest::*;
    use std::error::Error;
    use std::io::{self, ErrorKind};

    use super::{merge, RunMerger};
    use crate::run::{MemoryRunReader, MemoryRunStore, Run, RunError, RunStore};
    use crate::tape::{MemoryTape, Tape, TapeError};
    use crate::SortError;

    #[rstest]
    #[case(
        vec![],
        vec![],
    )]
    #[case(
        vec![
            vec![],
            vec![]
        ],
        vec![],
    )]
    #[case(
        vec![
            vec![Ok(4), Ok(5), Ok(7)],
            vec![Ok(1), Ok(6)],
            vec![Ok(3)],
            vec![],
        ],
        vec![Ok(1), Ok(3), Ok(4), Ok(5), Ok(6), Ok(7)],
    )]
    #[case(
        vec![
            vec![Ok(0), Ok(0), Ok(2)],
            vec![Ok(-1), Ok(0)],
        ],
        vec![Ok(-1), Ok(0), Ok(0), Ok(0), Ok(2)],
    )]
    #[case(
        vec![
            vec![Result::Err(io::Error::new(ErrorKind::Other, "test error"))]
        ],
        vec![
            Result::Err(io::Error::new(ErrorKind::Other, "test error"))
        ],
    )]
    #[case(
        vec![
            vec![Ok(3), Result::Err(io::Error::new(ErrorKind::Other, "test error")), Ok(4)],
            vec![Ok(1), Ok(2)],
        ],
        vec![
            Ok(1),
            Ok(2),
            Result::Err(io::Error::new(ErrorKind::Other, "test error")),
        ],
    )]
    fn test_merger(
        #[case] runs: Vec<Vec<Result<i32, io::Error>>>,
        #[case] expected_result: Vec<Result<i32, io::Error>>,
    ) {
        let merger = RunMerger::new(runs.into_iter().map(|run| run.into_iter()));
        let actual_result: Vec<_> = merger.collect();
        assert!(
            compare_vectors_of_result::<_, io::Error>(&actual_result, &expected_result),
            "actual={:?}, expected={:?}",
            actual_result,
            expected_result
        );
    }

    #[test]
    fn test_merger_releases_exhausted_runs() {
        let runs: Vec<Vec<Result<i32, io::Error>>> = vec![vec![Ok(1)], vec![Ok(2), Ok(3)], vec![]];
        let mut merger = RunMerger::new(runs.into_iter().map(|run| run.into_iter()));
        assert_eq!(merger.active(), 3);

        assert_eq!(merger.next().unwrap().unwrap(), 1);
        // the empty run and the first one are both exhausted by now
        assert_eq!(merger.active(), 1);

        assert_eq!(merger.next().unwrap().unwrap(), 2);
        assert_eq!(merger.next().unwrap().unwrap(), 3);
        assert_eq!(merger.active(), 0);
        assert!(merger.next().is_none());
    }

    #[test]
    fn test_merge_deletes_runs() {
        let mut store = MemoryRunStore::new();
        let runs = vec![
            store.create(vec![3, 5, 8]).unwrap(),
            store.create(vec![1, 2, 9]).unwrap(),
            store.create(vec![7]).unwrap(),
        ];

        let mut output = MemoryTape::new();
        let written = merge(runs, &mut store, &mut output).unwrap();

        assert_eq!(written, 7);
        assert_eq!(output.values(), &[1, 2, 3, 5, 7, 8, 9]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_single_run_is_copy() {
        let mut store = MemoryRunStore::new();
        let runs = vec![store.create(vec![0, 1, 1, 4]).unwrap()];

        let mut output = MemoryTape::new();
        merge(runs, &mut store, &mut output).unwrap();

        assert_eq!(output.values(), &[0, 1, 1, 4]);
    }

    #[test]
    fn test_merge_output_failure() {
        struct BrokenTape;

        impl Tape for BrokenTape {
            fn read(&mut self) -> Result<Option<i32>, TapeError> {
                Ok(None)
            }

            fn write(&mut self, _value: i32) -> Result<(), TapeError> {
                Err(TapeError::Write(io::Error::new(ErrorKind::Other, "disk full")))
            }

            fn rewind(&mut self) -> Result<(), TapeError> {
                Ok(())
            }

            fn is_end(&mut self) -> Result<bool, TapeError> {
                Ok(true)
            }
        }

        let mut store = MemoryRunStore::new();
        let runs = vec![store.create(vec![1]).unwrap(), store.create(vec![2]).unwrap()];

        let result = merge(runs, &mut store, BrokenTape);

        assert!(matches!(result, Err(SortError::Output(TapeError::Write(_)))));
        assert!(store.is_empty());
    }

    /// Memory store whose run reads and deletions can be made to fail.
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryRunStore,
        fail_read: bool,
        fail_delete: bool,
    }

    struct FailingReader {
        inner: MemoryRunReader,
        fail: bool,
    }

    impl Iterator for FailingReader {
        type Item = Result<i32, RunError>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.fail {
                return Some(Err(RunError::IO(io::Error::new(ErrorKind::Other, "bad sector"))));
            }
            self.inner.next()
        }
    }

    impl RunStore for FailingStore {
        type Reader = FailingReader;

        fn create<I>(&mut self, items: I) -> Result<Run, RunError>
        where
            I: IntoIterator<Item = i32>,
        {
            self.inner.create(items)
        }

        fn open(&self, run: &Run) -> Result<Self::Reader, RunError> {
            Ok(FailingReader {
                inner: self.inner.open(run)?,
                fail: self.fail_read,
            })
        }

        fn delete(&mut self, run: Run) -> Result<(), RunError> {
            if self.fail_delete {
                return Err(RunError::IO(io::Error::new(ErrorKind::Other, "run locked")));
            }
            self.inner.delete(run)
        }

        fn clear(&mut self) -> Result<(), RunError> {
            self.inner.clear()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_merge_read_failure_deletes_runs() {
        let mut store = FailingStore {
            fail_read: true,
            ..FailingStore::default()
        };
        let runs = vec![store.create(vec![1, 3]).unwrap(), store.create(vec![2]).unwrap()];

        let mut output = MemoryTape::new();
        let result = merge(runs, &mut store, &mut output);

        match result {
            Err(SortError::RunStore(err)) => assert!(err.to_string().contains("bad sector"), "{}", err),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(output.values().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_delete_failure_reported() {
        let mut store = FailingStore {
            fail_delete: true,
            ..FailingStore::default()
        };
        let runs = vec![store.create(vec![2, 4]).unwrap(), store.create(vec![1]).unwrap()];

        let mut output = MemoryTape::new();
        let result = merge(runs, &mut store, &mut output);

        match result {
            Err(SortError::RunStore(err)) => assert!(err.to_string().contains("run locked"), "{}", err),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(output.values(), &[1, 2, 4]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_merge_failure_wins_over_delete_failure() {
        let mut store = FailingStore {
            fail_read: true,
            fail_delete: true,
            ..FailingStore::default()
        };
        let runs = vec![store.create(vec![1]).unwrap()];

        let result = merge(runs, &mut store, MemoryTape::new());

        match result {
            Err(SortError::RunStore(err)) => assert!(err.to_string().contains("bad sector"), "{}", err),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    fn compare_vectors_of_result<T: PartialEq, E: Error + 'static>(
        actual: &Vec<Result<T, E>>,
        expected: &Vec<Result<T, E>>,
    ) -> bool {
        actual.len() == expected.len()
            && actual
                .into_iter()
                .zip(expected)
                .all(
                    |(actual_result, expected_result)| match (actual_result, expected_result) {
                        (Ok(actual_result), Ok(expected_result)) if actual_result == expected_result => true,
                        (Err(actual_err), Err(expected_err)) => actual_err.to_string() == expected_err.to_string(),
                        _ => false,
                    },
                )
    }
}
