//! Limited buffer implementation.

use std::vec;

use crate::tape::Value;

/// Buffer limited by elements count.
pub struct LimitedBuffer {
    limit: usize,
    inner: Vec<Value>,
}

impl LimitedBuffer {
    /// Creates an empty buffer that grows on demand.
    pub fn new(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::new(),
        }
    }

    /// Creates a buffer with memory for `limit` values allocated upfront.
    pub fn with_capacity(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }

    /// Adds a new value to the buffer.
    pub fn push(&mut self, value: Value) {
        debug_assert!(!self.is_full(), "buffer limit exceeded");
        self.inner.push(value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    /// Sorts buffered values in ascending order.
    pub fn sort(&mut self) {
        self.inner.sort_unstable();
    }

    /// Removes all values from the buffer keeping the allocated memory.
    pub fn drain(&mut self) -> vec::Drain<'_, Value> {
        self.inner.drain(..)
    }
}

#[cfg(test)]
mod test {
    use super::LimitedBuffer;

    #[test]
    fn test_limited_buffer() {
        let mut buffer = LimitedBuffer::with_capacity(2);

        buffer.push(1);
        assert_eq!(buffer.is_full(), false);
        buffer.push(0);
        assert_eq!(buffer.is_full(), true);

        buffer.sort();
        let data = Vec::from_iter(buffer.drain());
        assert_eq!(data, vec![0, 1]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.limit(), 2);
    }
}
