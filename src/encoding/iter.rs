//! Lazy, skippable sequences of decoded values.

use super::Value;
use crate::error::Result;

/// A lazy sequence of decoded values that can step past an element without
/// materializing it.
///
/// Indexed access is built on [`skip_n`](Self::skip_n), so implementations
/// should make [`skip_next`](Self::skip_next) strictly cheaper than
/// [`next_value`](Self::next_value) wherever the format allows it.
pub trait SkippableIterator: Send {
    /// Returns true if another value can be read.
    fn has_next(&self) -> bool;

    /// Decodes the next value. Fails with an end-of-input error when exhausted.
    fn next_value(&mut self) -> Result<Value>;

    /// Advances past the next value.
    fn skip_next(&mut self) -> Result<()>;

    /// Advances past the next `n` values.
    fn skip_n(&mut self, n: u64) -> Result<()> {
        for _ in 0..n {
            self.skip_next()?;
        }
        Ok(())
    }
}

impl dyn SkippableIterator {
    /// Adapts this into a standard [`Iterator`].
    pub fn into_values(self: Box<Self>) -> Values {
        Values::new(self)
    }
}

/// An owned, type-erased skippable iterator.
pub type BoxedIterator = Box<dyn SkippableIterator>;

/// A [`SkippableIterator`] viewed as an `Iterator<Item = Result<Value>>`.
///
/// Iteration ends after the first error.
pub struct Values {
    inner: BoxedIterator,
    failed: bool,
}

impl Values {
    /// Wraps a boxed skippable iterator.
    pub fn new(inner: BoxedIterator) -> Self {
        Self { inner, failed: false }
    }

    /// The wrapped iterator.
    pub fn into_inner(self) -> BoxedIterator {
        self.inner
    }
}

impl Iterator for Values {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.inner.has_next() {
            return None;
        }
        let value = self.inner.next_value();
        self.failed = value.is_err();
        Some(value)
    }
}

/// A skippable iterator over values already in memory.
pub struct VecIterator {
    values: std::vec::IntoIter<Value>,
}

impl VecIterator {
    /// Iterate over `values` in order.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values: values.into_iter() }
    }
}

impl SkippableIterator for VecIterator {
    fn has_next(&self) -> bool {
        self.values.len() > 0
    }

    fn next_value(&mut self) -> Result<Value> {
        self.values
            .next()
            .ok_or_else(|| crate::Error::EndOfInput { position: 0, needed: 1, remaining: 0 })
    }

    fn skip_next(&mut self) -> Result<()> {
        self.next_value().map(|_| ())
    }

    fn skip_n(&mut self, n: u64) -> Result<()> {
        if n > self.values.len() as u64 {
            return Err(crate::Error::EndOfInput {
                position: 0,
                needed: n as usize,
                remaining: self.values.len(),
            });
        }
        if n > 0 {
            self.values.nth(n as usize - 1);
        }
        Ok(())
    }
}
