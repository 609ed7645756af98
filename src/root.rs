//! The enclosing durable collection.

use crate::config::Options;
use crate::error::{Error, Result};
use crate::format::BlockType;
use crate::io::{DurableInput, Input};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A handle on the file or region a block was read from.
///
/// Every decode receives the root so that values referring to other blocks of
/// the same collection can resolve them. Cloning is cheap and all clones
/// compare equal; two roots opened separately never do, even over the same
/// bytes.
#[derive(Clone)]
pub struct Root {
    inner: Arc<RootInner>,
}

struct RootInner {
    id: u64,
    description: String,
    input: Option<Input>,
}

impl Root {
    /// A root for blocks that live outside any collection, such as
    /// in-memory buffers. It cannot resolve references.
    pub fn detached() -> Self {
        Self::build("detached".to_string(), None)
    }

    /// A root over `input`, which holds the whole collection.
    pub fn new(description: impl Into<String>, input: Input) -> Self {
        Self::build(description.into(), Some(input))
    }

    /// Loads the file at `path` and roots it.
    pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        let path = path.as_ref();
        let input = Input::open(path, options)?;
        Ok(Self::new(path.display().to_string(), input))
    }

    fn build(description: String, input: Option<Input>) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self { inner: Arc::new(RootInner { id, description, input }) }
    }

    /// Process-unique identity.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Where the collection came from, for diagnostics.
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// Returns true if this root has no backing input.
    pub fn is_detached(&self) -> bool {
        self.inner.input.is_none()
    }

    /// Size of the collection in bytes.
    pub fn size(&self) -> u64 {
        self.inner.input.as_ref().map(|input| input.size()).unwrap_or(0)
    }

    /// A fresh cursor over the whole collection, positioned at its start.
    pub fn input(&self) -> Result<Input> {
        let mut input = self
            .inner
            .input
            .as_ref()
            .map(|input| input.duplicate())
            .ok_or_else(|| Error::invalid_argument("a detached root has no input"))?;
        input.seek(0)?;
        Ok(input)
    }

    /// A cursor over `[start, end)` of the collection.
    pub fn slice(&self, start: u64, end: u64) -> Result<Input> {
        self.input()?.slice(start, end)
    }

    /// Resolves the framed block starting at `offset`.
    pub fn block_at(&self, offset: u64) -> Result<(BlockType, Input)> {
        let mut input = self.input()?;
        input.seek(offset)?;
        let (block_type, block) = input.slice_prefixed_block()?;
        log::trace!("Resolved {} block at {} in {}", block_type, offset, self.description());
        Ok((block_type, block))
    }
}

impl PartialEq for Root {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Root {}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("id", &self.inner.id)
            .field("description", &self.inner.description)
            .field("size", &self.size())
            .finish()
    }
}
