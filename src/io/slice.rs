//! Logical bounds of an input cursor.

use std::fmt;
use std::sync::Arc;

/// The range of a parent stream that an input covers.
///
/// Slices form a parent chain, so a cursor nested several levels deep can
/// still report where it sits in the outermost stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    parent: Option<Arc<Slice>>,
    start: u64,
    end: u64,
}

impl Slice {
    /// Bounds of an outermost stream of `size` bytes.
    pub fn root(size: u64) -> Arc<Self> {
        Arc::new(Self { parent: None, start: 0, end: size })
    }

    /// Bounds of `[start, end)` within `parent`, relative to the parent's start.
    pub fn child(parent: &Arc<Slice>, start: u64, end: u64) -> Arc<Self> {
        debug_assert!(start <= end && end <= parent.size());
        Arc::new(Self { parent: Some(Arc::clone(parent)), start, end })
    }

    /// Start offset relative to the parent.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// End offset relative to the parent.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered.
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    /// The enclosing slice, if any.
    pub fn parent(&self) -> Option<&Arc<Slice>> {
        self.parent.as_ref()
    }

    /// Start offset within the outermost stream.
    pub fn absolute_start(&self) -> u64 {
        let mut offset = self.start;
        let mut parent = self.parent.as_deref();
        while let Some(p) = parent {
            offset += p.start;
            parent = p.parent.as_deref();
        }
        offset
    }

    /// End offset within the outermost stream.
    pub fn absolute_end(&self) -> u64 {
        self.absolute_start() + self.size()
    }

    /// Number of enclosing slices.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut parent = self.parent.as_deref();
        while let Some(p) = parent {
            depth += 1;
            parent = p.parent.as_deref();
        }
        depth
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.absolute_start(), self.absolute_end())
    }
}
