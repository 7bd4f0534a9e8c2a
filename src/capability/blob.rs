//! Deduplicated blob store - interned, immutable byte images
//!
//! Design:
//! - Entries are kept sorted by (length, bytes) and searched by binary search
//! - Each blob lives in its own word-aligned heap allocation, so a returned
//!   `BlobRef` stays valid while the table vector grows
//! - Equal contents always yield the same handle; handles compare by address
//! - Blobs are never freed individually, only at `teardown`

use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::error::{PyErr, PyResult};
use crate::logging::{debug, trace};

static GLOBAL: Lazy<Mutex<BlobStore>> = Lazy::new(|| Mutex::new(BlobStore::new()));

/// Stable handle to an interned blob
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobRef {
    ptr: NonNull<u8>,
    len: usize,
}

// Blobs are immutable once interned.
unsafe impl Send for BlobRef {}
unsafe impl Sync for BlobRef {}

impl BlobRef {
    #[inline]
    pub fn as_ptr(self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn len(self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Typed pointer to the blob (blobs are word-aligned)
    #[inline]
    pub(crate) fn cast<T>(self) -> NonNull<T> {
        self.ptr.cast()
    }

    /// View the blob contents
    ///
    /// # Safety
    /// The owning store must not have been cleared or torn down.
    pub unsafe fn as_bytes<'a>(self) -> &'a [u8] {
        slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }
}

impl fmt::Debug for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobRef({:p}, {} bytes)", self.ptr, self.len)
    }
}

#[cfg(test)]
thread_local! {
    /// Makes the next blob allocation on this thread fail
    pub(crate) static FAIL_NEXT_ALLOCATION: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

struct Blob {
    words: Box<[usize]>,
    len: usize,
}

impl Blob {
    fn copy_from(bytes: &[u8]) -> PyResult<Self> {
        let word_count = bytes.len().div_ceil(mem::size_of::<usize>());
        let mut words: Vec<usize> = Vec::new();

        #[cfg(test)]
        if FAIL_NEXT_ALLOCATION.with(|fail| fail.replace(false)) {
            return Err(PyErr::memory_error("cannot allocate interned blob"));
        }

        words
            .try_reserve_exact(word_count)
            .map_err(|_| PyErr::memory_error("cannot allocate interned blob"))?;
        words.resize(word_count, 0);
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), words.as_mut_ptr().cast::<u8>(), bytes.len());
        }
        Ok(Self {
            words: words.into_boxed_slice(),
            len: bytes.len(),
        })
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.len) }
    }

    #[inline]
    fn handle(&self) -> BlobRef {
        BlobRef {
            ptr: NonNull::from(&*self.words).cast::<u8>(),
            len: self.len,
        }
    }

    #[inline]
    fn order(&self, bytes: &[u8]) -> Ordering {
        self.len
            .cmp(&bytes.len())
            .then_with(|| self.bytes().cmp(bytes))
    }
}

/// Sorted table of unique byte blobs
#[derive(Default)]
pub struct BlobStore {
    entries: Vec<Blob>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `bytes`, copying them in on first sight
    ///
    /// A failed allocation leaves the store unchanged.
    pub fn intern(&mut self, bytes: &[u8]) -> PyResult<BlobRef> {
        let position = match self.search(bytes) {
            Ok(found) => return Ok(self.entries[found].handle()),
            Err(position) => position,
        };

        self.entries
            .try_reserve(1)
            .map_err(|_| PyErr::memory_error("cannot grow blob table"))?;
        let blob = Blob::copy_from(bytes)?;
        let handle = blob.handle();
        self.entries.insert(position, blob);

        trace!(len = bytes.len(), entries = self.entries.len(), "blob interned");
        Ok(handle)
    }

    /// Handle for `bytes` if already interned
    pub fn lookup(&self, bytes: &[u8]) -> Option<BlobRef> {
        self.search(bytes).ok().map(|found| self.entries[found].handle())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held across all blobs
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|blob| blob.len).sum()
    }

    /// Drop every blob, invalidating all handles
    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries.shrink_to_fit();
    }

    #[cfg(test)]
    pub(crate) fn is_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].order(pair[1].bytes()) == Ordering::Less)
    }

    fn search(&self, bytes: &[u8]) -> Result<usize, usize> {
        self.entries.binary_search_by(|blob| blob.order(bytes))
    }
}

impl fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStore")
            .field("entries", &self.entries.len())
            .field("total_bytes", &self.total_bytes())
            .finish()
    }
}

/// Intern `bytes` in the process-wide store
pub fn intern(bytes: &[u8]) -> PyResult<BlobRef> {
    GLOBAL.lock().intern(bytes)
}

/// Number of blobs in the process-wide store
pub fn global_len() -> usize {
    GLOBAL.lock().len()
}

/// Release every blob in the process-wide store
///
/// # Safety
/// No type object that enabled a grouped capability may be used afterwards;
/// their substructure pointers dangle once this returns.
pub unsafe fn teardown() {
    let mut store = GLOBAL.lock();
    debug!(entries = store.len(), bytes = store.total_bytes(), "tearing down blob store");
    store.clear();
}
