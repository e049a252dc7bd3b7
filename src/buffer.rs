use std::{
    mem,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use tracing::{error, warn};


const MIN_BUFFER_LEN: usize = 256;

/// A pool of reusable byte buffers.
///
/// Renting and returning only hold the lock for a push or pop, so the pool can
/// be shared by any number of concurrent dispatch calls.
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    max_buffer_len: usize,
    rented: AtomicUsize,
    returned: AtomicUsize,
}

impl BufferPool {
    pub const DEFAULT_MAX_RETAINED: usize = 64;
    pub const DEFAULT_MAX_BUFFER_LEN: usize = 1024 * 1024;

    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_MAX_RETAINED, Self::DEFAULT_MAX_BUFFER_LEN)
    }

    /// `max_retained` caps how many idle buffers are kept, `max_buffer_len`
    /// caps the capacity of a buffer that is kept. Larger buffers are freed on
    /// return.
    pub fn with_limits(max_retained: usize, max_buffer_len: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_retained,
            max_buffer_len,
            rented: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
        }
    }

    /// The process-wide pool.
    pub fn shared() -> Arc<BufferPool> {
        static SHARED: OnceLock<Arc<BufferPool>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(BufferPool::new())).clone()
    }

    /// Rents an empty buffer with capacity for at least `min_len` bytes.
    pub fn rent(&self, min_len: usize) -> PooledBuffer<'_> {
        let buf = {
            let mut buffers = self.lock();
            buffers
                .iter()
                .rposition(|b| b.capacity() >= min_len)
                .map(|index| buffers.swap_remove(index))
        };
        let buf = buf.unwrap_or_else(|| {
            Vec::with_capacity(min_len.max(MIN_BUFFER_LEN).next_power_of_two())
        });
        self.rented.fetch_add(1, Ordering::Relaxed);
        PooledBuffer {
            pool: self,
            buf,
            released: false,
        }
    }

    fn give_back(&self, mut buf: Vec<u8>) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        if buf.capacity() > self.max_buffer_len {
            return;
        }
        buf.clear();
        let mut buffers = self.lock();
        if buffers.len() < self.max_retained {
            buffers.push(buf);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn rented(&self) -> usize {
        self.rented.load(Ordering::Relaxed)
    }
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::Relaxed)
    }
    pub fn outstanding(&self) -> usize {
        self.rented().saturating_sub(self.returned())
    }
    /// Number of idle buffers held for reuse.
    pub fn retained(&self) -> usize {
        self.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        if cfg!(debug_assertions) && self.outstanding() != 0 {
            error!(
                outstanding = self.outstanding(),
                "buffer pool dropped with buffers still rented"
            );
        }
    }
}

/// A buffer rented from a [`BufferPool`].
///
/// Only the first `len()` bytes are valid. Call [`release`](Self::release) when
/// done; a buffer dropped without release still goes back to the pool, but that
/// path is logged as a leak.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
    released: bool,
}

impl PooledBuffer<'_> {
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
    pub fn len(&self) -> usize {
        self.buf.len()
    }
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
    pub fn release(mut self) {
        self.released = true;
        self.pool.give_back(mem::take(&mut self.buf));
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!(len = self.buf.len(), "pooled buffer dropped without release");
            self.pool.give_back(mem::take(&mut self.buf));
        }
    }
}

/// A text payload encoded as UTF-8 into a pooled buffer.
pub struct PooledTextBuffer<'a>(PooledBuffer<'a>);

impl<'a> PooledTextBuffer<'a> {
    pub fn new(pool: &'a BufferPool, text: &str) -> Self {
        let mut buf = pool.rent(max_utf8_len(text));
        buf.extend_from_slice(text.as_bytes());
        Self(buf)
    }
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn release(self) {
        self.0.release()
    }
}

// `str` is already UTF-8, so its byte length is the exact encoded size.
fn max_utf8_len(text: &str) -> usize {
    text.len()
}
