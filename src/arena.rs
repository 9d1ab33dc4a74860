//! Caller-owned working memory for the pipelines
//!
//! A [`TensorArena`] is allocated once up front and carved into regions as
//! handlers need staging buffers. Regions are plain `(offset, len)` handles,
//! so nothing borrows the arena between calls.

use crate::error::{EdgeError, Result};

/// Default arena size, large enough for a 192x192 RGB frame plus staging
pub const DEFAULT_ARENA_SIZE: usize = 512 * 1024;

/// Handle to a byte range inside a [`TensorArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaRegion {
    pub offset: usize,
    pub len: usize,
}

/// Fixed-capacity bump allocator over a byte buffer
#[derive(Debug)]
pub struct TensorArena {
    buffer: Vec<u8>,
    used: usize,
}

impl TensorArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.used
    }

    /// Reserve `len` zeroed bytes
    pub fn allocate(&mut self, len: usize) -> Result<ArenaRegion> {
        if len > self.available() {
            return Err(EdgeError::ArenaExhausted {
                requested: len,
                available: self.available(),
            });
        }
        let region = ArenaRegion {
            offset: self.used,
            len,
        };
        self.used += len;
        self.buffer[region.offset..region.offset + len].fill(0);
        log::trace!("arena: allocated {} bytes at {}", len, region.offset);
        Ok(region)
    }

    pub fn get(&self, region: ArenaRegion) -> &[u8] {
        &self.buffer[region.offset..region.offset + region.len]
    }

    pub fn get_mut(&mut self, region: ArenaRegion) -> &mut [u8] {
        &mut self.buffer[region.offset..region.offset + region.len]
    }

    /// Release every region at once
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

impl Default for TensorArena {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA_SIZE)
    }
}
