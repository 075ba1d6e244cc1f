//! Ring-buffer primitives backing the signature pipeline.
//!
//! Both rings keep an explicit write cursor and a never-wrapping count of
//! writes, so callers can address entries relative to "now" and ask how far
//! the stream has advanced.

/// Fixed-capacity circular store for raw samples.
///
/// The cursor always points at the slot that will be written next, which is
/// also the oldest live sample. A freshly constructed ring reads as all
/// default values, so early snapshots are zero-padded on the left.
#[derive(Debug)]
pub struct Ring<T> {
    storage: Vec<T>,
    cursor: usize,
    total_written: u64,
}

impl<T: Copy + Default> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![T::default(); capacity],
            cursor: 0,
            total_written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Append a block at the cursor, wrapping around the end of storage.
    /// The block must not be longer than the capacity.
    pub fn write_block(&mut self, block: &[T]) {
        debug_assert!(block.len() <= self.capacity());

        let capacity = self.capacity();
        let head = (capacity - self.cursor).min(block.len());

        self.storage[self.cursor..self.cursor + head].copy_from_slice(&block[..head]);
        self.storage[..block.len() - head].copy_from_slice(&block[head..]);

        self.cursor = (self.cursor + block.len()) % capacity;
        self.total_written += block.len() as u64;
    }

    /// Copy the whole window into `out` in time order, oldest sample first.
    /// `out` must be exactly one capacity long.
    pub fn snapshot_into(&self, out: &mut [T]) {
        debug_assert_eq!(out.len(), self.capacity());

        let head = self.capacity() - self.cursor;
        out[..head].copy_from_slice(&self.storage[self.cursor..]);
        out[head..].copy_from_slice(&self.storage[..self.cursor]);
    }

    pub fn reset(&mut self) {
        for slot in self.storage.iter_mut() {
            *slot = T::default();
        }
        self.cursor = 0;
        self.total_written = 0;
    }
}

/// Fixed-depth ring of equally sized spectrum rows.
///
/// Rows are addressed by a signed offset relative to the write cursor:
/// offset -1 is the most recently pushed row, and positive offsets wrap
/// around the depth (offset +250 in a 256-deep ring reaches the row pushed
/// 6 rows ago). Unwritten rows read as zeros.
#[derive(Debug)]
pub struct SpectrumRing {
    storage: Vec<f32>,
    row_len: usize,
    cursor: usize,
    total_written: u64,
}

impl SpectrumRing {
    pub fn new(depth: usize, row_len: usize) -> Self {
        Self {
            storage: vec![0.0; depth * row_len],
            row_len,
            cursor: 0,
            total_written: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.storage.len() / self.row_len
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    fn row_index(&self, offset: i32) -> usize {
        let depth = self.depth() as i64;
        (self.cursor as i64 + offset as i64).rem_euclid(depth) as usize
    }

    pub fn row(&self, offset: i32) -> &[f32] {
        let start = self.row_index(offset) * self.row_len;
        &self.storage[start..start + self.row_len]
    }

    pub fn row_mut(&mut self, offset: i32) -> &mut [f32] {
        let start = self.row_index(offset) * self.row_len;
        &mut self.storage[start..start + self.row_len]
    }

    /// Copy a row into the cursor slot and advance the cursor.
    pub fn push_row(&mut self, row: &[f32]) {
        debug_assert_eq!(row.len(), self.row_len);

        let start = self.cursor * self.row_len;
        self.storage[start..start + self.row_len].copy_from_slice(row);

        self.cursor = (self.cursor + 1) % self.depth();
        self.total_written += 1;
    }

    pub fn reset(&mut self) {
        for value in self.storage.iter_mut() {
            *value = 0.0;
        }
        self.cursor = 0;
        self.total_written = 0;
    }
}
