// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity ring buffer used for live log tails.

/// Keeps the last `capacity` items pushed.
///
/// Storage never grows past `capacity`; once full, each push overwrites the
/// oldest slot at the write cursor.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    cursor: usize,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { slots: Vec::with_capacity(capacity), cursor: 0, capacity }
    }

    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.cursor] = item;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// The last `n` items pushed, oldest first.
    ///
    /// Returns fewer than `n` items when fewer have been pushed.
    pub fn peek(&self, n: usize) -> Vec<T> {
        let n = n.min(self.slots.len());
        let len = self.slots.len();
        // cursor points one past the newest item once the buffer has wrapped
        let newest_end = if len < self.capacity { len } else { self.cursor + len };
        (newest_end - n..newest_end).map(|i| self.slots[i % len].clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
