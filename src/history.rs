// src/history.rs
//! Fixed-capacity ring buffer for per-frame history.

/// Bounded FIFO history. Pushing onto a full buffer overwrites the oldest
/// entry in place.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Slot storage, grows up to `capacity` then stays fixed
    data: Vec<T>,

    /// Maximum number of entries held
    capacity: usize,

    /// Next slot to write
    write_index: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_index: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.data.len() < self.capacity {
            self.data.push(item);
        } else {
            self.data[self.write_index] = item;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Entry `n` steps back from the newest (`0` is the newest).
    pub fn nth_newest(&self, n: usize) -> Option<&T> {
        if n >= self.data.len() {
            return None;
        }
        let idx = (self.write_index + self.capacity - 1 - n) % self.capacity;
        self.data.get(idx)
    }

    pub fn newest(&self) -> Option<&T> {
        self.nth_newest(0)
    }

    /// Iterate in chronological order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        // Before the first wrap `write_index == len`, so the head slice is empty
        let (tail, head) = self.data.split_at(self.write_index.min(self.data.len()));
        head.iter().chain(tail.iter())
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.write_index = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy out the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_below_capacity_keeps_order() {
        let mut buf = RingBuffer::new(4);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_full());
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
        assert_eq!(buf.newest(), Some(&3));
        assert_eq!(buf.nth_newest(2), Some(&1));
        assert_eq!(buf.nth_newest(3), None);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        for i in 0..7 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_vec(), vec![4, 5, 6]);
        assert_eq!(buf.newest(), Some(&6));
        assert_eq!(buf.nth_newest(1), Some(&5));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buf = RingBuffer::new(0);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_clear() {
        let mut buf = RingBuffer::new(2);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.newest(), None);
        buf.push(9);
        assert_eq!(buf.to_vec(), vec![9]);
    }
}
