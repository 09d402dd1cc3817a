//! Ring buffer of recently retired instructions, for diagnostic replay.

/// One retired instruction: the address it was fetched from and its raw
/// encoding (16 bits wide for compressed instructions, zero-extended).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TraceEntry {
    pub pc: u32,
    pub raw_instruction: u32,
}

/// Fixed-capacity history of the most recently retired instructions.
///
/// The oldest entry is overwritten first once the buffer is full. The buffer
/// is purely observational: the core writes to it once per retired
/// instruction and never reads it back.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    entries: Vec<TraceEntry>,
    capacity: usize,
    // Index of the next slot to overwrite, once `entries` has grown to
    // `capacity`.
    head: usize,
}

impl TraceBuffer {
    /// Returns an empty buffer holding at most `capacity` entries.
    ///
    /// A capacity of `0` is allowed and records nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Records a retired instruction, evicting the oldest entry if the
    /// buffer is full.
    pub fn record(&mut self, pc: u32, raw_instruction: u32) {
        if self.capacity == 0 {
            return;
        }
        let entry = TraceEntry {
            pc,
            raw_instruction,
        };
        if self.entries.len() < self.capacity {
            self.entries.push(entry);
        } else {
            self.entries[self.head] = entry;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// Iterates over the recorded entries in execution order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        // While filling up, `head` equals `len` and the first range is
        // empty; once full, `head` points at the oldest entry.
        self.entries[self.head.min(self.entries.len())..]
            .iter()
            .chain(self.entries[..self.head.min(self.entries.len())].iter())
    }

    /// Number of entries currently recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries the buffer retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forgets all recorded entries, keeping the capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u32) -> TraceEntry {
        TraceEntry {
            pc: n,
            raw_instruction: n << 8,
        }
    }

    #[test]
    fn test_partial_fill_keeps_order() {
        let mut trace = TraceBuffer::new(5);
        assert!(trace.is_empty());
        for n in 0..3 {
            trace.record(n, n << 8);
        }
        assert_eq!(3, trace.len());
        let entries: Vec<_> = trace.iter().copied().collect();
        assert_eq!(vec![entry(0), entry(1), entry(2)], entries);
    }

    #[test]
    fn test_overwrites_oldest_first() {
        let mut trace = TraceBuffer::new(5);
        for n in 0..7 {
            trace.record(n, n << 8);
        }
        assert_eq!(5, trace.len());
        assert_eq!(5, trace.capacity());
        let entries: Vec<_> = trace.iter().copied().collect();
        assert_eq!(
            vec![entry(2), entry(3), entry(4), entry(5), entry(6)],
            entries
        );
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut trace = TraceBuffer::new(0);
        trace.record(4, 0x13);
        assert!(trace.is_empty());
        assert_eq!(None, trace.iter().next());
    }

    #[test]
    fn test_clear() {
        let mut trace = TraceBuffer::new(2);
        for n in 0..5 {
            trace.record(n, n);
        }
        trace.clear();
        assert!(trace.is_empty());
        trace.record(9, 9);
        let entries: Vec<_> = trace.iter().copied().collect();
        assert_eq!(1, entries.len());
        assert_eq!(9, entries[0].pc);
    }
}
