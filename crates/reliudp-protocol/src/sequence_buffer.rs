use crate::sequence::SequenceNumber;

/// Ring buffer keyed by sequence number modulo its capacity.
///
/// A slot answers only for the sequence number last stored in it, so reusing
/// an index evicts the prior occupant. Used for the per-connection send
/// history and for the receive-side set of missing sequence numbers.
#[derive(Debug)]
pub struct SequenceBuffer<T> {
    entry_sequences: Box<[Option<SequenceNumber>]>,
    entries: Box<[Option<T>]>,
    len: usize,
}

impl<T> SequenceBuffer<T> {
    /// Creates a buffer with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "sequence buffer capacity must be non-zero");
        Self {
            entry_sequences: vec![None; capacity].into_boxed_slice(),
            entries: std::iter::repeat_with(|| None).take(capacity).collect(),
            len: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Checks if an entry exists for exactly this sequence number.
    pub fn exists(&self, sequence_num: SequenceNumber) -> bool {
        self.entry_sequences[self.index(sequence_num)] == Some(sequence_num)
    }

    /// Gets an entry by sequence number.
    pub fn get(&self, sequence_num: SequenceNumber) -> Option<&T> {
        if self.exists(sequence_num) {
            return self.entries[self.index(sequence_num)].as_ref();
        }
        None
    }

    /// Gets a mutable reference to an entry by sequence number.
    pub fn get_mut(&mut self, sequence_num: SequenceNumber) -> Option<&mut T> {
        if self.exists(sequence_num) {
            let index = self.index(sequence_num);
            return self.entries[index].as_mut();
        }
        None
    }

    /// Stores `entry` for `sequence_num`, returning whatever occupied the slot
    /// before along with its sequence number.
    pub fn insert(
        &mut self,
        sequence_num: SequenceNumber,
        entry: T,
    ) -> Option<(SequenceNumber, T)> {
        let index = self.index(sequence_num);
        let previous_sequence = self.entry_sequences[index].replace(sequence_num);
        let previous = self.entries[index].replace(entry);
        match (previous_sequence, previous) {
            (Some(seq), Some(value)) => Some((seq, value)),
            _ => {
                self.len += 1;
                None
            }
        }
    }

    /// Removes and returns the entry for `sequence_num`.
    pub fn remove(&mut self, sequence_num: SequenceNumber) -> Option<T> {
        if self.exists(sequence_num) {
            let index = self.index(sequence_num);
            self.entry_sequences[index] = None;
            self.len -= 1;
            return self.entries[index].take();
        }
        None
    }

    /// Iterates over occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SequenceNumber, &T)> {
        self.entry_sequences
            .iter()
            .zip(self.entries.iter())
            .filter_map(|(seq, entry)| Some(((*seq)?, entry.as_ref()?)))
    }

    /// Iterates mutably over occupied slots in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SequenceNumber, &mut T)> {
        self.entry_sequences
            .iter()
            .zip(self.entries.iter_mut())
            .filter_map(|(seq, entry)| Some(((*seq)?, entry.as_mut()?)))
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        for index in 0..self.entries.len() {
            self.entries[index] = None;
            self.entry_sequences[index] = None;
        }
        self.len = 0;
    }

    fn index(&self, sequence: SequenceNumber) -> usize {
        sequence as usize % self.entries.len()
    }
}
