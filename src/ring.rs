//! Fixed-capacity slot store addressed by absolute index.
//!
//! Callers address slots with a monotonically increasing index; the buffer
//! maps it onto a circular array modulo capacity. The caller is responsible
//! for keeping its live window within capacity, which is exactly the
//! `head - tail < limit` throttle in the parallel executor.

/// A circular array of optional slots.
#[derive(Debug)]
pub struct Ring<A> {
    slots: Vec<Option<A>>,
}

impl<A> Ring<A> {
    /// Creates a ring with the given capacity. Capacity 0 is clamped to 1.
    pub fn new(capacity: usize) -> Ring<A> {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ring { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Stores a value at an absolute index. The slot must be vacant: the
    /// caller's window invariant guarantees no two live indices collide.
    pub fn put(&mut self, index: usize, value: A) {
        let at = index % self.slots.len();
        debug_assert!(self.slots[at].is_none(), "ring slot {at} still occupied");
        self.slots[at] = Some(value);
    }

    /// Borrows the value at an absolute index, if present.
    pub fn get(&self, index: usize) -> Option<&A> {
        self.slots[index % self.slots.len()].as_ref()
    }

    /// Removes and returns the value at an absolute index, if present.
    pub fn take(&mut self, index: usize) -> Option<A> {
        let at = index % self.slots.len();
        self.slots[at].take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_take_round_trip() {
        let mut ring = Ring::new(3);
        ring.put(0, "a");
        ring.put(1, "b");
        assert_eq!(ring.get(0), Some(&"a"));
        assert_eq!(ring.take(0), Some("a"));
        assert_eq!(ring.take(0), None);
        assert_eq!(ring.take(1), Some("b"));
        assert!(ring.is_empty());
    }

    #[test]
    fn absolute_indices_wrap_modulo_capacity() {
        let mut ring = Ring::new(2);
        ring.put(6, 60);
        ring.put(7, 70);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.take(6), Some(60));
        ring.put(8, 80);
        assert_eq!(ring.take(7), Some(70));
        assert_eq!(ring.take(8), Some(80));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut ring: Ring<u8> = Ring::new(0);
        assert_eq!(ring.capacity(), 1);
        ring.put(5, 1);
        assert_eq!(ring.take(5), Some(1));
    }
}
