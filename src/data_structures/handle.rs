//! Generational entity handles.
//!
//! Every entity in the engine is addressed by a 32-bit [`EntityHandle`]: the
//! lower 20 bits hold a dense slot index and the upper 12 bits a generation.
//! Component stores are plain contiguous arrays keyed by the slot index; the
//! generation lets a [`HandlePool`] detect handles that outlived their slot.

use std::fmt;

/// A 32-bit generational handle: `generation << 20 | index`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(u32);

impl EntityHandle {
    pub const INDEX_BITS: u32 = 20;
    pub const MAX_INDEX: u32 = (1 << Self::INDEX_BITS) - 1;
    pub const MAX_GENERATION: u16 = (1 << (32 - Self::INDEX_BITS)) - 1;

    /// Pack an index and a generation. Out-of-range parts are masked.
    pub const fn new(index: u32, generation: u16) -> Self {
        let generation = (generation & Self::MAX_GENERATION) as u32;
        Self(generation << Self::INDEX_BITS | (index & Self::MAX_INDEX))
    }

    pub const fn index(self) -> u32 {
        self.0 & Self::MAX_INDEX
    }

    pub const fn generation(self) -> u16 {
        (self.0 >> Self::INDEX_BITS) as u16
    }

    pub const fn to_bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityHandle({}v{})", self.index(), self.generation())
    }
}

/// Hands out [`EntityHandle`]s and tracks which generation each slot is on.
///
/// Slots are reused lowest-first after a [`clear`](Self::clear), so a pool
/// that is cleared and refilled with `n` entities always maps them onto the
/// dense range `0..n`.
#[derive(Debug, Default, Clone)]
pub struct HandlePool {
    generations: Vec<u16>,
    alive: Vec<bool>,
    // Popped from the back, so it is kept in descending order.
    free: Vec<u32>,
    live: usize,
}

impl HandlePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot. Returns `None` once all 2^20 slots are in use.
    pub fn allocate(&mut self) -> Option<EntityHandle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.generations.len() as u32;
                if index > EntityHandle::MAX_INDEX {
                    return None;
                }
                self.generations.push(0);
                self.alive.push(false);
                index
            }
        };
        let slot = index as usize;
        self.alive[slot] = true;
        self.live += 1;
        Some(EntityHandle::new(index, self.generations[slot]))
    }

    /// Release the slot behind `handle`. Stale handles are ignored.
    pub fn release(&mut self, handle: EntityHandle) -> bool {
        let Some(slot) = self.resolve(handle) else {
            return false;
        };
        self.retire(slot);
        // Keep the free list descending so the lowest slot is reused first.
        let index = slot as u32;
        let at = self.free.partition_point(|&free| free > index);
        self.free.insert(at, index);
        true
    }

    /// Invalidate every outstanding handle at once.
    pub fn clear(&mut self) {
        for slot in 0..self.generations.len() {
            if self.alive[slot] {
                self.retire(slot);
            }
        }
        self.free = (0..self.generations.len() as u32).rev().collect();
    }

    /// Dense slot index for a live handle, `None` for stale or foreign handles.
    pub fn resolve(&self, handle: EntityHandle) -> Option<usize> {
        let slot = handle.index() as usize;
        let alive = *self.alive.get(slot)?;
        (alive && self.generations[slot] == handle.generation()).then_some(slot)
    }

    /// Handle currently bound to a live slot.
    pub fn handle_at(&self, slot: usize) -> Option<EntityHandle> {
        let alive = *self.alive.get(slot)?;
        alive.then(|| EntityHandle::new(slot as u32, self.generations[slot]))
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn retire(&mut self, slot: usize) {
        self.alive[slot] = false;
        self.generations[slot] = (self.generations[slot] + 1) & EntityHandle::MAX_GENERATION;
        self.live -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_index_and_generation() {
        let handle = EntityHandle::new(0xABCDE, 0x123);
        assert_eq!(handle.index(), 0xABCDE);
        assert_eq!(handle.generation(), 0x123);
        assert_eq!(EntityHandle::from_bits(handle.to_bits()), handle);
    }

    #[test]
    fn generation_wraps_after_4096_reuses() {
        let mut pool = HandlePool::new();
        let first = pool.allocate().unwrap();
        for _ in 0..4096 {
            pool.clear();
            pool.allocate().unwrap();
        }
        let again = pool.handle_at(0).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn released_slot_is_reused_lowest_first() {
        let mut pool = HandlePool::new();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        let _c = pool.allocate().unwrap();
        assert!(pool.release(b));
        assert!(pool.release(a));
        assert_eq!(pool.allocate().unwrap().index(), 0);
        assert_eq!(pool.allocate().unwrap().index(), 1);
    }
}
