//! Swap table: per-slot free bit, disk block base, and sharer list (C2,
//! §4.2).
//!
//! Grounded on `memory/demand_paging.rs::SwapManager`, restructured from its
//! single-owner `swap_file: Vec<[u8; 4096]>` model to the spec's slot ->
//! sharer-list model. The heavier orchestration (`swapout_commit`,
//! `swapin_commit`) needs both a `SwapTable` slot and the owning processes'
//! page directories at once, so those live on `PagingKernel` (`kernel.rs`);
//! this module owns only the slot bookkeeping primitives §4.2 names.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::{BLOCKS_PER_SLOT, NSLOTS, SWAP_START_BLOCK};
use crate::error::{PagingError, PagingResult};
use crate::pte::PteHandle;

struct SwapSlot {
    free: bool,
    disk_base: u32,
    refs: Vec<PteHandle>,
}

/// Fixed `NSLOTS`-slot table, `disk_base` precomputed at construction
/// (`SWAP_START_BLOCK + i * BLOCKS_PER_SLOT`, §4.2).
pub struct SwapTable {
    slots: Vec<SwapSlot>,
}

impl SwapTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(NSLOTS);
        for i in 0..NSLOTS {
            slots.push(SwapSlot {
                free: true,
                disk_base: SWAP_START_BLOCK + (i * BLOCKS_PER_SLOT) as u32,
                refs: Vec::new(),
            });
        }
        Self { slots }
    }

    pub fn disk_base(&self, slot: usize) -> u32 {
        self.slots[slot].disk_base
    }

    pub fn refcount(&self, slot: usize) -> usize {
        self.slots[slot].refs.len()
    }

    pub fn is_free(&self, slot: usize) -> bool {
        self.slots[slot].free
    }

    pub fn refs_of(&self, slot: usize) -> &[PteHandle] {
        &self.slots[slot].refs
    }

    /// `slot_of(blk)`: maps an encoded swap block back to its slot index.
    pub fn slot_of_block(&self, block: u32) -> PagingResult<usize> {
        self.slots
            .iter()
            .position(|s| s.disk_base == block)
            .ok_or(PagingError::UnknownSlot)
    }

    /// Linear scan for a free slot (§4.2). Does not mark it non-free; the
    /// caller does that via `install_many` once it has committed contents.
    pub fn allocate_free_slot(&self) -> PagingResult<usize> {
        self.slots
            .iter()
            .position(|s| s.free)
            .ok_or(PagingError::SwapFull)
    }

    /// Fork-time attach (§4.2 `attach`): append the child's new PTE to the
    /// slot the parent's swapped PTE already names.
    pub fn attach(&mut self, slot: usize, pte: PteHandle) {
        let s = &mut self.slots[slot];
        s.refs.push(pte);
        s.free = false;
    }

    /// Removes `pte` from its slot; frees the slot if it was the last
    /// sharer (§4.2 `flush`, used on dealloc/exit of a swapped PTE).
    pub fn flush(&mut self, slot: usize, pte: PteHandle) -> PagingResult<()> {
        let s = &mut self.slots[slot];
        let pos = s
            .refs
            .iter()
            .position(|h| *h == pte)
            .ok_or(PagingError::ReverseMapNotFound)?;
        s.refs.remove(pos);
        if s.refs.is_empty() {
            s.free = true;
        }
        Ok(())
    }

    /// Installs the full sharer list produced by a swap-out, marking the
    /// slot occupied. Used by `PagingKernel::swapout_commit`.
    pub fn install_many(&mut self, slot: usize, refs: Vec<PteHandle>) {
        let s = &mut self.slots[slot];
        s.refs = refs;
        s.free = false;
    }

    /// Drains every sharer out of a slot and marks it free, returning the
    /// list so the caller can reinstall each one as a present PTE. Used by
    /// `PagingKernel::swapin_commit`.
    pub fn take_all(&mut self, slot: usize) -> Vec<PteHandle> {
        let s = &mut self.slots[slot];
        s.free = true;
        core::mem::take(&mut s.refs)
    }
}

impl Default for SwapTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessId;

    fn h(ptx: u16) -> PteHandle {
        PteHandle::new(ProcessId(1), 0, ptx)
    }

    #[test]
    fn disk_base_is_precomputed_sequentially() {
        let st = SwapTable::new();
        assert_eq!(st.disk_base(0), SWAP_START_BLOCK);
        assert_eq!(
            st.disk_base(1),
            SWAP_START_BLOCK + BLOCKS_PER_SLOT as u32
        );
    }

    #[test]
    fn allocate_free_slot_then_install_marks_it_occupied() {
        let mut st = SwapTable::new();
        let slot = st.allocate_free_slot().unwrap();
        st.install_many(slot, vec![h(0)]);
        assert!(!st.is_free(slot));
        assert_eq!(st.refcount(slot), 1);
    }

    #[test]
    fn attach_adds_a_sharer_without_disturbing_existing_ones() {
        let mut st = SwapTable::new();
        let slot = st.allocate_free_slot().unwrap();
        st.install_many(slot, vec![h(0)]);
        st.attach(slot, h(1));
        assert_eq!(st.refcount(slot), 2);
    }

    #[test]
    fn flush_last_sharer_frees_the_slot() {
        let mut st = SwapTable::new();
        let slot = st.allocate_free_slot().unwrap();
        st.install_many(slot, vec![h(0)]);
        st.flush(slot, h(0)).unwrap();
        assert!(st.is_free(slot));
    }

    #[test]
    fn take_all_drains_and_frees() {
        let mut st = SwapTable::new();
        let slot = st.allocate_free_slot().unwrap();
        st.install_many(slot, vec![h(0), h(1)]);
        let drained = st.take_all(slot);
        assert_eq!(drained.len(), 2);
        assert!(st.is_free(slot));
    }

    #[test]
    fn slot_of_block_resolves_back_to_the_same_slot() {
        let st = SwapTable::new();
        let base = st.disk_base(3);
        assert_eq!(st.slot_of_block(base).unwrap(), 3);
    }

    #[test]
    fn exhausting_every_slot_reports_swap_full() {
        let mut st = SwapTable::new();
        for _ in 0..NSLOTS {
            let slot = st.allocate_free_slot().unwrap();
            st.install_many(slot, vec![h(0)]);
        }
        assert_eq!(st.allocate_free_slot(), Err(PagingError::SwapFull));
    }
}
