//! Address-space operations (C4, §4.4): growth, shrink, COW fork cloning,
//! and full teardown of a process's user+kernel mappings.
//!
//! Grounded on `memory/demand_paging.rs::fork_memory_space`, which is the
//! teacher's closest (but considerably thinner) analogue — it clones pages
//! unconditionally rather than COW-sharing them. This module rebuilds the
//! operation to the spec's exact refcount/RSS contract instead.

use crate::config::PGSIZE;
use crate::disk::SwapDisk;
use crate::error::{PagingError, PagingResult};
use crate::frame::FrameAllocator;
use crate::kernel::PagingKernel;
use crate::pagetable::MapMode;
use crate::process::ProcessId;
use crate::pte::{pground_up, ptx as ptx_of, pdx as pdx_of, Pte, PteFlags, PteHandle};

impl<FA: FrameAllocator, SD: SwapDisk> PagingKernel<FA, SD> {
    /// `allocuvm(pgdir, old, new)` (§4.4): grows a process from `old` to
    /// `new`, allocating a zeroed frame per page and installing it Tracked
    /// with `WRITABLE|USER`. Rolls back via `deallocuvm` and reports `Oom`
    /// on the first allocation failure.
    pub fn allocuvm(&mut self, pid: ProcessId, old: u32, new: u32) -> PagingResult<()> {
        if new <= old {
            return Ok(());
        }
        let mut a = pground_up(old);
        while a < new {
            match self.frames.allocate() {
                Ok(frame) => {
                    self.zero_frame(frame);
                    if let Err(e) = self.map_range(
                        pid,
                        a,
                        PGSIZE as u32,
                        frame,
                        PteFlags::WRITABLE | PteFlags::USER,
                        MapMode::Tracked,
                    ) {
                        let _ = self.frames.deallocate(frame);
                        self.deallocuvm(pid, a, old)?;
                        return Err(e);
                    }
                    self.credit_rss(pid, PGSIZE as u32)?;
                }
                Err(_) => {
                    self.deallocuvm(pid, a, old)?;
                    return Err(PagingError::Oom);
                }
            }
            a += PGSIZE as u32;
        }
        Ok(())
    }

    /// `deallocuvm(p, pgdir, old, new)` (§4.4): shrinks from `old` to `new`.
    pub fn deallocuvm(&mut self, pid: ProcessId, old: u32, new: u32) -> PagingResult<()> {
        if new >= old {
            return Ok(());
        }
        let mut a = pground_up(new);
        while a < old {
            let d = pdx_of(a);
            let table_exists = {
                let proc = self
                    .processes
                    .get(pid)
                    .ok_or(PagingError::UnknownProcess)?;
                proc.pgdir.table_exists(d)
            };
            if !table_exists {
                // Skip ahead to the next directory entry (§4.4).
                a = (a & !0x3FFFFF) + 0x0040_0000;
                continue;
            }
            let handle = PteHandle::new(pid, d, ptx_of(a));
            let pte = self.pte(handle)?;
            if pte.present() {
                let frame = pte.frame_addr();
                self.reverse_map.dec(frame, handle)?;
                if self.reverse_map.count(frame) == 0 {
                    self.frames.deallocate(frame)?;
                    self.free_frame_contents(frame);
                }
                self.debit_rss(pid, PGSIZE as u32)?;
                self.set_pte(handle, Pte::zero())?;
            } else if pte.swapped() {
                let slot = self.swap_table.slot_of_block(pte.block())?;
                self.swap_table.flush(slot, handle)?;
                self.set_pte(handle, Pte::zero())?;
            }
            a += PGSIZE as u32;
        }
        Ok(())
    }

    /// `copyuvm(parent_pgdir, sz, child)` (§4.4): COW fork. Parent pages
    /// become read-only shared mappings in the child; swapped pages are
    /// attached to the same slot without charging RSS.
    pub fn copyuvm(&mut self, parent: ProcessId, sz: u32, child: ProcessId) -> PagingResult<()> {
        let mut a = 0u32;
        while a < sz {
            let parent_handle = PteHandle::new(parent, pdx_of(a), ptx_of(a));
            let parent_pte = self.pte(parent_handle)?;
            if parent_pte.present() {
                let ro_flags = parent_pte.flags() & !PteFlags::WRITABLE;
                self.set_pte(parent_handle, Pte::new_present(parent_pte.frame_addr(), ro_flags))?;
                self.map_range(
                    child,
                    a,
                    PGSIZE as u32,
                    parent_pte.frame_addr(),
                    ro_flags,
                    MapMode::Tracked,
                )?;
                self.credit_rss(child, PGSIZE as u32)?;
            } else if parent_pte.swapped() {
                let slot = self.swap_table.slot_of_block(parent_pte.block())?;
                self.map_range(
                    child,
                    a,
                    PGSIZE as u32,
                    parent_pte.addr(),
                    parent_pte.flags(),
                    MapMode::SwapPlaceholder,
                )?;
                let child_handle = PteHandle::new(child, pdx_of(a), ptx_of(a));
                self.swap_table.attach(slot, child_handle);
            } else {
                return Err(PagingError::MissingPte);
            }
            a += PGSIZE as u32;
        }
        // Parent's TLB must be invalidated; out of scope (owned by the
        // trap/scheduler layer, §1) — a real kernel reloads %cr3 here.
        Ok(())
    }

    /// `freevm(p, pgdir)` (§4.4): tears down the full address space,
    /// including the kernel half, then drops every intermediate table.
    pub fn freevm(&mut self, pid: ProcessId) -> PagingResult<()> {
        self.deallocuvm(pid, crate::config::KERNBASE, 0)?;
        let proc = self
            .processes
            .get_mut(pid)
            .ok_or(PagingError::UnknownProcess)?;
        for d in 0..1024u16 {
            proc.pgdir.free_table(d);
        }
        Ok(())
    }

    fn credit_rss(&mut self, pid: ProcessId, amount: u32) -> PagingResult<()> {
        let proc = self
            .processes
            .get_mut(pid)
            .ok_or(PagingError::UnknownProcess)?;
        proc.rss += amount;
        Ok(())
    }

    fn debit_rss(&mut self, pid: ProcessId, amount: u32) -> PagingResult<()> {
        let proc = self
            .processes
            .get_mut(pid)
            .ok_or(PagingError::UnknownProcess)?;
        proc.rss = proc.rss.saturating_sub(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::InMemorySwapDisk;
    use crate::frame::BitmapFrameAllocator;

    fn kernel() -> PagingKernel<BitmapFrameAllocator, InMemorySwapDisk> {
        PagingKernel::new(
            BitmapFrameAllocator::new(0x0010_0000, 64),
            InMemorySwapDisk::new(2, 8, 16),
        )
    }

    #[test]
    fn allocuvm_grows_and_charges_rss_per_page() {
        let mut k = kernel();
        let pid = k.processes.alloc(None).unwrap();
        k.allocuvm(pid, 0, 4 * PGSIZE as u32).unwrap();
        assert_eq!(k.processes.get(pid).unwrap().rss, 4 * PGSIZE as u32);
    }

    #[test]
    fn deallocuvm_frees_unshared_frames_and_zeroes_rss() {
        let mut k = kernel();
        let pid = k.processes.alloc(None).unwrap();
        k.allocuvm(pid, 0, 2 * PGSIZE as u32).unwrap();
        let used_before = k.frames.frames_used();
        k.deallocuvm(pid, 2 * PGSIZE as u32, 0).unwrap();
        assert_eq!(k.processes.get(pid).unwrap().rss, 0);
        assert_eq!(k.frames.frames_used(), used_before - 2);
    }

    #[test]
    fn copyuvm_shares_frames_read_only_and_charges_child_rss() {
        let mut k = kernel();
        let parent = k.processes.alloc(None).unwrap();
        let child = k.processes.alloc(None).unwrap();
        k.allocuvm(parent, 0, PGSIZE as u32).unwrap();
        k.copyuvm(parent, PGSIZE as u32, child).unwrap();

        let parent_pte = k.pte(PteHandle::new(parent, pdx_of(0), ptx_of(0))).unwrap();
        let child_pte = k.pte(PteHandle::new(child, pdx_of(0), ptx_of(0))).unwrap();
        assert!(!parent_pte.writable());
        assert!(!child_pte.writable());
        assert_eq!(parent_pte.frame_addr(), child_pte.frame_addr());
        assert_eq!(k.reverse_map.count(parent_pte.frame_addr()), 2);
        assert_eq!(k.processes.get(child).unwrap().rss, PGSIZE as u32);
    }

    #[test]
    fn copyuvm_of_a_swapped_page_attaches_the_child_without_charging_rss() {
        let mut k = kernel();
        let parent = k.processes.alloc(None).unwrap();
        let child = k.processes.alloc(None).unwrap();
        k.allocuvm(parent, 0, PGSIZE as u32).unwrap();
        let frame = k
            .pte(PteHandle::new(parent, pdx_of(0), ptx_of(0)))
            .unwrap()
            .frame_addr();
        let slot = k.swap_table.allocate_free_slot().unwrap();
        k.swapout_commit(frame, slot).unwrap();

        k.copyuvm(parent, PGSIZE as u32, child).unwrap();

        let child_pte = k.pte(PteHandle::new(child, pdx_of(0), ptx_of(0))).unwrap();
        assert!(child_pte.swapped());
        assert!(!child_pte.present());
        assert_eq!(k.swap_table.refcount(slot), 2);
        assert_eq!(k.processes.get(child).unwrap().rss, 0);
    }

    #[test]
    fn copyuvm_on_missing_pte_is_fatal() {
        let mut k = kernel();
        let parent = k.processes.alloc(None).unwrap();
        let child = k.processes.alloc(None).unwrap();
        assert_eq!(
            k.copyuvm(parent, PGSIZE as u32, child),
            Err(PagingError::MissingPte)
        );
    }

    #[test]
    fn freevm_reclaims_every_frame_a_process_owned() {
        let mut k = kernel();
        let pid = k.processes.alloc(None).unwrap();
        k.allocuvm(pid, 0, 3 * PGSIZE as u32).unwrap();
        let used_before = k.frames.frames_used();
        assert!(used_before >= 3);
        k.freevm(pid).unwrap();
        assert_eq!(k.frames.frames_used(), used_before - 3);
    }
}
