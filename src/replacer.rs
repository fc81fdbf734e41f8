//! Page replacement (C6, §4.6): victim selection, the aging sweep, and
//! `swap_page_out`.
//!
//! No direct teacher analogue — `memory/demand_paging.rs` has no eviction
//! policy at all, only swap-out triggered explicitly by its caller. This
//! module is grounded directly on the spec's own algorithm and on
//! `original_source/proc.c:677-698` (`clear_access`) for the aging sweep's
//! exact counter semantics.

use alloc::vec::Vec;

use crate::disk::SwapDisk;
use crate::error::{PagingError, PagingResult};
use crate::frame::FrameAllocator;
use crate::kernel::PagingKernel;
use crate::process::ProcessId;
use crate::pte::{Pte, PteFlags, PteHandle};

impl<FA: FrameAllocator, SD: SwapDisk> PagingKernel<FA, SD> {
    /// First PTE in directory-entry, then page-table-entry order that is
    /// `PRESENT`, `USER`, and has `ACCESSED` cleared (§4.6). Victim-page
    /// selection only ever examines `USER` PTEs; kernel mappings installed
    /// by `setup_kernel_vm` never carry that flag (§9 decided precondition).
    pub fn select_victim_page(&self, pid: ProcessId) -> PagingResult<Option<PteHandle>> {
        let proc = self
            .processes
            .get(pid)
            .ok_or(PagingError::UnknownProcess)?;
        for d in 0..1024u16 {
            if !proc.pgdir.table_exists(d) {
                continue;
            }
            for t in 0..1024u16 {
                let pte = proc.pgdir.pte(d, t);
                if pte.present() && pte.user() && !pte.accessed() {
                    return Ok(Some(PteHandle::new(pid, d, t)));
                }
            }
        }
        Ok(None)
    }

    /// Clears `ACCESSED` on the first `PRESENT|USER|ACCESSED` PTE
    /// encountered, then every 10th one after that, in the same scan order
    /// as `select_victim_page`. The counter is local to this call and
    /// restarts at 0 every time (`proc.c:681`'s `uint count = 0;` is a plain
    /// local, not `static`, so it resets on every `clear_access` call —
    /// including every retry inside `page_replacement`'s own loop). Returns
    /// whether any PTE was cleared, so `page_replacement` can detect a
    /// stalled scan.
    fn aging_sweep(&mut self, pid: ProcessId) -> PagingResult<bool> {
        let candidates: Vec<(u16, u16)> = {
            let proc = self
                .processes
                .get(pid)
                .ok_or(PagingError::UnknownProcess)?;
            let mut v = Vec::new();
            for d in 0..1024u16 {
                if !proc.pgdir.table_exists(d) {
                    continue;
                }
                for t in 0..1024u16 {
                    let pte = proc.pgdir.pte(d, t);
                    if pte.present() && pte.user() && pte.accessed() {
                        v.push((d, t));
                    }
                }
            }
            v
        };
        let mut touched = false;
        let mut count = 0u32;
        for (d, t) in candidates {
            if count == 0 {
                let handle = PteHandle::new(pid, d, t);
                let pte = self.pte(handle)?;
                let cleared = pte.flags() & !PteFlags::ACCESSED;
                self.set_pte(handle, Pte::new_present(pte.frame_addr(), cleared))?;
                touched = true;
            }
            count = (count + 1) % 10;
        }
        Ok(touched)
    }

    /// `page_replacement()` (§4.6): picks the process with maximum `rss`,
    /// then a victim page within it, running the aging sweep and retrying
    /// if no page is immediately eligible. The sweep is guaranteed to make
    /// progress whenever any `PRESENT|USER` page exists in the victim.
    pub fn page_replacement(&mut self) -> PagingResult<PteHandle> {
        let pid = self
            .processes
            .select_victim_process()
            .ok_or(PagingError::Oom)?;
        loop {
            if let Some(handle) = self.select_victim_page(pid)? {
                return Ok(handle);
            }
            if !self.aging_sweep(pid)? {
                return Err(PagingError::Oom);
            }
        }
    }

    /// `swap_page_out()` (§4.6): evicts the selected victim page to disk
    /// and frees its frame.
    pub fn swap_page_out(&mut self) -> PagingResult<()> {
        let handle = self.page_replacement()?;
        let pte = self.pte(handle)?;
        let frame = pte.frame_addr();

        self.rss_decrementer(frame)?;
        let slot = self.swap_table.allocate_free_slot()?;
        let data = self.read_frame(frame);
        let disk_base = self.swap_table.disk_base(slot);
        self.disk.write_page(disk_base, &data)?;
        self.swapout_commit(frame, slot)?;
        self.frames.deallocate(frame)?;
        self.free_frame_contents(frame);
        Ok(())
    }
}
