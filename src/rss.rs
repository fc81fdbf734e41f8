//! RSS accounting (C7, §4.7): `rss_incrementer`/`rss_decrementer`.
//!
//! Grounded on the spec's own description rather than a direct teacher
//! analogue (the teacher's `PageInfo` has no per-process RSS at all). Kept
//! as the tested O(processes · sz) scan per the decided open question in
//! §9/§4.7; `ReverseMap` already has the sharer set an O(sharers) version
//! would use, should a future change want it.

use crate::config::PGSIZE;
use crate::disk::SwapDisk;
use crate::error::PagingResult;
use crate::frame::FrameAllocator;
use crate::kernel::PagingKernel;
use crate::pte::{pdx, ptx};

impl<FA: FrameAllocator, SD: SwapDisk> PagingKernel<FA, SD> {
    /// For every live process, walk `[0, size)` in page steps; the first
    /// present PTE mapping `pa` earns that process `+= PGSIZE` and ends the
    /// scan for that process (at most one hit per process, §4.7).
    pub fn rss_incrementer(&mut self, pa: u32) -> PagingResult<()> {
        self.adjust_rss(pa, PGSIZE as u32)
    }

    pub fn rss_decrementer(&mut self, pa: u32) -> PagingResult<()> {
        self.adjust_rss(pa, 0u32.wrapping_sub(PGSIZE as u32))
    }

    fn adjust_rss(&mut self, pa: u32, delta: u32) -> PagingResult<()> {
        let pids: alloc::vec::Vec<_> = self.processes.iter().map(|p| p.pid).collect();
        for pid in pids {
            let size = match self.processes.get(pid) {
                Some(p) => p.size,
                None => continue,
            };
            let mut va = 0u32;
            while va < size {
                let d = pdx(va);
                let present_here = {
                    let proc = self.processes.get(pid).unwrap();
                    if proc.pgdir.table_exists(d) {
                        let pte = proc.pgdir.pte(d, ptx(va));
                        pte.present() && pte.frame_addr() == pa
                    } else {
                        false
                    }
                };
                if present_here {
                    let proc = self.processes.get_mut(pid).unwrap();
                    proc.rss = proc.rss.wrapping_add(delta);
                    break;
                }
                va += PGSIZE as u32;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::InMemorySwapDisk;
    use crate::frame::BitmapFrameAllocator;
    use crate::pagetable::MapMode;
    use crate::pte::PteFlags;

    fn kernel() -> PagingKernel<BitmapFrameAllocator, InMemorySwapDisk> {
        PagingKernel::new(
            BitmapFrameAllocator::new(0x0010_0000, 64),
            InMemorySwapDisk::new(2, 8, 16),
        )
    }

    #[test]
    fn incrementer_charges_every_process_sharing_the_frame() {
        let mut k = kernel();
        let a = k.processes.alloc(None).unwrap();
        let b = k.processes.alloc(None).unwrap();
        let frame = k.frames.allocate().unwrap();
        k.map_range(a, 0, PGSIZE as u32, frame, PteFlags::USER, MapMode::Tracked)
            .unwrap();
        k.map_range(b, 0, PGSIZE as u32, frame, PteFlags::USER, MapMode::Tracked)
            .unwrap();
        k.processes.get_mut(a).unwrap().size = PGSIZE as u32;
        k.processes.get_mut(b).unwrap().size = PGSIZE as u32;

        k.rss_incrementer(frame).unwrap();
        assert_eq!(k.processes.get(a).unwrap().rss, PGSIZE as u32);
        assert_eq!(k.processes.get(b).unwrap().rss, PGSIZE as u32);
    }

    #[test]
    fn decrementer_only_touches_processes_mapping_the_frame() {
        let mut k = kernel();
        let a = k.processes.alloc(None).unwrap();
        let unrelated = k.processes.alloc(None).unwrap();
        let frame = k.frames.allocate().unwrap();
        k.map_range(a, 0, PGSIZE as u32, frame, PteFlags::USER, MapMode::Tracked)
            .unwrap();
        k.processes.get_mut(a).unwrap().size = PGSIZE as u32;
        k.processes.get_mut(a).unwrap().rss = PGSIZE as u32;
        k.processes.get_mut(unrelated).unwrap().size = PGSIZE as u32;

        k.rss_decrementer(frame).unwrap();
        assert_eq!(k.processes.get(a).unwrap().rss, 0);
        assert_eq!(k.processes.get(unrelated).unwrap().rss, 0);
    }
}
