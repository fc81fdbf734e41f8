//! `PagingKernel`: the single encapsulating state value (§9 Design Note).
//!
//! The original source scatters this state across several file-scope
//! globals (`ptable`, the frame bitmap, the swap table). The teacher does
//! the same thing with separate `lazy_static!` managers per subsystem
//! (`DEMAND_PAGING`, `FRAME_ALLOCATOR`, `PROCESS_MANAGER`). This crate
//! collapses all of it into one generic value its caller owns explicitly;
//! `global.rs` supplies the `lazy_static! Mutex<Option<..>>` wrapper for
//! callers that want the teacher's familiar integration surface.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::config::{KERNBASE, PGSIZE};
use crate::disk::SwapDisk;
use crate::error::{PagingError, PagingResult};
use crate::frame::FrameAllocator;
use crate::pagetable::MapMode;
use crate::process::{ProcessId, ProcessTable};
use crate::pte::{pground_down, Pte, PteFlags, PteHandle};
use crate::reverse_map::ReverseMap;
use crate::swap_table::SwapTable;

/// One entry of the fixed kernel mapping table installed by
/// `setup_kernel_vm` (§4.4, §2b): `(va, size, pa, perm)`.
struct KernelMapping {
    va: u32,
    size: u32,
    pa: u32,
    perm: PteFlags,
}

/// Device space, kernel text/rodata, kernel data, and a second device
/// window, all Plain-mode (§2b "setup_kernel_vm-style plain mapping").
/// Addresses are illustrative fixed constants for a small teaching kernel,
/// not derived from a real linker script.
const KERNEL_MAPPINGS: &[KernelMapping] = &[
    KernelMapping {
        va: KERNBASE,
        size: 4 * 1024 * 1024,
        pa: KERNBASE,
        perm: PteFlags::empty(),
    },
    KernelMapping {
        va: KERNBASE + 4 * 1024 * 1024,
        size: 4 * 1024 * 1024,
        pa: KERNBASE + 4 * 1024 * 1024,
        perm: PteFlags::WRITABLE,
    },
    KernelMapping {
        va: 0xFE00_0000,
        size: 0x0020_0000,
        pa: 0xFE00_0000,
        perm: PteFlags::WRITABLE,
    },
];

pub struct PagingKernel<FA: FrameAllocator, SD: SwapDisk> {
    pub frames: FA,
    pub disk: SD,
    pub reverse_map: ReverseMap,
    pub swap_table: SwapTable,
    pub processes: ProcessTable,
    /// Byte-addressable backing store for allocated frames. Real kernels
    /// get this for free from physical RAM; `FrameAllocator` here only
    /// hands out addresses, so the kernel keeps the bytes itself — the
    /// same role the teacher's `SwapManager::swap_file: Vec<[u8; 4096]>`
    /// plays for swap contents, applied to live frames instead.
    ram: BTreeMap<u32, [u8; PGSIZE]>,
}

impl<FA: FrameAllocator, SD: SwapDisk> PagingKernel<FA, SD> {
    pub fn new(frames: FA, disk: SD) -> Self {
        Self {
            frames,
            disk,
            reverse_map: ReverseMap::new(),
            swap_table: SwapTable::new(),
            processes: ProcessTable::new(),
            ram: BTreeMap::new(),
        }
    }

    pub fn zero_frame(&mut self, frame: u32) {
        self.ram.insert(frame, [0u8; PGSIZE]);
    }

    pub fn write_frame(&mut self, frame: u32, data: &[u8; PGSIZE]) {
        self.ram.insert(frame, *data);
    }

    pub fn read_frame(&self, frame: u32) -> [u8; PGSIZE] {
        self.ram.get(&frame).copied().unwrap_or([0u8; PGSIZE])
    }

    pub fn free_frame_contents(&mut self, frame: u32) {
        self.ram.remove(&frame);
    }

    pub fn pte(&self, handle: PteHandle) -> PagingResult<Pte> {
        let proc = self
            .processes
            .get(handle.pgdir)
            .ok_or(PagingError::UnknownProcess)?;
        Ok(proc.pgdir.pte(handle.pdx, handle.ptx))
    }

    pub fn set_pte(&mut self, handle: PteHandle, value: Pte) -> PagingResult<()> {
        let proc = self
            .processes
            .get_mut(handle.pgdir)
            .ok_or(PagingError::UnknownProcess)?;
        proc.pgdir.set_pte(handle.pdx, handle.ptx, value);
        Ok(())
    }

    /// `map_range` (§4.3): installs PTEs for `[PGROUNDDOWN(va),
    /// PGROUNDDOWN(va+size-1)]`. Remapping a present PTE is fatal (`Remap`).
    pub fn map_range(
        &mut self,
        pid: ProcessId,
        va: u32,
        size: u32,
        pa: u32,
        perm: PteFlags,
        mode: MapMode,
    ) -> PagingResult<()> {
        if size == 0 {
            return Ok(());
        }
        let start = pground_down(va);
        let end = pground_down(va + size - 1);
        let mut a = start;
        let mut pa_cursor = pa;
        loop {
            let (pdx_v, ptx_v) = {
                let proc = self
                    .processes
                    .get_mut(pid)
                    .ok_or(PagingError::UnknownProcess)?;
                proc.pgdir.walk(a, true)?
            };
            let handle = PteHandle::new(pid, pdx_v, ptx_v);
            if self.pte(handle)?.present() {
                return Err(PagingError::Remap);
            }
            let new_pte = match mode {
                MapMode::Plain | MapMode::Tracked => Pte::new_present(pa_cursor, perm),
                MapMode::SwapPlaceholder => Pte::new_placeholder(pa_cursor, perm),
            };
            self.set_pte(handle, new_pte)?;
            if mode == MapMode::Tracked {
                self.reverse_map.inc(pa_cursor, handle)?;
            }
            if a == end {
                break;
            }
            a += PGSIZE as u32;
            pa_cursor += PGSIZE as u32;
        }
        Ok(())
    }

    /// Builds the kernel half of `pid`'s page table from the fixed mapping
    /// table (§4.4, §2b). Called once at process creation.
    pub fn setup_kernel_vm(&mut self, pid: ProcessId) -> PagingResult<()> {
        for m in KERNEL_MAPPINGS {
            self.map_range(pid, m.va, m.size, m.pa, m.perm, MapMode::Plain)?;
        }
        Ok(())
    }

    /// `swapout_commit(f, s)` (§4.2): rewrites every sharer of `f` to point
    /// at slot `s`, moves the sharer list from the reverse map to the swap
    /// table, and clears the frame's reverse-map entry. The caller is
    /// responsible for writing the frame's contents to disk first.
    pub fn swapout_commit(&mut self, frame: u32, slot: usize) -> PagingResult<()> {
        let refs: Vec<PteHandle> = self.reverse_map.refs_of(frame).to_vec();
        let disk_base = self.swap_table.disk_base(slot);
        for &h in &refs {
            let old = self.pte(h)?;
            self.set_pte(h, Pte::new_swapped(disk_base, old.flags()))?;
        }
        self.swap_table.install_many(slot, refs);
        self.reverse_map.clear(frame);
        Ok(())
    }

    /// `swapin_commit(f_new, s)` (§4.2): the whole `refs(s)` list is
    /// rewritten to point at `f_new` before returning, so no sharer can
    /// observe a freed slot mid-transition (§9 "COW + swap interaction").
    pub fn swapin_commit(&mut self, frame: u32, slot: usize) -> PagingResult<()> {
        let refs = self.swap_table.take_all(slot);
        for &h in &refs {
            let old = self.pte(h)?;
            self.set_pte(h, Pte::new_present(frame, old.flags()))?;
            self.reverse_map.inc(frame, h)?;
        }
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
    fn map_range_tracked_installs_pte_and_increments_reverse_map() {
        let mut k = kernel();
        let pid = k.processes.alloc(None).unwrap();
        let frame = k.frames.allocate().unwrap();
        k.map_range(pid, 0x2000, PGSIZE as u32, frame, PteFlags::WRITABLE | PteFlags::USER, MapMode::Tracked)
            .unwrap();
        assert_eq!(k.reverse_map.count(frame), 1);
        let (d, t) = (crate::pte::pdx(0x2000), crate::pte::ptx(0x2000));
        let pte = k.pte(PteHandle::new(pid, d, t)).unwrap();
        assert!(pte.present());
        assert!(pte.writable());
    }

    #[test]
    fn map_range_twice_over_the_same_va_is_remap_error() {
        let mut k = kernel();
        let pid = k.processes.alloc(None).unwrap();
        let frame = k.frames.allocate().unwrap();
        k.map_range(pid, 0x2000, PGSIZE as u32, frame, PteFlags::WRITABLE, MapMode::Tracked)
            .unwrap();
        let frame2 = k.frames.allocate().unwrap();
        assert_eq!(
            k.map_range(pid, 0x2000, PGSIZE as u32, frame2, PteFlags::WRITABLE, MapMode::Tracked),
            Err(PagingError::Remap)
        );
    }

    #[test]
    fn swapout_then_swapin_restores_every_sharer_as_present() {
        let mut k = kernel();
        let a = k.processes.alloc(None).unwrap();
        let b = k.processes.alloc(None).unwrap();
        let frame = k.frames.allocate().unwrap();
        k.map_range(a, 0x3000, PGSIZE as u32, frame, PteFlags::USER, MapMode::Tracked)
            .unwrap();
        k.map_range(b, 0x3000, PGSIZE as u32, frame, PteFlags::USER, MapMode::Tracked)
            .unwrap();
        assert_eq!(k.reverse_map.count(frame), 2);

        let slot = k.swap_table.allocate_free_slot().unwrap();
        k.swapout_commit(frame, slot).unwrap();
        assert_eq!(k.reverse_map.count(frame), 0);
        assert_eq!(k.swap_table.refcount(slot), 2);

        let new_frame = k.frames.allocate().unwrap();
        k.swapin_commit(new_frame, slot).unwrap();
        assert!(k.swap_table.is_free(slot));
        assert_eq!(k.reverse_map.count(new_frame), 2);

        let ha = PteHandle::new(a, crate::pte::pdx(0x3000), crate::pte::ptx(0x3000));
        let hb = PteHandle::new(b, crate::pte::pdx(0x3000), crate::pte::ptx(0x3000));
        assert!(k.pte(ha).unwrap().present());
        assert!(k.pte(hb).unwrap().present());
    }

    #[test]
    fn setup_kernel_vm_installs_plain_mappings_without_reverse_map_entries() {
        let mut k = kernel();
        let pid = k.processes.alloc(None).unwrap();
        k.setup_kernel_vm(pid).unwrap();
        let pte = k.pte(PteHandle::new(pid, crate::pte::pdx(KERNBASE), crate::pte::ptx(KERNBASE)))
            .unwrap();
        assert!(pte.present());
        assert_eq!(k.reverse_map.count(KERNBASE), 0);
    }
}
