//! Global integration point, mirroring the teacher's own
//! `lazy_static! Mutex<Option<..>>` convention (`DEMAND_PAGING`,
//! `PROCESS_MANAGER`, `FRAME_ALLOCATOR` in `memory/demand_paging.rs` /
//! `process/mod.rs` / `memory/frame_allocator.rs`).
//!
//! `PagingKernel` itself is generic and takes no lock internally (§5); this
//! module is a thin convenience wrapper for embedding kernels that want a
//! single process-wide instance behind one lock, exactly like the teacher.

use lazy_static::lazy_static;
use spin::Mutex;

use crate::disk::InMemorySwapDisk;
use crate::frame::BitmapFrameAllocator;
use crate::kernel::PagingKernel;

lazy_static! {
    /// Not populated automatically — an embedding kernel calls
    /// [`init`] once during boot with its real frame allocator and swap
    /// device, the same way the teacher's `init_demand_paging()` /
    /// `init_frame_allocator()` populate their own globals.
    pub static ref PAGING: Mutex<Option<PagingKernel<BitmapFrameAllocator, InMemorySwapDisk>>> =
        Mutex::new(None);
}

/// Installs the global paging kernel. Intended to be called exactly once,
/// early in boot, before any process touches user memory.
pub fn init(frames: BitmapFrameAllocator, disk: InMemorySwapDisk) {
    *PAGING.lock() = Some(PagingKernel::new(frames, disk));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NFRAMES;

    #[test]
    fn init_populates_the_global_slot() {
        let frames = BitmapFrameAllocator::new(0, DEFAULT_NFRAMES);
        let disk = InMemorySwapDisk::new(2, 8, 16);
        init(frames, disk);
        assert!(PAGING.lock().is_some());
    }
}
