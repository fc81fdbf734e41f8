//! Compile-time geometry constants.
//!
//! The original source hardcodes these inline; pulling them into one module
//! lets an embedding kernel override them per board without touching core
//! logic (SPEC_FULL.md §2a).

/// Page size in bytes (x86 4 KiB pages).
pub const PGSIZE: usize = 4096;
/// log2(PGSIZE), used to shift frame/block numbers in and out of a PTE.
pub const PAGESHIFT: u32 = 12;
/// Disk sector size.
pub const BSIZE: usize = 512;
/// Blocks occupied by one swapped-out page.
pub const BLOCKS_PER_SLOT: usize = PGSIZE / BSIZE;
/// First block used for swap storage; blocks 0 and 1 are reserved (boot block
/// and superblock), matching the original source's `2 + i*PGSIZE/BSIZE` layout.
pub const SWAP_START_BLOCK: u32 = 2;
/// Total blocks set aside for the swap device.
pub const SWAPBLOCKS: usize = 4096;
/// Number of swap slots derivable from `SWAPBLOCKS`.
pub const NSLOTS: usize = SWAPBLOCKS / BLOCKS_PER_SLOT;

/// Maximum processes; also the default reverse-map free-list size hint.
pub const NPROC: usize = 64;
/// Maximum sharers of a single frame before `ReverseMap::inc` refuses the
/// insertion. Chosen (per the original source) to exceed `NPROC`.
pub const MAX_FRAME_REFS: usize = 64;

/// Default number of physical frames the reference `BitmapFrameAllocator`
/// manages when no memory map is supplied by the embedding kernel.
pub const DEFAULT_NFRAMES: usize = 4096;

/// Kernel/user split, mirrored from xv6's `KERNBASE`. `freevm` tears down the
/// range `[0, KERNBASE)`.
pub const KERNBASE: u32 = 0x8000_0000;
