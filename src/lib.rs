//! Demand-paging core for a teaching kernel.
//!
//! Tracks which physical frames back which virtual pages, implements
//! copy-on-write fork, and swaps pages to and from a fixed on-disk area
//! under memory pressure. The scheduler, trap dispatch, block-device
//! driver, and kernel heap allocator are all external collaborators
//! (`FrameAllocator`, `SwapDisk`) rather than something this crate owns.
//!
//! `no_std` in production; compiles against `std` under `cfg(test)` so the
//! unit suite runs on a host with no kernel underneath it (pattern grounded
//! in the retrieval pack's `sunsided-os` `kernel-vmem` crate root).
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod address_space;
pub mod config;
pub mod disk;
pub mod error;
pub mod fault;
pub mod frame;
pub mod global;
pub mod kernel;
pub mod log;
pub mod pagetable;
pub mod process;
pub mod pte;
pub mod replacer;
pub mod reverse_map;
pub mod rss;
pub mod swap_table;

pub use config::{PGSIZE, PAGESHIFT};
pub use disk::{InMemorySwapDisk, SwapDisk};
pub use error::{PagingError, PagingResult};
pub use frame::{BitmapFrameAllocator, FrameAllocator};
pub use kernel::PagingKernel;
pub use pagetable::{MapMode, PageDirectory};
pub use process::{Process, ProcessId, ProcessState, ProcessTable};
pub use pte::{Pte, PteFlags, PteHandle};
pub use reverse_map::ReverseMap;
pub use swap_table::SwapTable;
