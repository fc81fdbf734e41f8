//! PTE encoding and the address-splitting helpers from SPEC_FULL.md §6.
//!
//! Bit-exact to the spec's xv6-style 32-bit two-level scheme, not to the
//! teacher's native 4-level 64-bit `x86_64::structures::paging` types (see
//! DESIGN.md for why those were dropped). The `bitflags`-defined flag type
//! mirrors both the teacher's use of the `bitflags` crate and the
//! `sunsided-os` `kernel-vmem` crate's own paging `Flags` type.

use crate::config::PAGESHIFT;
use crate::process::ProcessId;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        /// Mapping is live.
        const PRESENT  = 0x001;
        /// Writes permitted.
        const WRITABLE = 0x002;
        /// User-mode accessible.
        const USER     = 0x004;
        /// Set by hardware on any access; cleared by the replacer's aging sweep.
        const ACCESSED = 0x020;
        /// OS-defined AVL bit: mapping is on swap rather than in memory.
        const SWAPPED  = 0x200;
    }
}

/// A 32-bit page-table entry.
///
/// Encodes either `(frame_addr | flags)` with `PRESENT` set, or
/// `(block_addr | flags)` with `SWAPPED` set and `PRESENT` clear. Never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Pte(pub u32);

impl Pte {
    pub const fn zero() -> Self {
        Pte(0)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `PTE_ADDR(e) := e & ~0xFFF`.
    pub fn addr(self) -> u32 {
        self.0 & !0xFFF
    }

    /// `PTE_FLAGS(e) := e & 0xFFF`.
    pub fn flags(self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0 & 0xFFF)
    }

    pub fn present(self) -> bool {
        self.flags().contains(PteFlags::PRESENT)
    }

    pub fn swapped(self) -> bool {
        self.flags().contains(PteFlags::SWAPPED)
    }

    pub fn writable(self) -> bool {
        self.flags().contains(PteFlags::WRITABLE)
    }

    pub fn user(self) -> bool {
        self.flags().contains(PteFlags::USER)
    }

    pub fn accessed(self) -> bool {
        self.flags().contains(PteFlags::ACCESSED)
    }

    /// Page-aligned physical frame address of a present PTE.
    pub fn frame_addr(self) -> u32 {
        self.addr()
    }

    /// Disk block number of a swapped PTE (`*pte >> PAGESHIFT`).
    pub fn block(self) -> u32 {
        self.addr() >> PAGESHIFT
    }

    pub fn new_present(frame_addr: u32, flags: PteFlags) -> Self {
        let encoded_flags = (flags | PteFlags::PRESENT) & !PteFlags::SWAPPED;
        Pte((frame_addr & !0xFFF) | encoded_flags.bits())
    }

    /// Encodes `block` the way `swapout_commit` does:
    /// `(disk_base(s) << PAGESHIFT) | (flags | SWAPPED) & ~PRESENT`.
    pub fn new_swapped(block: u32, flags: PteFlags) -> Self {
        let encoded_flags = (flags | PteFlags::SWAPPED) & !PteFlags::PRESENT;
        Pte((block << PAGESHIFT) | encoded_flags.bits())
    }

    /// Swap-placeholder mapping: `pa | perm` with `PRESENT` cleared (§4.3).
    /// Callers installing a child's attached-to-swap PTE pass `flags`
    /// already carrying `SWAPPED` (copied from the parent's swapped PTE),
    /// which this constructor preserves rather than stripping.
    pub fn new_placeholder(addr: u32, flags: PteFlags) -> Self {
        let encoded_flags = flags & !PteFlags::PRESENT;
        Pte((addr & !0xFFF) | encoded_flags.bits())
    }

    pub fn with_flags(self, flags: PteFlags) -> Self {
        Pte(self.addr() | flags.bits())
    }
}

/// `PDX(va) := (va >> 22) & 0x3FF`.
pub fn pdx(va: u32) -> u16 {
    ((va >> 22) & 0x3FF) as u16
}

/// `PTX(va) := (va >> 12) & 0x3FF`.
pub fn ptx(va: u32) -> u16 {
    ((va >> 12) & 0x3FF) as u16
}

pub fn pground_down(va: u32) -> u32 {
    va & !0xFFF
}

pub fn pground_up(va: u32) -> u32 {
    (va.wrapping_add(0xFFF)) & !0xFFF
}

/// Index of the frame array slot backing a page-aligned physical address.
pub fn frame_index(addr: u32) -> usize {
    (addr >> PAGESHIFT) as usize
}

/// Stand-in for a raw PTE pointer (DESIGN.md / SPEC_FULL.md §9): an arena
/// index into a process's page directory rather than a reference, so the
/// reverse map and swap table can hold these across mutations without
/// fighting the borrow checker or modelling unsafe aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PteHandle {
    pub pgdir: ProcessId,
    pub pdx: u16,
    pub ptx: u16,
}

impl PteHandle {
    pub fn new(pgdir: ProcessId, pdx: u16, ptx: u16) -> Self {
        Self { pgdir, pdx, ptx }
    }

    pub fn va(self) -> u32 {
        ((self.pdx as u32) << 22) | ((self.ptx as u32) << 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdx_ptx_split_round_trips() {
        let va = 0x1234_5000u32;
        let p = PteHandle::new(ProcessId(0), pdx(va), ptx(va));
        assert_eq!(pground_down(p.va()), pground_down(va));
    }

    #[test]
    fn present_pte_round_trips_addr_and_flags() {
        let pte = Pte::new_present(0x0020_0000, PteFlags::WRITABLE | PteFlags::USER);
        assert!(pte.present());
        assert!(pte.writable());
        assert!(pte.user());
        assert!(!pte.swapped());
        assert_eq!(pte.frame_addr(), 0x0020_0000);
    }

    #[test]
    fn swapped_pte_encodes_block_and_clears_present() {
        let pte = Pte::new_swapped(7, PteFlags::WRITABLE | PteFlags::USER);
        assert!(pte.swapped());
        assert!(!pte.present());
        assert_eq!(pte.block(), 7);
        assert!(pte.user());
    }

    #[test]
    fn pte_never_both_present_and_swapped() {
        let a = Pte::new_present(0x1000, PteFlags::empty());
        let b = Pte::new_swapped(1, PteFlags::empty());
        assert!(!(a.present() && a.swapped()));
        assert!(!(b.present() && b.swapped()));
    }
}
