//! Page-table storage and the walker primitive (C3).
//!
//! Grounded on `memory/paging.rs`'s `map_page`/`create_mapping`, generalized
//! to the spec's bit-exact 32-bit two-level scheme instead of the teacher's
//! native 4-level `x86_64` tables (see DESIGN.md). `map_range` itself lives
//! on `PagingKernel` (`kernel.rs`) since installing a Tracked mapping needs
//! the reverse map alongside the page directory; this module only owns the
//! directory's storage and the `walk` primitive (§4.3).

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{PagingError, PagingResult};
use crate::pte::{pdx, ptx, Pte};

/// One of the three ways `map_range` installs a mapping (§4.3). Replaces the
/// original source's `var1*var2` call-site trick (§9 Design Note) with an
/// explicit enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// `pa | perm | PRESENT`, no reverse-map side effect. Used for the
    /// kernel's own fixed mapping table (§2b).
    Plain,
    /// `pa | perm | PRESENT`, plus `ReverseMap::inc` for the installed PTE.
    /// Used for user pages.
    Tracked,
    /// `pa | perm`, `PRESENT` cleared, no reverse-map side effect; the
    /// caller separately attaches the PTE to a swap slot.
    SwapPlaceholder,
}

/// A process's page directory: 1024 second-level page tables, each lazily
/// allocated on first `walk(.., alloc = true)`. Each populated entry is
/// exactly one `PGSIZE` page's worth of `Pte`s (1024 * 4 bytes), mirroring
/// real page-table geometry even though this model never gives the
/// directory itself a physical frame.
pub struct PageDirectory {
    tables: Vec<Option<Box<[Pte; 1024]>>>,
}

impl PageDirectory {
    pub fn new() -> Self {
        let mut tables = Vec::with_capacity(1024);
        for _ in 0..1024 {
            tables.push(None);
        }
        Self { tables }
    }

    /// Resolves `va` to a `(pdx, ptx)` pair, allocating the intermediate
    /// page table if `alloc` and it is missing. Fails softly with
    /// `WalkFailed` when not allocating and the intermediate is absent
    /// (§4.3: "fails softly (null) when not allocating").
    pub fn walk(&mut self, va: u32, alloc: bool) -> PagingResult<(u16, u16)> {
        let d = pdx(va);
        let t = ptx(va);
        if self.tables[d as usize].is_none() {
            if !alloc {
                return Err(PagingError::WalkFailed);
            }
            self.tables[d as usize] = Some(Box::new([Pte::zero(); 1024]));
        }
        Ok((d, t))
    }

    pub fn table_exists(&self, pdx: u16) -> bool {
        self.tables[pdx as usize].is_some()
    }

    pub fn free_table(&mut self, pdx: u16) {
        self.tables[pdx as usize] = None;
    }

    pub fn pte(&self, pdx: u16, ptx: u16) -> Pte {
        self.tables[pdx as usize]
            .as_ref()
            .map(|t| t[ptx as usize])
            .unwrap_or(Pte::zero())
    }

    pub fn set_pte(&mut self, pdx: u16, ptx: u16, value: Pte) {
        if let Some(t) = self.tables[pdx as usize].as_mut() {
            t[ptx as usize] = value;
        }
    }

    /// Direct walk-and-read convenience used by fault handling, which
    /// never allocates (§4.5 step 1).
    pub fn lookup(&self, va: u32) -> Option<Pte> {
        let d = pdx(va);
        if !self.table_exists(d) {
            return None;
        }
        Some(self.pte(d, ptx(va)))
    }
}

impl Default for PageDirectory {
    fn default() -> Self {
        Self::new()
    }
}
