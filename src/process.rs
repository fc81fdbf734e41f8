//! Process lifecycle hooks (C8), trimmed to the paging-relevant fields.
//!
//! Grounded on `process/pcb.rs::ProcessControlBlock` and
//! `process/mod.rs::ProcessManager`, but dropping everything not named by
//! §3/§4.8: no CPU context, no file descriptors, no scheduler run-queue
//! links. Those live in the teacher's full PCB; this crate only needs what
//! `growproc`/`fork`/`exit`/`wait` touch.

use alloc::vec::Vec;

use crate::config::NPROC;
use crate::pagetable::PageDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

/// Mirrors xv6's `enum procstate`, minus the scheduler-only `SLEEPING`/
/// `RUNNING` distinction (out of scope, §1/§5 — the scheduler itself is an
/// external collaborator here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Embryo,
    Runnable,
    Zombie,
}

/// The paging-relevant slice of a process control block (§3 "Process").
pub struct Process {
    pub pid: ProcessId,
    pub parent: Option<ProcessId>,
    pub state: ProcessState,
    /// Current user-virtual upper bound; not necessarily page-aligned.
    pub size: u32,
    /// `PGSIZE` times the number of `PRESENT` PTEs this process owns.
    pub rss: u32,
    pub pgdir: PageDirectory,
}

impl Process {
    fn embryo(pid: ProcessId, parent: Option<ProcessId>) -> Self {
        Self {
            pid,
            parent,
            state: ProcessState::Embryo,
            size: 0,
            rss: 0,
            pgdir: PageDirectory::new(),
        }
    }
}

/// Fixed-size process table, `NPROC` slots, linear-scanned for the first
/// `Unused` entry on allocation — same shape as the teacher's `ptable.proc`
/// array, minus its run-queue bookkeeping.
pub struct ProcessTable {
    slots: Vec<Option<Process>>,
    next_pid: u32,
}

impl ProcessTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(NPROC);
        for _ in 0..NPROC {
            slots.push(None);
        }
        Self { slots, next_pid: 1 }
    }

    /// Allocates an `EMBRYO` slot. `None` if the table is full.
    pub fn alloc(&mut self, parent: Option<ProcessId>) -> Option<ProcessId> {
        let idx = self.slots.iter().position(|s| s.is_none())?;
        let pid = ProcessId(self.next_pid);
        self.next_pid += 1;
        self.slots[idx] = Some(Process::embryo(pid, parent));
        Some(pid)
    }

    pub fn get(&self, pid: ProcessId) -> Option<&Process> {
        self.slots.iter().flatten().find(|p| p.pid == pid)
    }

    pub fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Process> {
        self.slots.iter_mut().flatten().find(|p| p.pid == pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.slots.iter_mut().flatten()
    }

    /// Recycles a `ZOMBIE` slot back to `Unused` after `wait()` has already
    /// torn down its address space via `freevm`.
    pub fn reap(&mut self, pid: ProcessId) {
        if let Some(slot) = self.slots.iter_mut().find(|s| matches!(s, Some(p) if p.pid == pid)) {
            *slot = None;
        }
    }

    /// §4.6 victim-process selection: maximum `rss`, ties broken by
    /// smallest `pid`. Processes with `rss == 0` never win.
    pub fn select_victim_process(&self) -> Option<ProcessId> {
        self.iter()
            .filter(|p| p.rss > 0)
            .max_by(|a, b| a.rss.cmp(&b.rss).then(b.pid.0.cmp(&a.pid.0)))
            .map(|p| p.pid)
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

use crate::disk::SwapDisk;
use crate::error::{PagingError, PagingResult};
use crate::frame::FrameAllocator;
use crate::kernel::PagingKernel;

impl<FA: FrameAllocator, SD: SwapDisk> PagingKernel<FA, SD> {
    /// `growproc(n)` (§4.8): `n > 0` grows via `allocuvm`, `n < 0` shrinks
    /// via `deallocuvm`. Either way `size` is updated to match. TLB refresh
    /// is out of scope (owned by the trap/scheduler layer, §1).
    pub fn growproc(&mut self, pid: ProcessId, n: i32) -> PagingResult<()> {
        let old = self
            .processes
            .get(pid)
            .ok_or(PagingError::UnknownProcess)?
            .size;
        let new = (old as i64 + n as i64) as u32;
        if n > 0 {
            self.allocuvm(pid, old, new)?;
        } else if n < 0 {
            self.deallocuvm(pid, old, new)?;
        }
        self.processes.get_mut(pid).unwrap().size = new;
        Ok(())
    }

    /// `fork()` (§4.8): allocates a child embryo, gives it the kernel
    /// mappings, then COW-clones the parent's user space into it. Process
    /// bookkeeping this crate doesn't model (open files, cwd, trapframe,
    /// `tf` copy — out of scope, §1) is the caller's responsibility; this
    /// only performs the paging-relevant half of `fork`.
    pub fn fork(&mut self, parent: ProcessId) -> PagingResult<ProcessId> {
        let parent_size = self
            .processes
            .get(parent)
            .ok_or(PagingError::UnknownProcess)?
            .size;
        let child = self
            .processes
            .alloc(Some(parent))
            .ok_or(PagingError::Oom)?;
        self.setup_kernel_vm(child)?;
        self.copyuvm(parent, parent_size, child)?;
        let child_proc = self.processes.get_mut(child).unwrap();
        child_proc.size = parent_size;
        child_proc.state = ProcessState::Runnable;
        Ok(child)
    }

    /// `exit()` (§4.8): the page directory is left alive for `wait` to
    /// reclaim; only the state transition happens here.
    pub fn exit(&mut self, pid: ProcessId) -> PagingResult<()> {
        let proc = self
            .processes
            .get_mut(pid)
            .ok_or(PagingError::UnknownProcess)?;
        proc.state = ProcessState::Zombie;
        Ok(())
    }

    /// `wait()` (§4.8): reclaims the first `ZOMBIE` child of `parent` via
    /// `freevm`, then recycles its process-table slot.
    pub fn wait(&mut self, parent: ProcessId) -> PagingResult<Option<ProcessId>> {
        let zombie = self
            .processes
            .iter()
            .find(|p| p.parent == Some(parent) && p.state == ProcessState::Zombie)
            .map(|p| p.pid);
        match zombie {
            Some(child) => {
                self.freevm(child)?;
                self.processes.reap(child);
                Ok(Some(child))
            }
            None => Ok(None),
        }
    }
}
