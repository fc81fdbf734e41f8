use core::fmt;

/// Every fatal or retryable condition named by the spec, unified into one
/// type so logging and call sites share a single vocabulary (teacher's
/// `memory::MemoryError` is the closest analogue — this crate follows the
/// same "return it, never panic in library code" convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// No free frame; the caller should invoke the replacer and retry.
    Oom,
    /// Every swap slot is in use. Retryable after a yield by the caller.
    SwapFull,
    /// Attempted to install a PTE over one that is already present.
    Remap,
    /// A parent PTE in `copyuvm` (or a faulted PTE in the COW path) is
    /// neither present nor swapped.
    MissingPte,
    /// `ReverseMap::dec` was asked to remove a PTE handle that isn't in the
    /// frame's sharer list.
    ReverseMapNotFound,
    /// A COW fault arrived for a PTE whose `WRITABLE` bit is already set.
    IllegalWriteOnWritable,
    /// `walk` was asked to resolve a PTE without `alloc` and the
    /// intermediate page table doesn't exist.
    WalkFailed,
    /// A frame's sharer list is already at `MAX_FRAME_REFS`.
    FrameRefsFull,
    /// A swap block doesn't correspond to any known slot.
    UnknownSlot,
    /// A `ProcessId` doesn't name a live process.
    UnknownProcess,
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PagingError::Oom => "out of physical frames",
            PagingError::SwapFull => "swap device full",
            PagingError::Remap => "remap of an already-present PTE",
            PagingError::MissingPte => "PTE neither present nor swapped",
            PagingError::ReverseMapNotFound => "PTE handle not found in reverse map",
            PagingError::IllegalWriteOnWritable => "COW fault on an already-writable PTE",
            PagingError::WalkFailed => "page table walk failed without alloc",
            PagingError::FrameRefsFull => "frame sharer list is full",
            PagingError::UnknownSlot => "swap block does not name a slot",
            PagingError::UnknownProcess => "unknown process id",
        };
        f.write_str(msg)
    }
}

pub type PagingResult<T> = Result<T, PagingError>;
