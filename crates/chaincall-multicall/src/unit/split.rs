//! Partitioning of a batch snapshot into static / mutable groups and chunks.

use chaincall_core::{CallDescriptor, CallMutability, TagKey};

/// One queued entry of a batch snapshot.
pub(crate) type Entry = (TagKey, CallDescriptor);

/// The two mutability groups of a snapshot, each in add-order.
#[derive(Debug, Default)]
pub(crate) struct SplitCalls {
    pub statics: Vec<Entry>,
    pub mutables: Vec<Entry>,
}

/// Partition `entries` by mutability. `force` routes everything to one group.
pub(crate) fn split_calls(entries: Vec<Entry>, force: Option<CallMutability>) -> SplitCalls {
    let mut split = SplitCalls::default();
    for entry in entries {
        let mutability = force.unwrap_or_else(|| entry.1.mutability());
        match mutability {
            CallMutability::Static => split.statics.push(entry),
            CallMutability::Mutable => split.mutables.push(entry),
        }
    }
    split
}

/// Contiguous chunks of at most `size` entries. A zero size is treated as one.
pub(crate) fn chunk(entries: &[Entry], size: usize) -> std::slice::Chunks<'_, Entry> {
    entries.chunks(size.max(1))
}
