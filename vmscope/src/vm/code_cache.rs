//! PC-to-blob resolution over the VM's code heap
//!
//! The code heap is a committed [`VirtualSpace`] carved into fixed-size
//! segments, with a parallel segment map holding one byte per segment: `0`
//! marks a block start, a positive byte is the backward distance (in
//! segments) to the block start, and the free marker means the segment is
//! unmapped. [`CodeHeap::find_blob`] walks that encoding backward from the
//! PC's segment.
//!
//! The VM compiles, moves and frees blobs concurrently with these lookups,
//! without any coordination. Every read here may observe a stale or torn
//! value, so every index is validated before it is dereferenced and every
//! inconsistent outcome degrades to `None` rather than to a wild read. The
//! walk is bounded by the heap's total segment count, so a corrupted or
//! mid-update map can never produce an unbounded scan.

#![allow(unsafe_code)] // the locator dereferences validated code-heap addresses

use super::offsets::VmStructs;
use super::reader::read_at;
use super::views::VirtualSpace;

/// Largest plausible log2 segment size; a bigger shift means the heap
/// descriptor was read mid-update.
const MAX_LOG2_SEGMENT_SIZE: i32 = 30;

/// One allocated unit in the code heap: a compiled method or runtime stub.
#[derive(Clone, Copy)]
pub struct CodeBlob<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> CodeBlob<'a> {
    /// # Safety
    /// `base` must point at a live `CodeBlob` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.base
    }

    /// Best-effort diagnostic name pointer; may be stale or unterminated if
    /// the blob is concurrently unloaded.
    #[must_use]
    pub fn name(&self) -> *const u8 {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.blob_name_offset) }
    }

    #[must_use]
    pub fn size(&self) -> i32 {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.blob_size_offset) }
    }

    /// Stack bytes used by this blob's calling convention, consumed by an
    /// external unwinder.
    #[must_use]
    pub fn frame_size(&self) -> i32 {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.blob_frame_size_offset) }
    }

    /// Whether `pc` falls inside the blob's declared extent. False for a
    /// non-positive size, which can be observed mid-update.
    #[must_use]
    pub fn contains(&self, pc: usize) -> bool {
        let size = self.size();
        size > 0 && pc >= self.base && pc < self.base + size as usize
    }
}

/// The code heap descriptor: committed memory, the parallel segment map and
/// the segment size shift.
#[derive(Clone, Copy)]
pub struct CodeHeap<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> CodeHeap<'a> {
    /// # Safety
    /// `base` must point at a live `CodeHeap` descriptor in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    /// The heap's committed memory region (embedded in the descriptor).
    #[must_use]
    pub fn memory(&self) -> VirtualSpace<'a> {
        // SAFETY: the space is embedded in the descriptor the constructor
        // vouched for.
        unsafe { VirtualSpace::new(self.vm, self.base + self.vm.heap_memory_offset) }
    }

    /// The segment map region, one byte per heap segment.
    #[must_use]
    pub fn segmap(&self) -> VirtualSpace<'a> {
        // SAFETY: as for `memory`.
        unsafe { VirtualSpace::new(self.vm, self.base + self.vm.heap_segmap_offset) }
    }

    #[must_use]
    pub fn log2_segment_size(&self) -> i32 {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.heap_log2_segment_size_offset) }
    }

    /// Locate the blob containing `pc`, or `None` if `pc` is not in the heap,
    /// maps to a free segment, or the bookkeeping is transiently inconsistent.
    #[must_use]
    pub fn find_blob(&self, pc: usize) -> Option<CodeBlob<'a>> {
        let memory = self.memory();
        if !memory.contains(pc) {
            return None;
        }

        let log2 = self.log2_segment_size();
        if !(0..=MAX_LOG2_SEGMENT_SIZE).contains(&log2) {
            return None;
        }
        let shift = log2 as u32;

        let segmap = self.segmap();
        let map_base = segmap.low();
        let map_high = segmap.high();
        if map_base == 0 || map_high <= map_base {
            return None;
        }
        // One map byte per segment, so the committed map extent is the
        // segment count and bounds every map access below.
        let segment_count = map_high - map_base;

        let mem_low = memory.low();
        let mut index = pc.checked_sub(mem_low)? >> shift;
        if index >= segment_count {
            return None;
        }

        loop {
            // SAFETY: `index < segment_count`, so the read stays inside the
            // committed segment map.
            let b = unsafe { read_at::<u8>(map_base, index) };
            if b == self.vm.segment_free_marker {
                return None;
            }
            if b == 0 {
                break;
            }
            // Distances strictly decrease the index, so the walk cannot
            // cycle; an underflow means the map was caught mid-update.
            index = index.checked_sub(b as usize)?;
        }

        let block = mem_low + (index << shift);
        // SAFETY: `block` lies inside the committed heap memory checked above.
        let used = unsafe { read_at::<u8>(block, self.vm.heap_block_used_offset) };
        if used == 0 {
            // The map still points at a freed block: a detectable race.
            return None;
        }

        // SAFETY: blob data starts right after the block header inside the
        // committed heap.
        Some(unsafe { CodeBlob::new(self.vm, block + self.vm.block_header_size) })
    }
}

/// Top-level entry point over the VM's code heap.
pub struct CodeCache;

impl CodeCache {
    /// Resolve `pc` against the process-wide offset table, or `None` when the
    /// table is unavailable.
    #[must_use]
    pub fn find_blob(pc: usize) -> Option<CodeBlob<'static>> {
        VmStructs::get().and_then(|vm| Self::find_blob_in(vm, pc))
    }

    /// Resolve `pc` to its blob, rejecting any blob whose declared extent
    /// does not actually cover `pc` (the segment map and the blob's own size
    /// field can be momentarily inconsistent).
    #[must_use]
    pub fn find_blob_in(vm: &VmStructs, pc: usize) -> Option<CodeBlob<'_>> {
        if vm.code_cache_heap == 0 {
            return None;
        }
        // SAFETY: the heap descriptor address was read from the VM's own
        // static during init.
        let heap = unsafe { CodeHeap::new(vm, vm.code_cache_heap) };
        let blob = heap.find_blob(pc)?;
        blob.contains(pc).then_some(blob)
    }
}
