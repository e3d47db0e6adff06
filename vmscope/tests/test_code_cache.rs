//! PC-to-blob resolution against a synthetic code heap
//!
//! The fixtures build a real code heap descriptor, memory region and segment
//! map in test-owned buffers, so the locator runs against genuine addresses.

#![allow(unsafe_code)] // fixtures hand raw buffer addresses to the views under test

mod common;

use common::{
    test_structs, write_i32, write_word, BLOCK_HEADER_SIZE, BLOCK_USED, BLOB_FRAME_SIZE,
    BLOB_NAME, BLOB_SIZE, HEAP_DESCRIPTOR_SIZE, HEAP_LOG2, HEAP_MEMORY, HEAP_SEGMAP,
    VS_HIGH, VS_HIGH_BOUNDARY, VS_LOW, VS_LOW_BOUNDARY,
};
use vmscope::vm::{CodeCache, CodeHeap, VmStructs};

const LOG2_SEG: i32 = 6;
const SEG: usize = 1 << 6; // 64-byte segments keep the fixture small
const SEG_COUNT: usize = 64;

/// A code heap laid out in test-owned buffers, with every segment initially
/// free.
struct FakeCodeHeap {
    vm: VmStructs,
    descriptor: Vec<u8>,
    memory: Vec<u8>,
    segmap: Vec<u8>,
}

impl FakeCodeHeap {
    fn new() -> Self {
        let memory = vec![0u8; SEG_COUNT * SEG];
        let segmap = vec![0xFFu8; SEG_COUNT];
        let mut descriptor = vec![0u8; HEAP_DESCRIPTOR_SIZE];

        let mem_low = memory.as_ptr() as usize;
        let mem_high = mem_low + memory.len();
        write_word(&mut descriptor, HEAP_MEMORY + VS_LOW_BOUNDARY, mem_low);
        write_word(&mut descriptor, HEAP_MEMORY + VS_HIGH_BOUNDARY, mem_high);
        write_word(&mut descriptor, HEAP_MEMORY + VS_LOW, mem_low);
        write_word(&mut descriptor, HEAP_MEMORY + VS_HIGH, mem_high);

        let map_low = segmap.as_ptr() as usize;
        let map_high = map_low + segmap.len();
        write_word(&mut descriptor, HEAP_SEGMAP + VS_LOW_BOUNDARY, map_low);
        write_word(&mut descriptor, HEAP_SEGMAP + VS_HIGH_BOUNDARY, map_high);
        write_word(&mut descriptor, HEAP_SEGMAP + VS_LOW, map_low);
        write_word(&mut descriptor, HEAP_SEGMAP + VS_HIGH, map_high);

        write_i32(&mut descriptor, HEAP_LOG2, LOG2_SEG);

        let mut vm = test_structs();
        vm.code_cache_heap = descriptor.as_ptr() as usize;

        Self { vm, descriptor, memory, segmap }
    }

    fn mem_low(&self) -> usize {
        self.memory.as_ptr() as usize
    }

    fn mem_high(&self) -> usize {
        self.mem_low() + self.memory.len()
    }

    /// Address of the first byte of segment `index`.
    fn segment_addr(&self, index: usize) -> usize {
        self.mem_low() + index * SEG
    }

    /// Lay out a block covering segments `[start, start + len)` with the
    /// standard ascending-distance map encoding, and a blob of `blob_size`
    /// bytes behind the block header.
    fn add_block(&mut self, start: usize, len: usize, blob_size: i32, frame_size: i32, used: bool) -> usize {
        for j in 0..len {
            self.segmap[start + j] = u8::try_from(j).unwrap();
        }
        let rel = start * SEG;
        self.memory[rel + BLOCK_USED] = u8::from(used);
        write_word(&mut self.memory, rel + BLOCK_HEADER_SIZE + BLOB_NAME, 0);
        write_i32(&mut self.memory, rel + BLOCK_HEADER_SIZE + BLOB_SIZE, blob_size);
        write_i32(&mut self.memory, rel + BLOCK_HEADER_SIZE + BLOB_FRAME_SIZE, frame_size);
        self.segment_addr(start) + BLOCK_HEADER_SIZE
    }

    /// Blob size that exactly covers `len` segments starting at the blob base.
    fn covering_size(len: usize) -> i32 {
        i32::try_from(len * SEG - BLOCK_HEADER_SIZE).unwrap()
    }

    fn find(&self, pc: usize) -> Option<usize> {
        CodeCache::find_blob_in(&self.vm, pc).map(|blob| blob.start())
    }
}

#[test]
fn test_pc_outside_heap_misses() {
    let mut heap = FakeCodeHeap::new();
    heap.add_block(0, 4, FakeCodeHeap::covering_size(4), 64, true);

    assert_eq!(heap.find(0), None);
    assert_eq!(heap.find(heap.mem_low() - 1), None);
    assert_eq!(heap.find(heap.mem_high()), None);
    assert_eq!(heap.find(heap.mem_high() + 0x1000), None);
}

#[test]
fn test_block_resolves_for_every_covered_segment() {
    let mut heap = FakeCodeHeap::new();
    let blob = heap.add_block(2, 4, FakeCodeHeap::covering_size(4), 128, true);

    for seg in 2..6 {
        for delta in [0, 1, SEG / 2, SEG - 1] {
            let pc = heap.segment_addr(seg) + delta;
            // Segment 2 holds the block header; PCs below the blob base miss.
            if pc < blob {
                continue;
            }
            assert_eq!(heap.find(pc), Some(blob), "pc in segment {seg} (+{delta})");
        }
    }

    let resolved = CodeCache::find_blob_in(&heap.vm, blob).expect("blob start resolves");
    assert!(resolved.contains(blob));
    assert_eq!(resolved.frame_size(), 128);
    assert_eq!(resolved.size(), FakeCodeHeap::covering_size(4));
}

#[test]
fn test_free_segment_misses_regardless_of_neighbors() {
    let mut heap = FakeCodeHeap::new();
    heap.add_block(2, 4, FakeCodeHeap::covering_size(4), 64, true);

    // Segment 10 stays at the free marker; its neighbors get a block.
    heap.add_block(8, 2, FakeCodeHeap::covering_size(2), 64, true);
    heap.add_block(11, 2, FakeCodeHeap::covering_size(2), 64, true);

    let pc = heap.segment_addr(10) + 4;
    assert_eq!(heap.find(pc), None);
}

#[test]
fn test_freed_block_misses() {
    // The segment map still points at the block, but its used flag is
    // already clear: the deallocation race the locator must absorb.
    let mut heap = FakeCodeHeap::new();
    heap.add_block(4, 3, FakeCodeHeap::covering_size(3), 64, false);

    assert_eq!(heap.find(heap.segment_addr(5)), None);
    assert_eq!(heap.find(heap.segment_addr(4) + BLOCK_HEADER_SIZE), None);
}

#[test]
fn test_undersized_blob_rejected_at_top_level() {
    // Declared blob size covers one segment; the map says four. The
    // heap-level walk still resolves the block, the top-level containment
    // check rejects it.
    let mut heap = FakeCodeHeap::new();
    let blob = heap.add_block(0, 4, i32::try_from(SEG).unwrap(), 64, true);

    let pc = heap.segment_addr(2);
    // SAFETY: the descriptor address points at the fixture's buffer.
    let raw = unsafe { CodeHeap::new(&heap.vm, heap.vm.code_cache_heap) };
    let resolved = raw.find_blob(pc).expect("heap-level lookup sees the block");
    assert_eq!(resolved.start(), blob);
    assert!(!resolved.contains(pc));

    assert_eq!(heap.find(pc), None);
}

#[test]
fn test_negative_blob_size_misses() {
    let mut heap = FakeCodeHeap::new();
    heap.add_block(0, 2, -1, 64, true);

    assert_eq!(heap.find(heap.segment_addr(0) + BLOCK_HEADER_SIZE), None);
}

#[test]
fn test_chained_descending_run_terminates() {
    // Byte k sits k segments after byte k-1, so each hop lands exactly on
    // the next smaller distance: the walk observes 3, 2, 1, 0 and takes as
    // many hops as the initial distance.
    let mut heap = FakeCodeHeap::new();
    let start = 5;
    let blob = heap.add_block(start, 1, FakeCodeHeap::covering_size(7), 64, true);

    let mut pos = start;
    for k in 1u8..=3 {
        pos += usize::from(k);
        heap.segmap[pos] = k;
    }

    // pos is now start + 6, the byte holding distance 3.
    assert_eq!(heap.find(heap.segment_addr(pos) + 8), Some(blob));
    // Entering the run mid-way terminates the same.
    assert_eq!(heap.find(heap.segment_addr(start + 3) + 8), Some(blob));
}

#[test]
fn test_corrupt_map_fails_closed() {
    let mut heap = FakeCodeHeap::new();

    // Distance pointing past the start of the map.
    heap.segmap[1] = 5;
    assert_eq!(heap.find(heap.segment_addr(1)), None);

    // Walk landing on a free marker mid-chain.
    heap.segmap[8] = 3;
    heap.segmap[5] = 0xFF;
    assert_eq!(heap.find(heap.segment_addr(8)), None);
}

#[test]
fn test_null_heapdescriptor_misses() {
    let heap = FakeCodeHeap::new();
    let pc = heap.segment_addr(1);

    let vm = test_structs(); // code_cache_heap stays NULL
    assert!(CodeCache::find_blob_in(&vm, pc).is_none());
}

#[test]
fn test_corrupt_segment_shift_fails_closed() {
    let mut heap = FakeCodeHeap::new();
    heap.add_block(0, 2, FakeCodeHeap::covering_size(2), 64, true);
    let pc = heap.segment_addr(0) + BLOCK_HEADER_SIZE;
    assert!(heap.find(pc).is_some());

    // A descriptor caught mid-update reports an absurd shift.
    write_i32(&mut heap.descriptor, HEAP_LOG2, 63);
    assert_eq!(heap.find(pc), None);
    write_i32(&mut heap.descriptor, HEAP_LOG2, -1);
    assert_eq!(heap.find(pc), None);
}
