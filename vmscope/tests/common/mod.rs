//! Shared fixtures for the introspection tests: a synthetic offset table
//! describing the struct layouts the tests lay out by hand, plus raw field
//! writers.

#![allow(dead_code)] // each test binary uses a subset of the fixtures

use vmscope::vm::VmStructs;

// Symbol fixture layout
pub const SYMBOL_LENGTH: usize = 0;
pub const SYMBOL_BODY: usize = 2;

// Klass / java.lang.Class fixture layout
pub const KLASS_NAME: usize = 8;
pub const CLASS_KLASS: usize = 16;

// JavaFrameAnchor fixture layout
pub const ANCHOR_SP: usize = 0;
pub const ANCHOR_PC: usize = 8;
pub const ANCHOR_FP: usize = 16;
pub const WRAPPER_ANCHOR: usize = 8;

// StubQueue fixture layout
pub const STUB_BUFFER: usize = 0;
pub const STUB_BUFFER_LIMIT: usize = 8;

// VirtualSpace fixture layout
pub const VS_LOW_BOUNDARY: usize = 0;
pub const VS_HIGH_BOUNDARY: usize = 8;
pub const VS_LOW: usize = 16;
pub const VS_HIGH: usize = 24;
pub const VS_SIZE: usize = 32;

// CodeHeap descriptor fixture layout
pub const HEAP_MEMORY: usize = 0;
pub const HEAP_SEGMAP: usize = VS_SIZE;
pub const HEAP_LOG2: usize = 2 * VS_SIZE;
pub const HEAP_DESCRIPTOR_SIZE: usize = 2 * VS_SIZE + 8;

// Heap block / CodeBlob fixture layout
pub const BLOCK_USED: usize = 8;
pub const BLOCK_HEADER_SIZE: usize = 16;
pub const BLOB_NAME: usize = 0;
pub const BLOB_SIZE: usize = 8;
pub const BLOB_FRAME_SIZE: usize = 12;

/// Offset table matching the fixture layouts above.
pub fn test_structs() -> VmStructs {
    VmStructs {
        klass_name_offset: KLASS_NAME,
        symbol_length_offset: SYMBOL_LENGTH,
        symbol_body_offset: SYMBOL_BODY,
        anchor_sp_offset: ANCHOR_SP,
        anchor_pc_offset: ANCHOR_PC,
        anchor_fp_offset: ANCHOR_FP,
        wrapper_anchor_offset: WRAPPER_ANCHOR,
        stub_buffer_offset: STUB_BUFFER,
        stub_buffer_limit_offset: STUB_BUFFER_LIMIT,
        heap_memory_offset: HEAP_MEMORY,
        heap_segmap_offset: HEAP_SEGMAP,
        heap_log2_segment_size_offset: HEAP_LOG2,
        vs_low_boundary_offset: VS_LOW_BOUNDARY,
        vs_high_boundary_offset: VS_HIGH_BOUNDARY,
        vs_low_offset: VS_LOW,
        vs_high_offset: VS_HIGH,
        heap_block_used_offset: BLOCK_USED,
        blob_name_offset: BLOB_NAME,
        blob_size_offset: BLOB_SIZE,
        blob_frame_size_offset: BLOB_FRAME_SIZE,
        class_klass_offset: CLASS_KLASS,
        call_stub_return_address: 0,
        interpreter_code: 0,
        code_cache_heap: 0,
        block_header_size: BLOCK_HEADER_SIZE,
        segment_free_marker: 0xFF,
    }
}

pub fn write_word(buf: &mut [u8], offset: usize, value: usize) {
    let bytes = value.to_ne_bytes();
    buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
}

pub fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_ne_bytes());
}
