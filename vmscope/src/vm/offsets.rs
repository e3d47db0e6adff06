//! The resolved VM offset table
//!
//! The agent knows nothing about the VM's structures except a list of byte
//! offsets and static addresses exported by the VM library. [`CompatTable`]
//! names the exported symbols for one VM version; [`VmStructs`] is the
//! resolved, immutable table every structure view reads its offsets from.
//!
//! Initialization is the one ordering precondition in this crate: it runs
//! single-threaded at agent attach, publishes the table through a `OnceLock`,
//! and every later lookup reads it lock-free. A failed init (missing symbol,
//! i.e. unsupported VM version) leaves the table unavailable; dependent
//! lookups then uniformly report "not found" without touching VM memory.

#![allow(unsafe_code)] // init reads exported values out of the mapped VM image

use std::sync::OnceLock;

use log::{debug, warn};

use super::library::LibraryImage;
use super::reader::read_at;
use crate::domain::VmInitError;

/// Version-specific compatibility table: the exported symbol name for every
/// offset and static the agent needs, plus the layout constants that are not
/// exported at all.
///
/// The exact list is maintained externally per VM release; [`CompatTable::hotspot`]
/// carries the default HotSpot export names.
#[derive(Debug, Clone)]
pub struct CompatTable {
    // Exported `i32` globals holding structure field offsets
    pub klass_name: String,
    pub symbol_length: String,
    pub symbol_body: String,
    pub anchor_sp: String,
    pub anchor_pc: String,
    pub anchor_fp: String,
    pub wrapper_anchor: String,
    pub stub_buffer: String,
    pub stub_buffer_limit: String,
    pub heap_memory: String,
    pub heap_segmap: String,
    pub heap_log2_segment_size: String,
    pub vs_low_boundary: String,
    pub vs_high_boundary: String,
    pub vs_low: String,
    pub vs_high: String,
    pub heap_block_used: String,
    pub blob_name: String,
    pub blob_size: String,
    pub blob_frame_size: String,
    /// Field offset of the Klass pointer inside a `java.lang.Class` instance
    /// (exported as an `i32` static, same width as the field offsets).
    pub class_klass_offset: String,

    // Exported word-sized statics
    pub call_stub_return_address: String,
    pub interpreter_code: String,
    pub code_cache_heap: String,

    /// Size of the heap-block header preceding blob data. Version-specific
    /// and not exported by the VM, so it is supplied here.
    pub block_header_size: usize,
    /// Segment-map byte marking a free/unmapped segment.
    pub segment_free_marker: u8,
}

impl CompatTable {
    /// Export names for stock HotSpot builds.
    #[must_use]
    pub fn hotspot() -> Self {
        Self {
            klass_name: "_klass_name_offset".into(),
            symbol_length: "_symbol_length_offset".into(),
            symbol_body: "_symbol_body_offset".into(),
            anchor_sp: "_anchor_sp_offset".into(),
            anchor_pc: "_anchor_pc_offset".into(),
            anchor_fp: "_anchor_fp_offset".into(),
            wrapper_anchor: "_wrapper_anchor_offset".into(),
            stub_buffer: "_stub_buffer_offset".into(),
            stub_buffer_limit: "_stub_buffer_limit_offset".into(),
            heap_memory: "_heap_memory_offset".into(),
            heap_segmap: "_heap_segmap_offset".into(),
            heap_log2_segment_size: "_heap_segment_size_offset".into(),
            vs_low_boundary: "_vs_low_boundary_offset".into(),
            vs_high_boundary: "_vs_high_boundary_offset".into(),
            vs_low: "_vs_low_offset".into(),
            vs_high: "_vs_high_offset".into(),
            heap_block_used: "_heap_block_used_offset".into(),
            blob_name: "_cb_name_offset".into(),
            blob_size: "_cb_size_offset".into(),
            blob_frame_size: "_cb_frame_size_offset".into(),
            class_klass_offset: "_class_klass_offset".into(),
            call_stub_return_address: "_call_stub_return_address".into(),
            interpreter_code: "_interpreter_code".into(),
            code_cache_heap: "_code_cache_heap".into(),
            block_header_size: 2 * std::mem::size_of::<usize>(),
            segment_free_marker: 0xFF,
        }
    }
}

/// Resolved offsets and statics for one VM build.
///
/// Plain immutable data: every field is a byte offset into a VM structure,
/// a value copied out of a VM static at init time, or a layout constant from
/// the [`CompatTable`]. Views borrow this table; nothing mutates it after
/// [`VmStructs::init`].
#[derive(Debug, Clone)]
pub struct VmStructs {
    pub klass_name_offset: usize,
    pub symbol_length_offset: usize,
    pub symbol_body_offset: usize,
    pub anchor_sp_offset: usize,
    pub anchor_pc_offset: usize,
    pub anchor_fp_offset: usize,
    pub wrapper_anchor_offset: usize,
    pub stub_buffer_offset: usize,
    pub stub_buffer_limit_offset: usize,
    pub heap_memory_offset: usize,
    pub heap_segmap_offset: usize,
    pub heap_log2_segment_size_offset: usize,
    pub vs_low_boundary_offset: usize,
    pub vs_high_boundary_offset: usize,
    pub vs_low_offset: usize,
    pub vs_high_offset: usize,
    pub heap_block_used_offset: usize,
    pub blob_name_offset: usize,
    pub blob_size_offset: usize,
    pub blob_frame_size_offset: usize,
    pub class_klass_offset: usize,

    /// Sentinel return address of the VM's call stub.
    pub call_stub_return_address: usize,
    /// Address of the interpreter's stub queue (may be NULL in odd builds).
    pub interpreter_code: usize,
    /// Address of the code cache's heap descriptor.
    pub code_cache_heap: usize,

    pub block_header_size: usize,
    pub segment_free_marker: u8,
}

static VM_STRUCTS: OnceLock<VmStructs> = OnceLock::new();

impl VmStructs {
    /// Resolve every entry of `table` against the VM library image.
    ///
    /// The first missing symbol aborts resolution: a partially resolved table
    /// must never be observable.
    ///
    /// # Errors
    /// [`VmInitError::MissingSymbol`] if the image does not export a required
    /// symbol (version mismatch); [`VmInitError::InvalidOffset`] if an
    /// exported offset is negative.
    pub fn resolve(library: &dyn LibraryImage, table: &CompatTable) -> Result<Self, VmInitError> {
        Ok(Self {
            klass_name_offset: field_offset(library, &table.klass_name)?,
            symbol_length_offset: field_offset(library, &table.symbol_length)?,
            symbol_body_offset: field_offset(library, &table.symbol_body)?,
            anchor_sp_offset: field_offset(library, &table.anchor_sp)?,
            anchor_pc_offset: field_offset(library, &table.anchor_pc)?,
            anchor_fp_offset: field_offset(library, &table.anchor_fp)?,
            wrapper_anchor_offset: field_offset(library, &table.wrapper_anchor)?,
            stub_buffer_offset: field_offset(library, &table.stub_buffer)?,
            stub_buffer_limit_offset: field_offset(library, &table.stub_buffer_limit)?,
            heap_memory_offset: field_offset(library, &table.heap_memory)?,
            heap_segmap_offset: field_offset(library, &table.heap_segmap)?,
            heap_log2_segment_size_offset: field_offset(library, &table.heap_log2_segment_size)?,
            vs_low_boundary_offset: field_offset(library, &table.vs_low_boundary)?,
            vs_high_boundary_offset: field_offset(library, &table.vs_high_boundary)?,
            vs_low_offset: field_offset(library, &table.vs_low)?,
            vs_high_offset: field_offset(library, &table.vs_high)?,
            heap_block_used_offset: field_offset(library, &table.heap_block_used)?,
            blob_name_offset: field_offset(library, &table.blob_name)?,
            blob_size_offset: field_offset(library, &table.blob_size)?,
            blob_frame_size_offset: field_offset(library, &table.blob_frame_size)?,
            class_klass_offset: field_offset(library, &table.class_klass_offset)?,
            call_stub_return_address: static_word(library, &table.call_stub_return_address)?,
            interpreter_code: static_word(library, &table.interpreter_code)?,
            code_cache_heap: static_word(library, &table.code_cache_heap)?,
            block_header_size: table.block_header_size,
            segment_free_marker: table.segment_free_marker,
        })
    }

    /// Resolve and publish the process-wide offset table.
    ///
    /// Must run strictly before any concurrent lookup begins. A failure is
    /// not fatal to the host process: the table simply stays unavailable and
    /// every dependent lookup degrades to "not found".
    ///
    /// # Errors
    /// Resolution errors from [`VmStructs::resolve`], or
    /// [`VmInitError::AlreadyInitialized`] if a table was already published.
    pub fn init(library: &dyn LibraryImage, table: &CompatTable) -> Result<(), VmInitError> {
        let resolved = match Self::resolve(library, table) {
            Ok(vm) => vm,
            Err(err) => {
                warn!("VM offset table unavailable: {err}");
                return Err(err);
            }
        };
        resolved.log_resolved();
        VM_STRUCTS.set(resolved).map_err(|_| VmInitError::AlreadyInitialized)
    }

    /// The published table, if initialization has succeeded.
    #[must_use]
    pub fn get() -> Option<&'static VmStructs> {
        VM_STRUCTS.get()
    }

    /// Whether the process-wide table has been successfully initialized.
    #[must_use]
    pub fn available() -> bool {
        Self::get().is_some()
    }

    /// Diagnostic dump of the resolved values.
    pub fn log_resolved(&self) {
        debug!("Klass::_name offset: {}", self.klass_name_offset);
        debug!("Symbol::_length offset: {}", self.symbol_length_offset);
        debug!("Symbol::_body offset: {}", self.symbol_body_offset);
        debug!(
            "JavaFrameAnchor offsets: sp={} pc={} fp={}",
            self.anchor_sp_offset, self.anchor_pc_offset, self.anchor_fp_offset
        );
        debug!("java_lang_Class::_klass offset: {}", self.class_klass_offset);
        debug!("CodeHeap descriptor: 0x{:x}", self.code_cache_heap);
        debug!("Interpreter stub queue: 0x{:x}", self.interpreter_code);
        debug!("Call stub return address: 0x{:x}", self.call_stub_return_address);
    }
}

/// Resolve a symbol exporting an `i32` field offset and read its value.
fn field_offset(library: &dyn LibraryImage, symbol: &str) -> Result<usize, VmInitError> {
    let addr = library
        .resolve(symbol)
        .ok_or_else(|| VmInitError::MissingSymbol(symbol.to_string()))?;
    // SAFETY: `addr` was just resolved inside the mapped library image.
    let value = unsafe { read_at::<i32>(addr, 0) };
    usize::try_from(value)
        .map_err(|_| VmInitError::InvalidOffset { symbol: symbol.to_string(), value })
}

/// Resolve a symbol exporting a word-sized static and read its value.
fn static_word(library: &dyn LibraryImage, symbol: &str) -> Result<usize, VmInitError> {
    let addr = library
        .resolve(symbol)
        .ok_or_else(|| VmInitError::MissingSymbol(symbol.to_string()))?;
    // SAFETY: `addr` was just resolved inside the mapped library image.
    Ok(unsafe { read_at::<usize>(addr, 0) })
}
