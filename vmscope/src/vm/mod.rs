//! VM introspection core
//!
//! Offset-based views over the monitored VM's internal structures:
//! - `library`: the VM's loaded ELF image and symbol resolution
//! - `offsets`: the process-wide resolved offset table
//! - `views`: structure views (symbols, classes, frame anchors, stub code)
//! - `code_cache`: PC-to-blob resolution over the code heap
//! - `reader`: the single raw read primitive everything funnels through

pub mod code_cache;
pub mod library;
pub mod offsets;
pub(crate) mod reader;
pub mod views;

// Re-export the introspection surface
pub use code_cache::{CodeBlob, CodeCache, CodeHeap};
pub use library::{library_base, ElfImage, LibraryImage};
pub use offsets::{CompatTable, VmStructs};
pub use views::{
    CallWrapper, FrameAnchor, Interpreter, JavaClass, Klass, StubQueue, StubRoutines, Symbol,
    VirtualSpace,
};
