//! # vmscope - VM-structure introspection for a native profiling agent
//!
//! vmscope is the translation layer of an in-process profiling agent: given a
//! raw program-counter value sampled from the monitored VM, it decides whether
//! the PC lies in the VM's code cache and, if so, locates the compiled-code
//! blob containing it. It does this with no bytecode or symbol-table
//! knowledge, only a table of byte offsets into the VM's own internal
//! structures and the VM's own bookkeeping data.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │              Monitored VM (e.g. HotSpot JVM)              │
//! │   code heap · segment map · klasses · frame anchors       │
//! └───────────────────────┬───────────────────────────────────┘
//!                         │ raw memory, mutated concurrently
//!                         ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                  vmscope (This Crate)                     │
//! │                                                           │
//! │  ┌───────────┐   ┌─────────────┐   ┌──────────────────┐   │
//! │  │ Library   │──▶│ Offset      │──▶│ Structure Views  │   │
//! │  │ Image     │   │ Table       │   │ + Code Cache     │   │
//! │  │ (ELF)     │   │ (VmStructs) │   │ Locator          │   │
//! │  └───────────┘   └─────────────┘   └──────────────────┘   │
//! └───────────────────────┬───────────────────────────────────┘
//!                         │ blob name/size/frame size, anchors
//!                         ▼
//!            external sampler / stack walker / symbolizer
//! ```
//!
//! ## Module Structure
//!
//! - [`vm`]: the introspection core
//!   - `library`: resolve exported symbols from the VM's loaded ELF image
//!   - `offsets`: the write-once, process-wide offset table
//!   - `views`: borrowed, allocation-free views over VM structures
//!   - `code_cache`: the PC-to-blob segment-map walk
//! - [`domain`]: newtypes and structured errors
//!
//! ## Key Properties
//!
//! - **Never crashes the host.** The monitored process is also the profiled
//!   process; every lookup validates indices before dereferencing and
//!   degrades to "not found" on any inconsistency.
//! - **Lock-free read path.** The VM mutates its structures without
//!   coordination; lookups take no locks, allocate nothing, and are bounded
//!   in cost by the local segment-map run length.
//! - **Version tolerance.** A VM build whose image lacks a required symbol
//!   simply leaves the component unavailable; lookups report "unknown"
//!   instead of touching memory with a wrong layout.

pub mod domain;
pub mod vm;
