//! Borrowed views over VM-internal structures
//!
//! Each view is a `Copy` value pairing a raw base address with the resolved
//! offset table; none of them own, allocate, or mutate the memory they
//! describe. Field reads go through the crate's single read primitive.
//!
//! Validity is bounded by the life of the monitored process: the VM may
//! unload or rewrite any of this memory at any time, so values read here are
//! best-effort and must be range-checked before they are trusted.

#![allow(unsafe_code)] // views dereference raw addresses inside the target VM

use super::offsets::VmStructs;
use super::reader::read_at;

/// Interned name in the VM's symbol table: a 16-bit length followed by the
/// inline byte body (not a separate allocation).
#[derive(Clone, Copy)]
pub struct Symbol<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> Symbol<'a> {
    /// # Safety
    /// `base` must point at a live `Symbol` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    #[must_use]
    pub fn length(&self) -> u16 {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.symbol_length_offset) }
    }

    /// Pointer to the inline body. Never read past [`Symbol::length`] bytes.
    #[must_use]
    pub fn body(&self) -> *const u8 {
        (self.base + self.vm.symbol_body_offset) as *const u8
    }

    /// The body as a slice bounded by the stored length.
    ///
    /// # Safety
    /// The symbol must stay mapped and unmodified for the duration of the
    /// borrow; copy the bytes out promptly.
    #[must_use]
    pub unsafe fn as_bytes(&self) -> &'a [u8] {
        std::slice::from_raw_parts(self.body(), usize::from(self.length()))
    }
}

/// Loaded-class metadata; holds (indirectly) the Symbol naming the class.
#[derive(Clone, Copy)]
pub struct Klass<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> Klass<'a> {
    /// # Safety
    /// `base` must point at a live `Klass` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    /// One pointer indirection to the class name symbol.
    #[must_use]
    pub fn name(&self) -> Option<Symbol<'a>> {
        // SAFETY: upheld by the constructor contract.
        let ptr = unsafe { read_at::<usize>(self.base, self.vm.klass_name_offset) };
        if ptr == 0 {
            return None;
        }
        // SAFETY: a non-NULL Klass name points at the interned Symbol.
        Some(unsafe { Symbol::new(self.vm, ptr) })
    }
}

/// Header view of a `java.lang.Class` instance, bridging a managed object to
/// its Klass. The field offset is a VM-global static, independent of the
/// object's type.
#[derive(Clone, Copy)]
pub struct JavaClass<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> JavaClass<'a> {
    /// # Safety
    /// `base` must point at a live `java.lang.Class` instance.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    #[must_use]
    pub fn klass(&self) -> Option<Klass<'a>> {
        // SAFETY: upheld by the constructor contract.
        let ptr = unsafe { read_at::<usize>(self.base, self.vm.class_klass_offset) };
        if ptr == 0 {
            return None;
        }
        // SAFETY: a non-NULL klass field points at the class metadata.
        Some(unsafe { Klass::new(self.vm, ptr) })
    }
}

/// The last recorded managed-to-native transition point on some thread:
/// stack pointer, program counter and frame pointer, consumed by an external
/// stack walker to resume a walk at the boundary.
#[derive(Clone, Copy)]
pub struct FrameAnchor<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> FrameAnchor<'a> {
    /// # Safety
    /// `base` must point at a live `JavaFrameAnchor` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    #[must_use]
    pub fn last_java_sp(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.anchor_sp_offset) }
    }

    #[must_use]
    pub fn last_java_pc(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.anchor_pc_offset) }
    }

    #[must_use]
    pub fn last_java_fp(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.anchor_fp_offset) }
    }
}

/// One "call into managed code" activation; owns exactly one embedded frame
/// anchor.
#[derive(Clone, Copy)]
pub struct CallWrapper<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> CallWrapper<'a> {
    /// # Safety
    /// `base` must point at a live `JavaCallWrapper` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    /// The anchor is embedded in the wrapper, not pointed to.
    #[must_use]
    pub fn anchor(&self) -> FrameAnchor<'a> {
        // SAFETY: the anchor lies inside the wrapper the constructor vouched for.
        unsafe { FrameAnchor::new(self.vm, self.base + self.vm.wrapper_anchor_offset) }
    }
}

/// Queue of interpreter dispatch stubs: a buffer start plus its extent.
#[derive(Clone, Copy)]
pub struct StubQueue<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> StubQueue<'a> {
    /// # Safety
    /// `base` must point at a live `StubQueue` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    #[must_use]
    pub fn buffer(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.stub_buffer_offset) }
    }

    #[must_use]
    pub fn buffer_limit(&self) -> i32 {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.stub_buffer_limit_offset) }
    }
}

/// The VM interpreter's dispatch-code region.
pub struct Interpreter;

impl Interpreter {
    /// Whether `pc` lies inside the interpreter's stub buffer.
    #[must_use]
    pub fn contains(vm: &VmStructs, pc: usize) -> bool {
        if vm.interpreter_code == 0 {
            return false;
        }
        // SAFETY: the stub queue address was read from the VM's own static
        // during init.
        let queue = unsafe { StubQueue::new(vm, vm.interpreter_code) };
        let start = queue.buffer();
        let limit = queue.buffer_limit();
        if start == 0 || limit <= 0 {
            return false;
        }
        pc >= start && pc < start + limit as usize
    }
}

/// VM-generated glue stubs.
pub struct StubRoutines;

impl StubRoutines {
    /// Sentinel return address marking the call stub frame; the external
    /// stack walker compares frame PCs against it.
    #[must_use]
    pub fn call_stub_return_address(vm: &VmStructs) -> usize {
        vm.call_stub_return_address
    }
}

/// One reserved/committed memory region: reserved boundaries plus the
/// currently committed low/high watermarks.
#[derive(Clone, Copy)]
pub struct VirtualSpace<'a> {
    vm: &'a VmStructs,
    base: usize,
}

impl<'a> VirtualSpace<'a> {
    /// # Safety
    /// `base` must point at a live `VirtualSpace` in the target VM.
    #[must_use]
    pub unsafe fn new(vm: &'a VmStructs, base: usize) -> Self {
        Self { vm, base }
    }

    #[must_use]
    pub fn low_boundary(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.vs_low_boundary_offset) }
    }

    #[must_use]
    pub fn high_boundary(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.vs_high_boundary_offset) }
    }

    #[must_use]
    pub fn low(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.vs_low_offset) }
    }

    #[must_use]
    pub fn high(&self) -> usize {
        // SAFETY: upheld by the constructor contract.
        unsafe { read_at(self.base, self.vm.vs_high_offset) }
    }

    /// Containment test against the reserved low bound and the committed
    /// high watermark, matching how the VM grows the region.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        self.low_boundary() <= addr && addr < self.high()
    }
}
