//! Executable memory for compiled routines.
//!
//! Emitted code lands in a page-aligned read+write mapping; `finalize` flips
//! it to read+execute and only then materializes the entry pointer. The
//! mapping is never writable and executable at the same time (W^X), and the
//! byte-buffer-to-function-pointer cast happens in exactly one place.

use std::ptr::NonNull;

use crate::value::Complex;

/// Error type for memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    AllocationFailed,
    ProtectionFailed,
    InvalidSize,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "memory allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "memory protection change failed"),
            MemoryError::InvalidSize => write!(f, "invalid memory size"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Signature of a compiled routine: one register-file pointer, no return.
pub type RoutineFn = unsafe extern "C" fn(*mut Complex);

/// A page-aligned anonymous mapping, unmapped on drop.
#[derive(Debug)]
struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl Mapping {
    /// Map `size` bytes (rounded up to whole pages) read+write.
    fn alloc_rw(size: usize) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::InvalidSize);
        }
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let len = (size + page - 1) & !(page - 1);

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed);
        }
        let ptr = NonNull::new(ptr as *mut u8).ok_or(MemoryError::AllocationFailed)?;
        Ok(Self { ptr, len })
    }

    /// Drop write permission and gain execute permission.
    fn protect_rx(&mut self) -> Result<(), MemoryError> {
        let result = unsafe {
            libc::mprotect(
                self.ptr.as_ptr() as *mut libc::c_void,
                self.len,
                libc::PROT_READ | libc::PROT_EXEC,
            )
        };
        if result != 0 {
            return Err(MemoryError::ProtectionFailed);
        }
        Ok(())
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len);
        }
    }
}

/// A finalized, callable routine.
///
/// Owns its mapping: the code cannot be mutated after finalize (no writable
/// view exists) and cannot be invoked after release (dropping the value is
/// the release). The remaining dynamic contract, invoking with a register
/// file of the wrong size, panics.
#[derive(Debug)]
pub struct CompiledRoutine {
    map: Mapping,
    entry: RoutineFn,
    register_count: usize,
    code_len: usize,
}

impl CompiledRoutine {
    /// Copy `code` into fresh executable memory and produce the callable
    /// view. Permissions go read+write for the copy, then read+execute; the
    /// entry pointer exists only after the flip.
    pub(crate) fn finalize(code: &[u8], register_count: usize) -> Result<Self, MemoryError> {
        let mut map = Mapping::alloc_rw(code.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(code.as_ptr(), map.ptr.as_ptr(), code.len());
        }
        map.protect_rx()?;

        // SAFETY: the mapping holds a complete routine ending in RET and is
        // now readable and executable.
        let entry: RoutineFn = unsafe { std::mem::transmute(map.ptr.as_ptr()) };

        Ok(Self {
            map,
            entry,
            register_count,
            code_len: code.len(),
        })
    }

    /// Number of registers the routine was compiled for.
    pub fn register_count(&self) -> usize {
        self.register_count
    }

    /// Size of the machine code in bytes.
    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// Run the routine once against `regs`, mutating registers in place.
    ///
    /// Panics if `regs` is not exactly the register-file size the routine
    /// was compiled for: generated code performs no bounds checks of its
    /// own, the displacement range proof covers only that file.
    pub fn invoke(&self, regs: &mut [Complex]) {
        assert_eq!(
            regs.len(),
            self.register_count,
            "register file size mismatch"
        );
        // SAFETY: regs points at register_count contiguous Complex values
        // and every displacement in the code stays inside that region.
        unsafe { (self.entry)(regs.as_mut_ptr()) }
    }
}

// The mapping is immutable after finalize and the routine touches only the
// register file passed to each invoke call.
unsafe impl Send for CompiledRoutine {}
unsafe impl Sync for CompiledRoutine {}
