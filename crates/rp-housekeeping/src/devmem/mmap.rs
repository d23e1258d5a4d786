//! Memory-mapped I/O for register access through a device file

use std::ffi::c_void;
use std::fs::{File, OpenOptions};
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::ptr::{self, NonNull};

use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};

use crate::error::{HkError, HkResult};

/// A memory-mapped physical region
///
/// Offsets passed to the accessors are relative to `phys_base`.
pub struct MemoryRegion {
    /// Region name for debugging
    pub name: String,

    /// Base physical address
    pub phys_base: usize,

    /// Size of the region
    pub size: usize,

    /// Page-aligned start of the mapping, `None` once unmapped
    mapping: Option<NonNull<c_void>>,

    /// Distance from the page-aligned start to `phys_base`
    page_offset: usize,

    /// Device file backing the mapping
    _file: File,
}

fn page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

impl MemoryRegion {
    /// Map `size` bytes at `phys_base` from the device file at `path`
    pub fn new(name: impl Into<String>, path: &Path, phys_base: usize, size: usize) -> HkResult<Self> {
        let name = name.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    HkError::PermissionDenied(format!("cannot open {}", path.display()))
                }
                io::ErrorKind::NotFound => HkError::DeviceNotFound(path.display().to_string()),
                _ => HkError::OpenFailed(e),
            })?;

        // Page-align the mapping
        let page_offset = phys_base & (page_size() - 1);
        let aligned_base = phys_base - page_offset;
        let aligned_size = NonZeroUsize::new(size + page_offset).ok_or(HkError::MmapFailed {
            address: phys_base,
            reason: "empty region".to_string(),
        })?;

        // SAFETY: a fresh shared mapping of a device file; no existing
        // Rust object aliases the returned memory
        let mapping = unsafe {
            mmap(
                None,
                aligned_size,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &file,
                aligned_base as libc::off_t,
            )
        }
        .map_err(|e| HkError::MmapFailed {
            address: phys_base,
            reason: e.to_string(),
        })?;

        Ok(Self {
            name,
            phys_base,
            size,
            mapping: Some(mapping),
            page_offset,
            _file: file,
        })
    }

    fn word_ptr(&self, offset: usize) -> HkResult<*mut u32> {
        let mapping = self.mapping.ok_or_else(|| HkError::MmapFailed {
            address: self.phys_base,
            reason: format!("region {} already unmapped", self.name),
        })?;
        crate::traits::check_word_offset(offset, self.size)?;
        // SAFETY: offset + 4 <= size was checked, and the mapping covers
        // page_offset + size bytes
        Ok(unsafe { mapping.as_ptr().cast::<u8>().add(self.page_offset + offset) }.cast::<u32>())
    }

    /// Read a 32-bit value at a byte offset
    pub fn read32(&self, offset: usize) -> HkResult<u32> {
        let ptr = self.word_ptr(offset)?;
        // SAFETY: aligned, in-bounds pointer into the live mapping; volatile
        // because the FPGA owns the contents
        Ok(unsafe { ptr::read_volatile(ptr) })
    }

    /// Write a 32-bit value at a byte offset
    pub fn write32(&self, offset: usize, value: u32) -> HkResult<()> {
        let ptr = self.word_ptr(offset)?;
        // SAFETY: see read32
        unsafe { ptr::write_volatile(ptr, value) };
        Ok(())
    }

    /// Unmap the region; later accesses fail
    pub fn unmap(&mut self) -> HkResult<()> {
        let Some(mapping) = self.mapping.take() else {
            return Ok(());
        };
        // SAFETY: mapping and length are exactly what mmap returned/used
        unsafe { munmap(mapping, self.size + self.page_offset) }.map_err(|e| HkError::MmapFailed {
            address: self.phys_base,
            reason: format!("munmap failed: {}", e),
        })
    }

    /// Whether the region is still mapped
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        if let Err(e) = self.unmap() {
            tracing::warn!("munmap failed for region {}: {}", self.name, e);
        }
    }
}

// Safety: MemoryRegion exclusively owns its mapping; the raw pointer is only
// dereferenced through the bounds-checked accessors
unsafe impl Send for MemoryRegion {}
