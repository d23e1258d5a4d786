//! Board backend: the housekeeping block mapped through `/dev/mem`
//!
//! # Requirements
//!
//! - Linux on the Zynq board with `/dev/mem` access
//! - Root privileges or appropriate group membership
//! - The Red Pitaya bitstream loaded to the PL
//!
//! Only one mapping of the block may be live per process. A second
//! [`DevMemBlock::open`] fails with [`HkError::AlreadyMapped`] until the
//! first block is closed or dropped.

mod mmap;

pub use mmap::MemoryRegion;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{HkError, HkResult};
use crate::traits::RegisterIo;

/// Set while a `DevMemBlock` is alive
static MAPPED: AtomicBool = AtomicBool::new(false);

struct MappingGuard;

impl MappingGuard {
    fn acquire() -> HkResult<Self> {
        MAPPED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| MappingGuard)
            .map_err(|_| HkError::AlreadyMapped)
    }
}

impl Drop for MappingGuard {
    fn drop(&mut self) {
        MAPPED.store(false, Ordering::Release);
    }
}

/// Housekeeping block mapped from a device file
pub struct DevMemBlock {
    // declared before the guard so the region is unmapped first
    region: MemoryRegion,
    _guard: MappingGuard,
}

impl DevMemBlock {
    /// Map `len` bytes at `phys_base` from the device at `path`
    pub fn open(path: &Path, phys_base: usize, len: usize) -> HkResult<Self> {
        let guard = MappingGuard::acquire()?;
        let region = MemoryRegion::new("housekeeping", path, phys_base, len)?;
        tracing::info!(
            "Mapped housekeeping block at 0x{:08x} ({} bytes) from {}",
            phys_base,
            len,
            path.display()
        );
        Ok(Self {
            region,
            _guard: guard,
        })
    }

    /// Check if a process-wide mapping is currently live
    pub fn is_mapped() -> bool {
        MAPPED.load(Ordering::Acquire)
    }

    /// Check if this looks like a Zynq board with `/dev/mem`
    pub fn is_platform_available() -> bool {
        if !Path::new("/dev/mem").exists() {
            return false;
        }

        // Check for device tree compatible string
        if let Ok(contents) = fs::read_to_string("/sys/firmware/devicetree/base/compatible") {
            if contents.contains("xlnx,zynq") {
                return true;
            }
        }

        // Fallback: board model string
        fs::read_to_string("/sys/firmware/devicetree/base/model")
            .map(|model| model.contains("Red Pitaya"))
            .unwrap_or(false)
    }

    /// Physical base address of the mapping
    pub fn phys_base(&self) -> usize {
        self.region.phys_base
    }
}

impl RegisterIo for DevMemBlock {
    fn name(&self) -> &str {
        &self.region.name
    }

    fn size(&self) -> usize {
        self.region.size
    }

    fn read32(&self, offset: usize) -> HkResult<u32> {
        self.region.read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> HkResult<()> {
        self.region.write32(offset, value)
    }

    fn close(&mut self) -> HkResult<()> {
        self.region.unmap()?;
        tracing::info!(
            "Unmapped housekeeping block at 0x{:08x}",
            self.region.phys_base
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HkConfig;
    use std::io::Write;

    // All assertions that take the process-wide mapping live in this one
    // test so parallel tests cannot race on it.
    #[test]
    fn test_single_mapping_lifecycle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 4096]).unwrap();
        file.flush().unwrap();

        let mut first = DevMemBlock::open(file.path(), 0, 0x74).unwrap();
        assert!(DevMemBlock::is_mapped());
        assert!(matches!(
            DevMemBlock::open(file.path(), 0, 0x74),
            Err(HkError::AlreadyMapped)
        ));

        first.write32(0x0C, 1).unwrap();
        first.close().unwrap();
        assert!(first.read32(0x0C).is_err());
        drop(first);
        assert!(!DevMemBlock::is_mapped());

        // open -> release -> open again through the public entry point
        let config = HkConfig::default().dev_mem_path(file.path());
        for _ in 0..3 {
            let hk = crate::open(&config).unwrap();
            assert!(hk.digital_loop_enabled().unwrap());
            assert!(crate::open(&config).is_err());
            hk.release().unwrap();
            assert!(!DevMemBlock::is_mapped());
        }

        // a failed open does not leave the guard taken
        let missing = HkConfig::default().dev_mem_path("/nonexistent/mem");
        assert!(matches!(crate::open(&missing), Err(HkError::DeviceNotFound(_))));
        assert!(!DevMemBlock::is_mapped());
    }
}
