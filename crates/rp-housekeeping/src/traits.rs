//! Register backend trait definition

use crate::error::{HkError, HkResult};

/// Word-level access to a mapped register block
///
/// Offsets are byte offsets from the start of the block. Implementations
/// must reject offsets that are not 4-byte aligned or that fall outside
/// [`RegisterIo::size`].
///
/// # Example
///
/// ```rust
/// use rp_housekeeping::{RegisterIo, SimulatedBlock};
///
/// let mut block = SimulatedBlock::new();
/// block.write32(0x30, 0x5A).unwrap();
/// assert_eq!(block.read32(0x30).unwrap(), 0x5A);
/// ```
pub trait RegisterIo: Send {
    /// Backend name for diagnostics
    fn name(&self) -> &str;

    /// Accessible size of the block in bytes
    fn size(&self) -> usize;

    /// Read a 32-bit word
    fn read32(&self, offset: usize) -> HkResult<u32>;

    /// Write a 32-bit word
    fn write32(&mut self, offset: usize, value: u32) -> HkResult<()>;

    /// Release the underlying resource
    ///
    /// Called once by [`crate::Housekeeping::release`]. Backends that hold
    /// nothing beyond memory can rely on this default.
    fn close(&mut self) -> HkResult<()> {
        Ok(())
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn read32(&self, offset: usize) -> HkResult<u32> {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> HkResult<()> {
        (**self).write32(offset, value)
    }

    fn close(&mut self) -> HkResult<()> {
        (**self).close()
    }
}

/// Check that a word access at `offset` fits a block of `size` bytes
pub fn check_word_offset(offset: usize, size: usize) -> HkResult<()> {
    if offset % 4 != 0 || offset.checked_add(4).map_or(true, |end| end > size) {
        return Err(HkError::InvalidOffset(offset));
    }
    Ok(())
}
