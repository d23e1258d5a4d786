//! Simulated housekeeping block for development and testing
//!
//! Keeps the register image in a little-endian byte buffer, the same layout
//! the FPGA exposes, so code can be exercised without a board.

use crate::error::HkResult;
use crate::registers::{self, field, REGISTER_MAP, SIM_MOSI_WORDS};
use crate::traits::{check_word_offset, RegisterIo};
use crate::trigger::{word_mask, SpiTransfer, SpiTrigger, TriggerState};
use crate::types::{Access, RegisterImage};

/// Software register image for development without hardware
///
/// Writes to read-only words are dropped, as on the real block. Every
/// accepted write is recorded so tests can check exactly which words a
/// sequence of accessor calls touched.
#[derive(Debug, Clone)]
pub struct SimulatedBlock {
    /// Register bytes, little-endian words
    image: Vec<u8>,

    /// Accepted writes as (offset, value)
    writes: Vec<(usize, u32)>,
}

impl SimulatedBlock {
    /// Create a zeroed block covering every field of the register map
    pub fn new() -> Self {
        Self::with_size(REGISTER_MAP.span())
    }

    /// Create a zeroed block of `size` bytes (rounded up to whole words)
    pub fn with_size(size: usize) -> Self {
        Self {
            image: vec![0; size.div_ceil(4) * 4],
            writes: Vec::new(),
        }
    }

    /// Builder: set the identity registers
    pub fn with_identity(mut self, id: u32, dna: u64) -> Self {
        self.poke(registers::ID, id);
        self.poke(registers::DNA_LO, dna as u32);
        self.poke(registers::DNA_HI, (dna >> 32) as u32);
        self
    }

    /// Writes accepted so far, oldest first
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    /// Forget the write history
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Copy of every word
    pub fn snapshot(&self) -> RegisterImage {
        RegisterImage::from_words(
            self.image
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Transfers the simulated SPI master would clock out
    ///
    /// One transfer per MOSI word, `sim_bits` wide, paired with the
    /// matching entry of `miso_replies` (0 when the slice is shorter).
    /// Nothing is clocked out while `sim_flag` is clear.
    pub fn spi_transfers(&self, miso_replies: &[u32]) -> Vec<SpiTransfer> {
        let image = self.snapshot();
        if image.field(&field::SIM_FLAG) == 0 {
            return Vec::new();
        }
        let mask = word_mask(image.field(&field::SIM_BITS));
        (0..SIM_MOSI_WORDS)
            .map(|i| SpiTransfer {
                mosi: image.field(&field::SIM_MOSI[i]) & mask,
                miso: miso_replies.get(i).copied().unwrap_or(0) & mask,
            })
            .collect()
    }

    /// Play the simulated MOSI payload through the programmed trigger
    ///
    /// Returns the final trigger state and the index of the transfer that
    /// fired it.
    pub fn simulate_transfers(&self, miso_replies: &[u32]) -> (TriggerState, Option<usize>) {
        let mut trigger = SpiTrigger::from_image(&self.snapshot());
        let fired = trigger.run(self.spi_transfers(miso_replies));
        tracing::debug!(state = ?trigger.state(), ?fired, "simulated SPI run");
        (trigger.state(), fired)
    }

    // Words past the end of a short image are skipped
    fn poke(&mut self, offset: usize, value: u32) {
        if let Some(word) = self.image.get_mut(offset..offset + 4) {
            word.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn is_read_only(offset: usize) -> bool {
        REGISTER_MAP
            .fields
            .iter()
            .any(|f| f.offset == offset && f.access == Access::ReadOnly)
    }
}

impl Default for SimulatedBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterIo for SimulatedBlock {
    fn name(&self) -> &str {
        "sim"
    }

    fn size(&self) -> usize {
        self.image.len()
    }

    fn read32(&self, offset: usize) -> HkResult<u32> {
        check_word_offset(offset, self.image.len())?;
        let b = &self.image[offset..offset + 4];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn write32(&mut self, offset: usize, value: u32) -> HkResult<()> {
        check_word_offset(offset, self.image.len())?;
        if Self::is_read_only(offset) {
            tracing::trace!(offset, value, "write to read-only word dropped");
            return Ok(());
        }
        self.poke(offset, value);
        self.writes.push((offset, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HkError;

    #[test]
    fn test_register_operations() {
        let mut sim = SimulatedBlock::new();
        assert_eq!(sim.size(), 0x74);

        sim.write32(0x70, 0xDEADBEEF).unwrap();
        assert_eq!(sim.read32(0x70).unwrap(), 0xDEADBEEF);

        // Unwritten register should be 0
        assert_eq!(sim.read32(0x30).unwrap(), 0);
        assert_eq!(sim.writes(), &[(0x70, 0xDEADBEEF)]);
    }

    #[test]
    fn test_little_endian_image() {
        let mut sim = SimulatedBlock::new();
        sim.write32(0x30, 0x1234_5678).unwrap();
        assert_eq!(&sim.image[0x30..0x34], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(sim.snapshot().word(0x30), 0x1234_5678);
    }

    #[test]
    fn test_bad_offsets_rejected() {
        let mut sim = SimulatedBlock::new();
        assert!(matches!(sim.read32(0x74), Err(HkError::InvalidOffset(0x74))));
        assert!(matches!(sim.write32(0x31, 1), Err(HkError::InvalidOffset(0x31))));
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_read_only_words_keep_identity() {
        let mut sim = SimulatedBlock::new().with_identity(0x0000_0002, 0x0123_4567_89AB_CDEF);
        sim.write32(registers::ID, 0xFFFF_FFFF).unwrap();
        sim.write32(registers::DNA_HI, 0).unwrap();
        assert_eq!(sim.read32(registers::ID).unwrap(), 2);
        assert_eq!(sim.read32(registers::DNA_LO).unwrap(), 0x89AB_CDEF);
        assert_eq!(sim.read32(registers::DNA_HI).unwrap(), 0x0123_4567);
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn test_identity_on_short_block() {
        let sim = SimulatedBlock::with_size(4).with_identity(1, 0x0000_0003_0000_0002);
        assert_eq!(sim.size(), 4);
        assert_eq!(sim.read32(registers::ID).unwrap(), 1);
        assert!(sim.read32(registers::DNA_LO).is_err());
    }

    #[test]
    fn test_no_transfers_without_sim_flag() {
        let mut sim = SimulatedBlock::new();
        sim.write32(registers::sim_mosi(0), 0x33AA).unwrap();
        assert!(sim.spi_transfers(&[]).is_empty());
        assert_eq!(sim.simulate_transfers(&[]), (TriggerState::Idle, None));
    }

    #[test]
    fn test_simulated_run_fires_on_second_stage() {
        let mut sim = SimulatedBlock::new();
        sim.write32(registers::SIM_FLAG, 1).unwrap();
        sim.write32(registers::SIM_BITS, 16).unwrap();
        sim.write32(registers::sim_mosi(0), 0x1111).unwrap();
        // upper bits are cut at the 16-bit transfer width
        sim.write32(registers::sim_mosi(1), 0xAB_33AA).unwrap();
        sim.write32(registers::TR_MOSI_MASK, 0xFFFF).unwrap();
        sim.write32(registers::TR_MOSI, 0x33AA).unwrap();
        sim.write32(registers::TR_MISO_FLAG, 1).unwrap();
        sim.write32(registers::TR_MISO_MASK, 0xFF07).unwrap();
        sim.write32(registers::TR_MISO, 0x3303).unwrap();

        let transfers = sim.spi_transfers(&[]);
        assert_eq!(transfers.len(), SIM_MOSI_WORDS);
        assert_eq!(transfers[1].mosi, 0x33AA);

        assert_eq!(sim.simulate_transfers(&[]), (TriggerState::MosiMatched, None));
        assert_eq!(
            sim.simulate_transfers(&[0, 0, 0, 0x33F3]),
            (TriggerState::Triggered, Some(3))
        );
    }
}
