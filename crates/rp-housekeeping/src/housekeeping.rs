//! Typed field accessors for the housekeeping block
//!
//! [`Housekeeping`] owns a register backend for as long as the block is
//! mapped. Every setter goes through [`Housekeeping::write_field`], which
//! enforces the field table: read-only fields and values above a declared
//! bound are rejected, everything else is masked to the field width and
//! merged into its word so sibling bits are never touched.

use crate::error::{HkError, HkResult};
use crate::registers::{field, REGISTER_MAP, SIM_MOSI_WORDS};
use crate::traits::RegisterIo;
use crate::trigger::{SpiTrigger, TriggerPattern};
use crate::types::{Access, FieldDescriptor, RegisterImage, RegisterMap};

/// External trigger pin group and edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtPin {
    /// CD, positive edge
    CdP,
    /// CD, negative edge
    CdN,
    /// CO, positive edge
    CoP,
    /// CO, negative edge
    CoN,
    /// CI, positive edge
    CiP,
    /// CI, negative edge
    CiN,
}

impl ExtPin {
    pub const ALL: [ExtPin; 6] = [
        ExtPin::CdP,
        ExtPin::CdN,
        ExtPin::CoP,
        ExtPin::CoN,
        ExtPin::CiP,
        ExtPin::CiN,
    ];

    /// Register field holding this pin's mask
    pub fn field(self) -> &'static FieldDescriptor {
        match self {
            ExtPin::CdP => &field::EX_CD_P,
            ExtPin::CdN => &field::EX_CD_N,
            ExtPin::CoP => &field::EX_CO_P,
            ExtPin::CoN => &field::EX_CO_N,
            ExtPin::CiP => &field::EX_CI_P,
            ExtPin::CiN => &field::EX_CI_N,
        }
    }
}

/// Complete SPI simulation and two-stage trigger setup
///
/// The default is the bench setup: 16-bit simulated transfers, MOSI word
/// 0x33AA followed by a MISO word matching 0x3303 under mask 0xFF07.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiTriggerSetup {
    pub sim_flag: bool,
    pub sim_bits: u32,
    pub sim_period: u32,
    pub mosi: TriggerPattern,
    pub miso_flag: bool,
    pub miso: TriggerPattern,
}

impl Default for SpiTriggerSetup {
    fn default() -> Self {
        Self {
            sim_flag: true,
            sim_bits: 16,
            sim_period: 0x001F_FFFF,
            mosi: TriggerPattern::new(0xFFFF, 0x33AA),
            miso_flag: true,
            miso: TriggerPattern::new(0xFF07, 0x3303),
        }
    }
}

/// Owned handle to a mapped housekeeping block
pub struct Housekeeping<R: RegisterIo> {
    io: R,
    map: &'static RegisterMap,
}

impl<R: RegisterIo> Housekeeping<R> {
    /// Wrap a backend; it must cover every field of the register map
    pub fn new(io: R) -> HkResult<Self> {
        let map = &REGISTER_MAP;
        if io.size() < map.span() {
            return Err(HkError::ConfigError(format!(
                "backend '{}' covers 0x{:x} bytes, register map needs 0x{:x}",
                io.name(),
                io.size(),
                map.span()
            )));
        }
        Ok(Self { io, map })
    }

    /// The register backend
    pub fn backend(&self) -> &R {
        &self.io
    }

    /// Mutable access to the register backend
    pub fn backend_mut(&mut self) -> &mut R {
        &mut self.io
    }

    /// The register map this handle enforces
    pub fn register_map(&self) -> &'static RegisterMap {
        self.map
    }

    /// Unmap the block
    pub fn release(mut self) -> HkResult<()> {
        self.io.close()
    }

    // =========================================================================
    // Generic field access
    // =========================================================================

    /// Read a field value
    pub fn read_field(&self, field: &FieldDescriptor) -> HkResult<u32> {
        Ok(field.extract(self.io.read32(field.offset)?))
    }

    /// Write a field value, preserving all other bits of its word
    pub fn write_field(&mut self, field: &FieldDescriptor, value: u32) -> HkResult<()> {
        if field.access == Access::ReadOnly {
            return Err(HkError::ReadOnly(field.name));
        }
        if let Some(max) = field.max {
            if value > max {
                return Err(HkError::OutOfRange {
                    field: field.name,
                    value,
                    max,
                });
            }
        }

        let word = if field.is_whole_word() {
            value
        } else {
            field.insert(self.io.read32(field.offset)?, value)
        };
        tracing::trace!(
            field = field.name,
            offset = field.offset,
            word,
            "housekeeping write"
        );
        self.io.write32(field.offset, word)
    }

    /// Read a field by name
    pub fn read_named(&self, name: &str) -> HkResult<u32> {
        let field = self.map.find(name)?;
        self.read_field(field)
    }

    /// Write a field by name
    pub fn write_named(&mut self, name: &str, value: u32) -> HkResult<()> {
        let field = self.map.find(name)?;
        self.write_field(field, value)
    }

    /// Capture every word of the block
    pub fn snapshot(&self) -> HkResult<RegisterImage> {
        let words = (0..self.map.word_count())
            .map(|i| self.io.read32(i * 4))
            .collect::<HkResult<Vec<u32>>>()?;
        Ok(RegisterImage::from_words(words))
    }

    // =========================================================================
    // Board identity
    // =========================================================================

    /// Device identifier
    pub fn id(&self) -> HkResult<u32> {
        self.read_field(&field::ID)
    }

    /// 64-bit chip DNA
    pub fn dna(&self) -> HkResult<u64> {
        let lo = self.read_field(&field::DNA_LO)? as u64;
        let hi = self.read_field(&field::DNA_HI)? as u64;
        Ok(hi << 32 | lo)
    }

    // =========================================================================
    // Board controls
    // =========================================================================

    pub fn enable_digital_loop(&mut self, enable: bool) -> HkResult<()> {
        self.write_field(&field::DIGITAL_LOOP, enable as u32)
    }

    pub fn digital_loop_enabled(&self) -> HkResult<bool> {
        Ok(self.read_field(&field::DIGITAL_LOOP)? != 0)
    }

    /// Set the 8-bit mask of an external trigger pin group
    pub fn set_ext_trigger_mask(&mut self, pin: ExtPin, mask: u32) -> HkResult<()> {
        self.write_field(pin.field(), mask)
    }

    pub fn ext_trigger_mask(&self, pin: ExtPin) -> HkResult<u32> {
        self.read_field(pin.field())
    }

    /// Select the active LEDs (8-bit mask)
    pub fn set_led_control(&mut self, leds: u32) -> HkResult<()> {
        self.write_field(&field::LED_CONTROL, leds)
    }

    pub fn led_control(&self) -> HkResult<u32> {
        self.read_field(&field::LED_CONTROL)
    }

    // =========================================================================
    // SPI simulation
    // =========================================================================

    /// Substitute the internally generated pattern for the real SPI bus
    pub fn set_sim_flag(&mut self, enable: bool) -> HkResult<()> {
        self.write_field(&field::SIM_FLAG, enable as u32)
    }

    pub fn sim_flag(&self) -> HkResult<bool> {
        Ok(self.read_field(&field::SIM_FLAG)? != 0)
    }

    /// Bits per simulated transfer (0..=32)
    pub fn set_sim_bits(&mut self, bits: u32) -> HkResult<()> {
        self.write_field(&field::SIM_BITS, bits)
    }

    pub fn sim_bits(&self) -> HkResult<u32> {
        self.read_field(&field::SIM_BITS)
    }

    /// Fabric clock cycles per simulated SCLK
    pub fn set_sim_period(&mut self, period: u32) -> HkResult<()> {
        self.write_field(&field::SIM_PERIOD, period)
    }

    pub fn sim_period(&self) -> HkResult<u32> {
        self.read_field(&field::SIM_PERIOD)
    }

    fn sim_mosi_field(index: usize) -> HkResult<&'static FieldDescriptor> {
        let words: &'static [FieldDescriptor; SIM_MOSI_WORDS] = &field::SIM_MOSI;
        words.get(index).ok_or(HkError::InvalidIndex {
            field: "sim_mosi",
            index,
            max: SIM_MOSI_WORDS - 1,
        })
    }

    /// Set one word of the simulated MOSI payload
    pub fn set_sim_mosi(&mut self, index: usize, word: u32) -> HkResult<()> {
        let field = Self::sim_mosi_field(index)?;
        self.write_field(field, word)
    }

    pub fn sim_mosi(&self, index: usize) -> HkResult<u32> {
        self.read_field(Self::sim_mosi_field(index)?)
    }

    /// Load the simulated MOSI payload starting at word 0
    ///
    /// Words beyond `words.len()` are left as they are.
    pub fn set_sim_pattern(&mut self, words: &[u32]) -> HkResult<()> {
        if words.len() > SIM_MOSI_WORDS {
            return Err(HkError::InvalidIndex {
                field: "sim_mosi",
                index: words.len() - 1,
                max: SIM_MOSI_WORDS - 1,
            });
        }
        for (index, &word) in words.iter().enumerate() {
            self.set_sim_mosi(index, word)?;
        }
        Ok(())
    }

    /// All eight simulated MOSI words
    pub fn sim_pattern(&self) -> HkResult<[u32; SIM_MOSI_WORDS]> {
        let mut words = [0u32; SIM_MOSI_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            *word = self.sim_mosi(index)?;
        }
        Ok(words)
    }

    // =========================================================================
    // SPI trigger
    // =========================================================================

    /// Program the MOSI trigger mask and pattern
    pub fn set_mosi_trigger(&mut self, trigger: TriggerPattern) -> HkResult<()> {
        self.write_field(&field::TR_MOSI_MASK, trigger.mask)?;
        self.write_field(&field::TR_MOSI, trigger.pattern)
    }

    pub fn mosi_trigger(&self) -> HkResult<TriggerPattern> {
        Ok(TriggerPattern::new(
            self.read_field(&field::TR_MOSI_MASK)?,
            self.read_field(&field::TR_MOSI)?,
        ))
    }

    /// Require a MISO match after the MOSI match before triggering
    pub fn set_miso_flag(&mut self, enable: bool) -> HkResult<()> {
        self.write_field(&field::TR_MISO_FLAG, enable as u32)
    }

    pub fn miso_flag(&self) -> HkResult<bool> {
        Ok(self.read_field(&field::TR_MISO_FLAG)? != 0)
    }

    /// Program the MISO trigger mask and pattern
    pub fn set_miso_trigger(&mut self, trigger: TriggerPattern) -> HkResult<()> {
        self.write_field(&field::TR_MISO_MASK, trigger.mask)?;
        self.write_field(&field::TR_MISO, trigger.pattern)
    }

    pub fn miso_trigger(&self) -> HkResult<TriggerPattern> {
        Ok(TriggerPattern::new(
            self.read_field(&field::TR_MISO_MASK)?,
            self.read_field(&field::TR_MISO)?,
        ))
    }

    /// Program simulation and trigger registers in one pass
    ///
    /// Stops at the first rejected value; earlier registers keep their new
    /// contents.
    pub fn apply_spi_setup(&mut self, setup: &SpiTriggerSetup) -> HkResult<()> {
        self.set_sim_flag(setup.sim_flag)?;
        self.set_sim_bits(setup.sim_bits)?;
        self.set_sim_period(setup.sim_period)?;
        self.set_mosi_trigger(setup.mosi)?;
        self.set_miso_flag(setup.miso_flag)?;
        self.set_miso_trigger(setup.miso)
    }

    /// Software model of the trigger as currently programmed
    pub fn spi_trigger(&self) -> HkResult<SpiTrigger> {
        Ok(SpiTrigger::new(
            self.mosi_trigger()?,
            self.miso_trigger()?,
            self.miso_flag()?,
        ))
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::registers;
    use crate::sim::SimulatedBlock;
    use crate::trigger::TriggerState;

    fn hk() -> Housekeeping<SimulatedBlock> {
        Housekeeping::new(SimulatedBlock::new().with_identity(0x1, 0x00AB_CDEF_0123_4567)).unwrap()
    }

    #[test]
    fn test_backend_must_cover_map() {
        let short = SimulatedBlock::with_size(registers::HOUSEKEEPING_BASE_SIZE);
        assert!(matches!(Housekeeping::new(short), Err(HkError::ConfigError(_))));
    }

    #[test]
    fn test_identity() {
        let hk = hk();
        assert_eq!(hk.id().unwrap(), 0x1);
        assert_eq!(hk.dna().unwrap(), 0x00AB_CDEF_0123_4567);
    }

    #[test]
    fn test_read_only_rejected() {
        let mut hk = hk();
        assert!(matches!(hk.write_field(&field::ID, 5), Err(HkError::ReadOnly("id"))));
        assert!(matches!(hk.write_named("dna_hi", 5), Err(HkError::ReadOnly("dna_hi"))));
        assert!(hk.backend().writes().is_empty());
    }

    #[test]
    fn test_masked_read_back() {
        let mut hk = hk();
        for f in REGISTER_MAP.fields.iter().filter(|f| f.access == Access::ReadWrite) {
            for v in [0u32, 1, 0x5A, 0xFF, 0x1FF, 0xDEAD_BEEF, u32::MAX] {
                if f.max.is_some_and(|max| v > max) {
                    continue;
                }
                hk.write_field(f, v).unwrap();
                assert_eq!(hk.read_field(f).unwrap(), v & f.mask, "field {}", f.name);
            }
        }
    }

    #[test]
    fn test_partial_field_preserves_word_bits() {
        let mut hk = hk();
        // Bits outside the field were set behind the accessor's back
        hk.backend_mut().write32(registers::DIGITAL_LOOP, 0xFFFF_FF00).unwrap();
        hk.enable_digital_loop(true).unwrap();
        assert_eq!(hk.backend().read32(registers::DIGITAL_LOOP).unwrap(), 0xFFFF_FF01);
        hk.enable_digital_loop(false).unwrap();
        assert_eq!(hk.backend().read32(registers::DIGITAL_LOOP).unwrap(), 0xFFFF_FF00);

        hk.backend_mut().write32(registers::LED_CONTROL, 0x1234_5600).unwrap();
        hk.set_led_control(0x1A5).unwrap();
        assert_eq!(hk.backend().read32(registers::LED_CONTROL).unwrap(), 0x1234_56A5);
        assert_eq!(hk.led_control().unwrap(), 0xA5);
    }

    #[test]
    fn test_write_touches_only_its_word() {
        let mut hk = hk();
        for pin in ExtPin::ALL {
            let before = hk.snapshot().unwrap();
            hk.set_ext_trigger_mask(pin, 0xC3).unwrap();
            let after = hk.snapshot().unwrap();
            assert_eq!(before.diff(&after), vec![pin.field().offset]);
            assert_eq!(hk.ext_trigger_mask(pin).unwrap(), 0xC3);
        }
    }

    #[test]
    fn test_sim_bits_bounds() {
        let mut hk = hk();
        hk.set_sim_bits(32).unwrap();
        assert_eq!(hk.sim_bits().unwrap(), 32);
        hk.backend_mut().clear_writes();

        let err = hk.set_sim_bits(33).unwrap_err();
        assert!(matches!(err, HkError::OutOfRange { field: "sim_bits", value: 33, max: 32 }));
        assert!(hk.set_sim_bits(0x40).is_err());
        // rejected writes leave the register and its neighbours untouched
        assert!(hk.backend().writes().is_empty());
        assert_eq!(hk.sim_bits().unwrap(), 32);
    }

    #[test]
    fn test_sim_pattern() {
        let mut hk = hk();
        hk.set_sim_pattern(&[0x33AA, 0x1234]).unwrap();
        assert_eq!(hk.sim_mosi(0).unwrap(), 0x33AA);
        assert_eq!(hk.sim_mosi(1).unwrap(), 0x1234);
        assert_eq!(hk.sim_pattern().unwrap()[2..], [0; 6]);

        assert!(matches!(
            hk.set_sim_mosi(8, 1),
            Err(HkError::InvalidIndex { index: 8, max: 7, .. })
        ));
        assert!(hk.set_sim_pattern(&[0; 9]).is_err());
    }

    #[test]
    fn test_unknown_named_field() {
        let hk = hk();
        assert!(matches!(hk.read_named("reserved_2"), Err(HkError::UnknownField(_))));
    }

    #[test]
    fn test_spi_trigger_scenario() {
        let mut hk = hk();
        let before = hk.snapshot().unwrap();

        hk.apply_spi_setup(&SpiTriggerSetup::default()).unwrap();

        // each call wrote exactly its own word, in order
        assert_eq!(
            hk.backend().writes(),
            &[
                (registers::SIM_FLAG, 1),
                (registers::SIM_BITS, 16),
                (registers::SIM_PERIOD, 0x01F_FFFF),
                (registers::TR_MOSI_MASK, 0xFFFF),
                (registers::TR_MOSI, 0x33AA),
                (registers::TR_MISO_FLAG, 1),
                (registers::TR_MISO_MASK, 0xFF07),
                (registers::TR_MISO, 0x3303),
            ]
        );
        let after = hk.snapshot().unwrap();
        assert_eq!(
            before.diff(&after),
            vec![
                registers::SIM_FLAG,
                registers::SIM_BITS,
                registers::SIM_PERIOD,
                registers::TR_MOSI_MASK,
                registers::TR_MOSI,
                registers::TR_MISO_FLAG,
                registers::TR_MISO_MASK,
                registers::TR_MISO,
            ]
        );

        let mut trigger = hk.spi_trigger().unwrap();
        trigger.observe(crate::SpiTransfer { mosi: 0x33AA, miso: 0 });
        assert_eq!(trigger.state(), TriggerState::MosiMatched);
    }

    #[test]
    fn test_rejected_setup_stops_early() {
        let mut hk = hk();
        let setup = SpiTriggerSetup {
            sim_bits: 33,
            ..SpiTriggerSetup::default()
        };
        assert!(matches!(
            hk.apply_spi_setup(&setup),
            Err(HkError::OutOfRange { field: "sim_bits", .. })
        ));
        assert_eq!(hk.backend().writes(), &[(registers::SIM_FLAG, 1)]);
        assert_eq!(hk.mosi_trigger().unwrap(), TriggerPattern::default());
    }

    #[test]
    fn test_release() {
        let hk = hk();
        assert!(hk.release().is_ok());
    }
}
