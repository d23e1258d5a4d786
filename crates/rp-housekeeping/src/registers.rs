//! Housekeeping register block layout
//!
//! All registers are little-endian 32-bit words at fixed byte offsets from
//! [`HOUSEKEEPING_BASE_ADDR`].

use crate::types::{FieldDescriptor, RegisterMap};

/// Physical base address of the housekeeping block
pub const HOUSEKEEPING_BASE_ADDR: usize = 0x0000_0000;

/// Declared size of the housekeeping block
///
/// `tr_miso` lives at 0x70, so this constant does not cover the last field.
/// It is kept as published; [`REGISTER_MAP`] reports the real span.
pub const HOUSEKEEPING_BASE_SIZE: usize = 0x70;

/// Device identifier (read-only)
pub const ID: usize = 0x00;
/// Chip DNA, low word
pub const DNA_LO: usize = 0x04;
/// Chip DNA, high word
pub const DNA_HI: usize = 0x08;
/// Digital loopback control
pub const DIGITAL_LOOP: usize = 0x0C;
/// External trigger masks, CD positive / negative edge
pub const EX_CD_P: usize = 0x10;
pub const EX_CD_N: usize = 0x14;
/// External trigger masks, CO positive / negative edge
pub const EX_CO_P: usize = 0x18;
pub const EX_CO_N: usize = 0x1C;
/// External trigger masks, CI positive / negative edge
pub const EX_CI_P: usize = 0x20;
pub const EX_CI_N: usize = 0x24;
/// LED control
pub const LED_CONTROL: usize = 0x30;

/// Flag: use the SPI simulation output
pub const SIM_FLAG: usize = 0x34;
/// Number of bits per simulated SPI transfer
pub const SIM_BITS: usize = 0x38;
/// First simulated MOSI word (words at 0x3C, 0x40, ... 0x58)
pub const SIM_MOSI_BASE: usize = 0x3C;
/// Number of simulated MOSI words
pub const SIM_MOSI_WORDS: usize = 8;
/// Fabric clock cycles per simulated SCLK
pub const SIM_PERIOD: usize = 0x5C;
/// MOSI trigger don't-care mask
pub const TR_MOSI_MASK: usize = 0x60;
/// MOSI trigger pattern
pub const TR_MOSI: usize = 0x64;
/// Flag: trigger on MISO only after the MOSI pattern matched
pub const TR_MISO_FLAG: usize = 0x68;
/// MISO trigger don't-care mask
pub const TR_MISO_MASK: usize = 0x6C;
/// MISO trigger pattern
pub const TR_MISO: usize = 0x70;

pub const DIGITAL_LOOP_MASK: u32 = 0x1;
pub const EX_CD_P_MASK: u32 = 0xFF;
pub const EX_CD_N_MASK: u32 = 0xFF;
pub const EX_CO_P_MASK: u32 = 0xFF;
pub const EX_CO_N_MASK: u32 = 0xFF;
pub const EX_CI_P_MASK: u32 = 0xFF;
pub const EX_CI_N_MASK: u32 = 0xFF;
pub const LED_CONTROL_MASK: u32 = 0xFF;
pub const SIM_FLAG_MASK: u32 = 0x1;
pub const SIM_BITS_MASK: u32 = 0x3F;
pub const TR_MISO_FLAG_MASK: u32 = 0x1;

/// Widest simulated SPI transfer in bits
pub const SIM_BITS_MAX: u32 = 32;

/// Byte offset of simulated MOSI word `index`
pub const fn sim_mosi(index: usize) -> usize {
    SIM_MOSI_BASE + index * 4
}

/// Field descriptors, one per named register field
pub mod field {
    use super::*;

    pub const ID: FieldDescriptor = FieldDescriptor::ro("id", super::ID, u32::MAX);
    pub const DNA_LO: FieldDescriptor = FieldDescriptor::ro("dna_lo", super::DNA_LO, u32::MAX);
    pub const DNA_HI: FieldDescriptor = FieldDescriptor::ro("dna_hi", super::DNA_HI, u32::MAX);
    pub const DIGITAL_LOOP: FieldDescriptor =
        FieldDescriptor::rw("digital_loop", super::DIGITAL_LOOP, DIGITAL_LOOP_MASK);
    pub const EX_CD_P: FieldDescriptor = FieldDescriptor::rw("ex_cd_p", super::EX_CD_P, EX_CD_P_MASK);
    pub const EX_CD_N: FieldDescriptor = FieldDescriptor::rw("ex_cd_n", super::EX_CD_N, EX_CD_N_MASK);
    pub const EX_CO_P: FieldDescriptor = FieldDescriptor::rw("ex_co_p", super::EX_CO_P, EX_CO_P_MASK);
    pub const EX_CO_N: FieldDescriptor = FieldDescriptor::rw("ex_co_n", super::EX_CO_N, EX_CO_N_MASK);
    pub const EX_CI_P: FieldDescriptor = FieldDescriptor::rw("ex_ci_p", super::EX_CI_P, EX_CI_P_MASK);
    pub const EX_CI_N: FieldDescriptor = FieldDescriptor::rw("ex_ci_n", super::EX_CI_N, EX_CI_N_MASK);
    pub const LED_CONTROL: FieldDescriptor =
        FieldDescriptor::rw("led_control", super::LED_CONTROL, LED_CONTROL_MASK);

    pub const SIM_FLAG: FieldDescriptor = FieldDescriptor::rw("sim_flag", super::SIM_FLAG, SIM_FLAG_MASK);
    pub const SIM_BITS: FieldDescriptor =
        FieldDescriptor::rw("sim_bits", super::SIM_BITS, SIM_BITS_MASK).bounded(SIM_BITS_MAX);
    pub const SIM_MOSI: [FieldDescriptor; SIM_MOSI_WORDS] = [
        FieldDescriptor::rw("sim_mosi0", sim_mosi(0), u32::MAX),
        FieldDescriptor::rw("sim_mosi1", sim_mosi(1), u32::MAX),
        FieldDescriptor::rw("sim_mosi2", sim_mosi(2), u32::MAX),
        FieldDescriptor::rw("sim_mosi3", sim_mosi(3), u32::MAX),
        FieldDescriptor::rw("sim_mosi4", sim_mosi(4), u32::MAX),
        FieldDescriptor::rw("sim_mosi5", sim_mosi(5), u32::MAX),
        FieldDescriptor::rw("sim_mosi6", sim_mosi(6), u32::MAX),
        FieldDescriptor::rw("sim_mosi7", sim_mosi(7), u32::MAX),
    ];
    pub const SIM_PERIOD: FieldDescriptor = FieldDescriptor::rw("sim_period", super::SIM_PERIOD, u32::MAX);
    pub const TR_MOSI_MASK: FieldDescriptor =
        FieldDescriptor::rw("tr_mosi_mask", super::TR_MOSI_MASK, u32::MAX);
    pub const TR_MOSI: FieldDescriptor = FieldDescriptor::rw("tr_mosi", super::TR_MOSI, u32::MAX);
    pub const TR_MISO_FLAG: FieldDescriptor =
        FieldDescriptor::rw("tr_miso_flag", super::TR_MISO_FLAG, TR_MISO_FLAG_MASK);
    pub const TR_MISO_MASK: FieldDescriptor =
        FieldDescriptor::rw("tr_miso_mask", super::TR_MISO_MASK, u32::MAX);
    pub const TR_MISO: FieldDescriptor = FieldDescriptor::rw("tr_miso", super::TR_MISO, u32::MAX);
}

/// Every field of the block, in offset order
pub static FIELDS: [FieldDescriptor; 27] = [
    field::ID,
    field::DNA_LO,
    field::DNA_HI,
    field::DIGITAL_LOOP,
    field::EX_CD_P,
    field::EX_CD_N,
    field::EX_CO_P,
    field::EX_CO_N,
    field::EX_CI_P,
    field::EX_CI_N,
    // reserved words at 0x28 and 0x2C are not described
    field::LED_CONTROL,
    field::SIM_FLAG,
    field::SIM_BITS,
    field::SIM_MOSI[0],
    field::SIM_MOSI[1],
    field::SIM_MOSI[2],
    field::SIM_MOSI[3],
    field::SIM_MOSI[4],
    field::SIM_MOSI[5],
    field::SIM_MOSI[6],
    field::SIM_MOSI[7],
    field::SIM_PERIOD,
    field::TR_MOSI_MASK,
    field::TR_MOSI,
    field::TR_MISO_FLAG,
    field::TR_MISO_MASK,
    field::TR_MISO,
];

/// The housekeeping register map
pub static REGISTER_MAP: RegisterMap = RegisterMap {
    name: "housekeeping",
    base: HOUSEKEEPING_BASE_ADDR,
    size: HOUSEKEEPING_BASE_SIZE,
    fields: &FIELDS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_map_is_consistent() {
        assert!(REGISTER_MAP.validate().is_ok());
        assert_eq!(REGISTER_MAP.fields.len(), 27);
    }

    #[test]
    fn test_documented_offsets() {
        assert_eq!(sim_mosi(0), 0x3C);
        assert_eq!(sim_mosi(7), 0x58);
        assert_eq!(REGISTER_MAP.find("sim_period").unwrap().offset, 0x5C);
        assert_eq!(REGISTER_MAP.find("tr_miso").unwrap().offset, 0x70);
        assert_eq!(REGISTER_MAP.find("led_control").unwrap().mask, 0xFF);
        assert_eq!(REGISTER_MAP.find("sim_bits").unwrap().max, Some(32));
    }

    #[test]
    fn test_declared_size_misses_last_field() {
        assert_eq!(REGISTER_MAP.span(), 0x74);
        let outside = REGISTER_MAP.fields_outside(HOUSEKEEPING_BASE_SIZE);
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].name, "tr_miso");
    }

    #[test]
    fn test_reserved_words_not_described() {
        assert!(REGISTER_MAP.fields.iter().all(|f| f.offset != 0x28 && f.offset != 0x2C));
    }
}
