//! # Red Pitaya Housekeeping
//!
//! Access to the housekeeping register block of the Red Pitaya FPGA image:
//! board identity, digital loopback, expansion-connector trigger masks, LED
//! control, and the SPI simulation and trigger unit.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Housekeeping<R>                 │
//! │      typed accessors, range and RO checks        │
//! ├──────────────────────────────────────────────────┤
//! │          REGISTER_MAP (FieldDescriptor[])        │
//! ├────────────────────────┬─────────────────────────┤
//! │      DevMemBlock       │     SimulatedBlock      │
//! │   /dev/mem + mmap      │   little-endian image   │
//! └────────────────────────┴─────────────────────────┘
//!              RegisterIo (read32 / write32)
//! ```
//!
//! ## Feature Flags
//!
//! - `sim` (default): software register image, no hardware needed
//! - `devmem` (default): `/dev/mem` backend, Linux only
//!
//! ## Quick Start
//!
//! ```rust
//! use rp_housekeeping::{HkConfig, TriggerPattern};
//!
//! let mut hk = rp_housekeeping::open(&HkConfig::simulated())?;
//! hk.set_sim_flag(true)?;
//! hk.set_sim_bits(16)?;
//! hk.set_mosi_trigger(TriggerPattern::new(0xFFFF, 0x33AA))?;
//! hk.release()?;
//! # Ok::<(), rp_housekeeping::HkError>(())
//! ```

pub mod config;
pub mod error;
pub mod hex;
pub mod housekeeping;
pub mod logging;
pub mod registers;
pub mod traits;
pub mod trigger;
pub mod types;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(all(feature = "devmem", unix))]
pub mod devmem;

pub use config::{BackendKind, HkConfig};
pub use error::{HkError, HkResult};
pub use hex::{parse_hex, parse_hex_strict};
pub use housekeeping::{ExtPin, Housekeeping, SpiTriggerSetup};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use registers::REGISTER_MAP;
pub use traits::RegisterIo;
pub use trigger::{SpiTransfer, SpiTrigger, TriggerPattern, TriggerState};
pub use types::{Access, FieldDescriptor, RegisterImage, RegisterMap};

#[cfg(feature = "sim")]
pub use sim::SimulatedBlock;

#[cfg(all(feature = "devmem", unix))]
pub use devmem::DevMemBlock;

/// Housekeeping handle over whichever backend the configuration selected
pub type DynHousekeeping = Housekeeping<Box<dyn RegisterIo>>;

/// Map the housekeeping block
///
/// The mapped length covers every field of [`REGISTER_MAP`] even when the
/// configured block size is smaller. On the board backend only one mapping
/// may be live at a time; call [`Housekeeping::release`] before opening
/// again.
pub fn open(config: &HkConfig) -> HkResult<DynHousekeeping> {
    REGISTER_MAP.validate()?;

    let span = REGISTER_MAP.span();
    if config.block_size < span {
        let outside: Vec<&str> = REGISTER_MAP
            .fields_outside(config.block_size)
            .iter()
            .map(|f| f.name)
            .collect();
        tracing::warn!(
            block_size = config.block_size,
            span,
            fields = ?outside,
            "Declared block size does not cover all fields; mapping 0x{:x} bytes",
            span
        );
    }
    let len = config.block_size.max(span);

    let io = open_backend(config, resolve_backend(config.backend), len)?;
    tracing::debug!(backend = io.name(), size = io.size(), "housekeeping block opened");
    Housekeeping::new(io)
}

/// Whether the board backend is usable on this machine
pub fn hardware_available() -> bool {
    #[cfg(all(feature = "devmem", unix))]
    {
        DevMemBlock::is_platform_available()
    }
    #[cfg(not(all(feature = "devmem", unix)))]
    {
        false
    }
}

fn resolve_backend(kind: BackendKind) -> BackendKind {
    match kind {
        BackendKind::Auto if hardware_available() => BackendKind::DevMem,
        BackendKind::Auto => {
            tracing::info!("No board detected, using simulated housekeeping block");
            BackendKind::Simulated
        }
        other => other,
    }
}

#[allow(unused_variables)]
fn open_backend(config: &HkConfig, kind: BackendKind, len: usize) -> HkResult<Box<dyn RegisterIo>> {
    match kind {
        #[cfg(all(feature = "devmem", unix))]
        BackendKind::DevMem => Ok(Box::new(DevMemBlock::open(
            &config.dev_mem_path,
            config.phys_base,
            len,
        )?)),
        #[cfg(feature = "sim")]
        BackendKind::Simulated => Ok(Box::new(
            SimulatedBlock::with_size(len).with_identity(config.sim_id, config.sim_dna),
        )),
        _ => Err(HkError::PlatformNotSupported),
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;

    #[test]
    fn test_open_simulated() {
        let config = HkConfig::simulated().sim_identity(0x2, 0x1234);
        let mut hk = open(&config).unwrap();
        assert_eq!(hk.backend().name(), "sim");
        assert_eq!(hk.backend().size(), 0x74);
        assert_eq!(hk.id().unwrap(), 0x2);
        assert_eq!(hk.dna().unwrap(), 0x1234);

        // tr_miso sits past the declared 0x70 bytes and is still reachable
        hk.set_miso_trigger(TriggerPattern::new(0xFF07, 0x3303)).unwrap();
        assert_eq!(hk.miso_trigger().unwrap().pattern, 0x3303);
        hk.release().unwrap();
    }

    #[test]
    fn test_open_larger_block() {
        let hk = open(&HkConfig::simulated().block_size(0x100)).unwrap();
        assert_eq!(hk.backend().size(), 0x100);
    }

    #[test]
    fn test_resolve_backend() {
        assert_eq!(resolve_backend(BackendKind::DevMem), BackendKind::DevMem);
        assert_eq!(resolve_backend(BackendKind::Simulated), BackendKind::Simulated);
        let auto = resolve_backend(BackendKind::Auto);
        assert_ne!(auto, BackendKind::Auto);
    }
}
