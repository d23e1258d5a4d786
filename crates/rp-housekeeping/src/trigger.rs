//! SPI trigger matching model
//!
//! The FPGA arms on a MOSI word that matches `tr_mosi` under `tr_mosi_mask`.
//! With `tr_miso_flag` clear that match fires the trigger directly; with the
//! flag set the trigger fires only when a later transfer's MISO word matches
//! `tr_miso` under `tr_miso_mask`.
//!
//! ```text
//!            MOSI match, gate clear
//!   Idle ────────────────────────────────► Triggered
//!    │                                        ▲
//!    │ MOSI match, gate set                   │ MISO match
//!    ▼                                        │ (later transfer)
//!   MosiMatched ──────────────────────────────┘
//! ```
//!
//! `Triggered` is sticky until [`SpiTrigger::rearm`].

use crate::registers::{field, SIM_BITS_MAX};
use crate::types::RegisterImage;

/// Mask + pattern pair; mask bits set to 0 are "don't care"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerPattern {
    /// Bits that take part in the comparison
    pub mask: u32,

    /// Expected value of the compared bits
    pub pattern: u32,
}

impl TriggerPattern {
    pub fn new(mask: u32, pattern: u32) -> Self {
        Self { mask, pattern }
    }

    /// Compare a word against the pattern, ignoring don't-care bits
    pub fn matches(&self, word: u32) -> bool {
        (word ^ self.pattern) & self.mask == 0
    }
}

/// Trigger state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Waiting for a MOSI match
    Idle,
    /// MOSI matched, waiting for a MISO match
    MosiMatched,
    /// Trigger fired
    Triggered,
}

/// One simulated SPI transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiTransfer {
    pub mosi: u32,
    pub miso: u32,
}

/// Mask selecting the low `bits` bits of a transfer word
pub fn word_mask(bits: u32) -> u32 {
    match bits {
        0 => 0,
        b if b >= SIM_BITS_MAX => u32::MAX,
        b => (1u32 << b) - 1,
    }
}

/// Software model of the SPI trigger matcher
#[derive(Debug, Clone)]
pub struct SpiTrigger {
    mosi: TriggerPattern,
    miso: TriggerPattern,
    miso_gate: bool,
    state: TriggerState,
}

impl SpiTrigger {
    /// Create an armed trigger
    pub fn new(mosi: TriggerPattern, miso: TriggerPattern, miso_gate: bool) -> Self {
        Self {
            mosi,
            miso,
            miso_gate,
            state: TriggerState::Idle,
        }
    }

    /// Build the trigger programmed in a register snapshot
    pub fn from_image(image: &RegisterImage) -> Self {
        Self::new(
            TriggerPattern::new(image.field(&field::TR_MOSI_MASK), image.field(&field::TR_MOSI)),
            TriggerPattern::new(image.field(&field::TR_MISO_MASK), image.field(&field::TR_MISO)),
            image.field(&field::TR_MISO_FLAG) != 0,
        )
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_triggered(&self) -> bool {
        self.state == TriggerState::Triggered
    }

    /// Return to `Idle`
    pub fn rearm(&mut self) {
        self.state = TriggerState::Idle;
    }

    /// Feed one transfer through the matcher
    pub fn observe(&mut self, transfer: SpiTransfer) -> TriggerState {
        self.state = match self.state {
            TriggerState::Idle if self.mosi.matches(transfer.mosi) => {
                if self.miso_gate {
                    TriggerState::MosiMatched
                } else {
                    TriggerState::Triggered
                }
            }
            TriggerState::MosiMatched if self.miso.matches(transfer.miso) => {
                TriggerState::Triggered
            }
            state => state,
        };
        self.state
    }

    /// Feed transfers until the trigger fires
    ///
    /// Returns the index of the transfer that fired the trigger.
    pub fn run<I>(&mut self, transfers: I) -> Option<usize>
    where
        I: IntoIterator<Item = SpiTransfer>,
    {
        for (index, transfer) in transfers.into_iter().enumerate() {
            if self.observe(transfer) == TriggerState::Triggered {
                return Some(index);
            }
        }
        None
    }
}
