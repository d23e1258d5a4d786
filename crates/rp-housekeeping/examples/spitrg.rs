//! SPI trigger demo
//!
//! Turns on the simulated SPI master and arms the two-stage trigger:
//! MOSI word 0x33AA followed by a MISO word matching 0x3303 under mask
//! 0xFF07.
//!
//! Run on the board:
//! ```bash
//! sudo cargo run --example spitrg
//! ```
//!
//! or anywhere with the software register image:
//! ```bash
//! RP_HK_BACKEND=sim RUST_LOG=rp_housekeeping=trace cargo run --example spitrg
//! ```

use std::process::ExitCode;

use rp_housekeeping::{init_logging, HkConfig, SpiTriggerSetup};

fn main() -> ExitCode {
    println!("SPI Trigger");

    let config = match HkConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log);

    let mut hk = match rp_housekeeping::open(&config) {
        Ok(hk) => hk,
        Err(e) => {
            eprintln!("Red Pitaya API init failed! ({})", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = hk.apply_spi_setup(&SpiTriggerSetup::default()) {
        eprintln!("Failed to program SPI trigger: {}", e);
        return ExitCode::FAILURE;
    }
    tracing::info!(state = ?hk.spi_trigger().map(|t| t.state()), "SPI trigger armed");

    match hk.release() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to release housekeeping block: {}", e);
            ExitCode::FAILURE
        }
    }
}
