//! # SPI Trigger Application
//!
//! Web application module that exposes the housekeeping block's SPI
//! simulation and trigger settings as client parameters.
//!
//! The host calls the [`AppHooks`] methods: `init` maps the block,
//! `set_params` stages values from the browser, `on_new_params` commits them
//! and programs the registers, and `exit` releases the mapping.
//!
//! ```rust
//! use rp_housekeeping::HkConfig;
//! use rp_spitrig::{AppHooks, SpiTrigApp};
//!
//! let mut app = SpiTrigApp::new(HkConfig::simulated());
//! app.init()?;
//! app.set_params_json(r#"{"parameters":{"SPI_SIM_BITS":{"value":24}}}"#)?;
//! app.on_new_params()?;
//! app.exit()?;
//! # Ok::<(), rp_spitrig::AppError>(())
//! ```

pub mod app;
pub mod error;
pub mod hooks;
pub mod params;

pub use app::{ParamEntry, ParamsMessage, SpiTrigApp, SpiTrigParams, SpiTrigSettings};
pub use error::{AppError, AppResult};
pub use hooks::{AppHooks, Signal};
pub use params::{DynParameter, ParamAccess, ParamKind, Parameter};
