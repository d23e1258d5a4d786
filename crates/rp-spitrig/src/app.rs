//! SPI trigger application module
//!
//! Binds the browser's SPI simulation and trigger controls to the
//! housekeeping registers. Parameters staged by the client are committed and
//! written out together in [`SpiTrigApp::on_new_params`].

use std::collections::BTreeMap;

use rp_housekeeping::{parse_hex, DynHousekeeping, HkConfig, TriggerPattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::hooks::AppHooks;
use crate::params::{DynParameter, Parameter};

/// The simulated SCLK period is programmed in units of 2^15 fabric clocks
pub const SIM_PERIOD_SHIFT: u32 = 15;

/// Wire shape of a parameter exchange: `{"parameters": {"NAME": {"value": …}}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamsMessage {
    pub parameters: BTreeMap<String, ParamEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamEntry {
    pub value: Value,
}

/// Parameters shared with the web client
#[derive(Debug, Clone, PartialEq)]
pub struct SpiTrigParams {
    pub sim_flag: Parameter<bool>,
    pub sim_bits: Parameter<i64>,
    pub sim_period: Parameter<i64>,
    pub tr_mosi_mask: Parameter<String>,
    pub tr_mosi: Parameter<String>,
    pub tr_miso_flag: Parameter<bool>,
    pub tr_miso_mask: Parameter<String>,
    pub tr_miso: Parameter<String>,
}

impl Default for SpiTrigParams {
    fn default() -> Self {
        Self {
            sim_flag: Parameter::new("SPI_SIM_FLAG", true),
            sim_bits: Parameter::new("SPI_SIM_BITS", 16).bounds(16, 32),
            sim_period: Parameter::new("SPI_SIM_PERIOD", 600).bounds(1, 4095),
            tr_mosi_mask: Parameter::new("SPI_TR_MOSI_MASK", "FFFF".to_string()),
            tr_mosi: Parameter::new("SPI_TR_MOSI", "33AA".to_string()),
            tr_miso_flag: Parameter::new("SPI_TR_MISO_FLAG", true),
            tr_miso_mask: Parameter::new("SPI_TR_MISO_MASK", "FF07".to_string()),
            tr_miso: Parameter::new("SPI_TR_MISO", "3303".to_string()),
        }
    }
}

impl SpiTrigParams {
    fn all(&self) -> [&dyn DynParameter; 8] {
        [
            &self.sim_flag,
            &self.sim_bits,
            &self.sim_period,
            &self.tr_mosi_mask,
            &self.tr_mosi,
            &self.tr_miso_flag,
            &self.tr_miso_mask,
            &self.tr_miso,
        ]
    }

    fn all_mut(&mut self) -> [&mut dyn DynParameter; 8] {
        [
            &mut self.sim_flag,
            &mut self.sim_bits,
            &mut self.sim_period,
            &mut self.tr_mosi_mask,
            &mut self.tr_mosi,
            &mut self.tr_miso_flag,
            &mut self.tr_miso_mask,
            &mut self.tr_miso,
        ]
    }

    /// Look up a parameter by its wire name
    pub fn find_mut(&mut self, name: &str) -> AppResult<&mut dyn DynParameter> {
        self.all_mut()
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| AppError::UnknownParameter(name.to_string()))
    }

    /// Stage every entry of a client message
    ///
    /// Either all entries are staged or, on the first bad entry, none are.
    pub fn stage(&mut self, message: &ParamsMessage) -> AppResult<()> {
        let mut staged = self.clone();
        for (name, entry) in &message.parameters {
            staged.find_mut(name)?.set_json(&entry.value)?;
        }
        *self = staged;
        Ok(())
    }

    /// Commit all staged values; returns how many changed
    pub fn update_all(&mut self) -> usize {
        self.all_mut().into_iter().map(|p| p.update()).filter(|&changed| changed).count()
    }

    /// Committed values in wire shape
    pub fn to_message(&self) -> ParamsMessage {
        ParamsMessage {
            parameters: self
                .all()
                .into_iter()
                .map(|p| (p.name().to_string(), ParamEntry { value: p.value_json() }))
                .collect(),
        }
    }
}

/// Register values derived from the committed parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiTrigSettings {
    pub sim_flag: bool,
    pub miso_flag: bool,
    pub sim_bits: u32,
    pub sim_period: u32,
    pub mosi: TriggerPattern,
    pub miso: TriggerPattern,
}

impl SpiTrigSettings {
    pub fn from_params(params: &SpiTrigParams) -> AppResult<Self> {
        Ok(Self {
            sim_flag: *params.sim_flag.value(),
            miso_flag: *params.tr_miso_flag.value(),
            sim_bits: to_u32(&params.sim_bits)?,
            sim_period: to_u32(&params.sim_period)? << SIM_PERIOD_SHIFT,
            mosi: TriggerPattern::new(
                parse_hex(params.tr_mosi_mask.value()),
                parse_hex(params.tr_mosi.value()),
            ),
            miso: TriggerPattern::new(
                parse_hex(params.tr_miso_mask.value()),
                parse_hex(params.tr_miso.value()),
            ),
        })
    }
}

fn to_u32(param: &Parameter<i64>) -> AppResult<u32> {
    u32::try_from(*param.value()).map_err(|_| AppError::InvalidValue {
        name: param.name().to_string(),
        expected: "u32",
        got: param.value().to_string(),
    })
}

/// The SPI trigger application
pub struct SpiTrigApp {
    config: HkConfig,
    params: SpiTrigParams,
    hk: Option<DynHousekeeping>,
}

impl SpiTrigApp {
    pub fn new(config: HkConfig) -> Self {
        Self {
            config,
            params: SpiTrigParams::default(),
            hk: None,
        }
    }

    pub fn params(&self) -> &SpiTrigParams {
        &self.params
    }

    /// Housekeeping handle while initialized
    pub fn housekeeping(&self) -> Option<&DynHousekeeping> {
        self.hk.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.hk.is_some()
    }

    /// Stage parameters from a client JSON message
    pub fn set_params_json(&mut self, json: &str) -> AppResult<()> {
        let message: ParamsMessage = serde_json::from_str(json)?;
        self.params.stage(&message)
    }

    /// Committed parameters as a client JSON message
    pub fn get_params_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(&self.params.to_message())?)
    }

    fn apply(&mut self, settings: &SpiTrigSettings) -> AppResult<()> {
        let hk = self.hk.as_mut().ok_or(AppError::NotInitialized)?;
        hk.set_sim_flag(settings.sim_flag)?;
        hk.set_miso_flag(settings.miso_flag)?;
        hk.set_sim_bits(settings.sim_bits)?;
        hk.set_sim_period(settings.sim_period)?;
        hk.set_mosi_trigger(settings.mosi)?;
        hk.set_miso_trigger(settings.miso)?;
        Ok(())
    }
}

impl Default for SpiTrigApp {
    fn default() -> Self {
        Self::new(HkConfig::default())
    }
}

impl AppHooks for SpiTrigApp {
    fn desc(&self) -> &str {
        "Red Pitaya SPI trigger.\n"
    }

    fn init(&mut self) -> AppResult<()> {
        if self.hk.is_some() {
            tracing::warn!("SPI trigger already initialized");
            return Ok(());
        }
        tracing::info!("Loading SPI trigger");
        match rp_housekeeping::open(&self.config) {
            Ok(hk) => {
                tracing::info!("Red Pitaya API init success!");
                self.hk = Some(hk);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Red Pitaya API init failed! ({})", e);
                Err(e.into())
            }
        }
    }

    fn exit(&mut self) -> AppResult<()> {
        tracing::info!("Unloading SPI trigger");
        match self.hk.take() {
            Some(hk) => Ok(hk.release()?),
            None => Ok(()),
        }
    }

    fn set_params(&mut self, params: &Value) -> AppResult<()> {
        let message = ParamsMessage::deserialize(params)?;
        self.params.stage(&message)
    }

    fn get_params(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self.params.to_message())?)
    }

    fn on_new_params(&mut self) -> AppResult<()> {
        if self.hk.is_none() {
            return Err(AppError::NotInitialized);
        }
        let changed = self.params.update_all();
        let settings = SpiTrigSettings::from_params(&self.params)?;
        tracing::debug!(changed, ?settings, "applying SPI trigger parameters");
        self.apply(&settings)
    }
}
