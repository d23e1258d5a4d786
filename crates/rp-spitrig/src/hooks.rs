//! Application lifecycle hooks
//!
//! The web host loads an application module and calls these hooks around
//! its parameter and signal exchange with the browser. Every hook has a
//! no-op default so an application only implements what it uses.

use serde_json::Value;

use crate::error::AppResult;

/// A named data series streamed to the client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signal {
    pub name: String,
    pub values: Vec<f32>,
}

/// Hooks called by the web application host
pub trait AppHooks {
    /// One-line description shown by the host
    fn desc(&self) -> &str {
        ""
    }

    /// Application loaded
    fn init(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Application unloaded
    fn exit(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Parameter message received from the client
    fn set_params(&mut self, _params: &Value) -> AppResult<()> {
        Ok(())
    }

    /// Current parameters for the client
    fn get_params(&self) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Signals to send to the client
    fn get_signals(&self) -> Vec<Signal> {
        Vec::new()
    }

    fn update_signals(&mut self) {}

    fn update_params(&mut self) {}

    /// Staged parameters are ready to be committed
    fn on_new_params(&mut self) -> AppResult<()> {
        Ok(())
    }

    fn on_new_signals(&mut self) {}

    fn post_update_signals(&mut self) {}
}
