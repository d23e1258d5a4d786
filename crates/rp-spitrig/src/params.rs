//! Web parameter bindings
//!
//! A [`Parameter`] is a named value shared with the browser client. The host
//! stages new values as they arrive; nothing changes until [`Parameter::update`]
//! commits the staged value, which lets the application apply a whole batch
//! of edits at once.

use std::fmt;

use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Who may change a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamAccess {
    /// Reported to the client only
    ReadOnly,
    /// Client may set it
    ReadWrite,
}

/// Value types a parameter can carry
pub trait ParamKind: Clone + PartialEq + PartialOrd + fmt::Debug + Send + 'static {
    /// Type name used in error messages
    const TYPE_NAME: &'static str;

    /// Coerce a JSON value, `None` on type mismatch
    fn from_json(value: &Value) -> Option<Self>;

    fn to_json(&self) -> Value;
}

impl ParamKind for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ParamKind for i64 {
    const TYPE_NAME: &'static str = "int";

    // Browser inputs often arrive as strings
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl ParamKind for String {
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

/// A named, typed parameter with a staged value
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<T: ParamKind> {
    name: &'static str,
    access: ParamAccess,
    value: T,
    pending: Option<T>,
    fpga_update: bool,
    bounds: Option<(T, T)>,
}

impl<T: ParamKind> Parameter<T> {
    /// Read-write parameter with a default value
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            access: ParamAccess::ReadWrite,
            value,
            pending: None,
            fpga_update: false,
            bounds: None,
        }
    }

    /// Builder: access mode
    pub fn access(mut self, access: ParamAccess) -> Self {
        self.access = access;
        self
    }

    /// Builder: clamp staged values to `min..=max`
    pub fn bounds(mut self, min: T, max: T) -> Self {
        self.bounds = Some((min, max));
        self
    }

    /// Builder: push the value to the FPGA on every update
    pub fn fpga_update(mut self, enable: bool) -> Self {
        self.fpga_update = enable;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Committed value
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn is_fpga_update(&self) -> bool {
        self.fpga_update
    }

    /// Stage a new value, clamped to the bounds
    pub fn set(&mut self, value: T) -> AppResult<()> {
        if self.access == ParamAccess::ReadOnly {
            return Err(AppError::ReadOnly(self.name.to_string()));
        }
        let value = match &self.bounds {
            Some((min, _)) if value < *min => min.clone(),
            Some((_, max)) if value > *max => max.clone(),
            _ => value,
        };
        self.pending = Some(value);
        Ok(())
    }

    /// Commit the staged value; true if the committed value changed
    pub fn update(&mut self) -> bool {
        match self.pending.take() {
            Some(value) if value != self.value => {
                tracing::debug!(name = self.name, old = ?self.value, new = ?value, "parameter updated");
                self.value = value;
                true
            }
            _ => false,
        }
    }
}

/// Type-erased view used for name lookup and JSON exchange
pub trait DynParameter: Send {
    fn name(&self) -> &'static str;

    fn access(&self) -> ParamAccess;

    /// Stage a value received from the client
    fn set_json(&mut self, value: &Value) -> AppResult<()>;

    /// Committed value as JSON
    fn value_json(&self) -> Value;

    /// Commit the staged value
    fn update(&mut self) -> bool;
}

impl<T: ParamKind> DynParameter for Parameter<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn access(&self) -> ParamAccess {
        self.access
    }

    fn set_json(&mut self, value: &Value) -> AppResult<()> {
        let typed = T::from_json(value).ok_or_else(|| AppError::InvalidValue {
            name: self.name.to_string(),
            expected: T::TYPE_NAME,
            got: value.to_string(),
        })?;
        self.set(typed)
    }

    fn value_json(&self) -> Value {
        self.value.to_json()
    }

    fn update(&mut self) -> bool {
        Parameter::update(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_then_commit() {
        let mut p = Parameter::new("SPI_SIM_FLAG", true);
        p.set(false).unwrap();
        assert!(*p.value());
        assert_eq!(p.pending(), Some(&false));

        assert!(p.update());
        assert!(!*p.value());
        assert_eq!(p.pending(), None);
        // nothing staged
        assert!(!p.update());
    }

    #[test]
    fn test_int_clamped_to_bounds() {
        let mut p = Parameter::new("SPI_SIM_BITS", 16i64).bounds(16, 32);
        p.set(40).unwrap();
        p.update();
        assert_eq!(*p.value(), 32);
        p.set(3).unwrap();
        p.update();
        assert_eq!(*p.value(), 16);
        p.set(24).unwrap();
        p.update();
        assert_eq!(*p.value(), 24);
    }

    #[test]
    fn test_read_only_rejected() {
        let mut p = Parameter::new("SPI_STATUS", 0i64).access(ParamAccess::ReadOnly);
        assert!(matches!(p.set(1), Err(AppError::ReadOnly(_))));
        assert!(matches!(p.set_json(&json!(1)), Err(AppError::ReadOnly(_))));
    }

    #[test]
    fn test_json_coercion() {
        let mut int = Parameter::new("SPI_SIM_PERIOD", 600i64).bounds(1, 4095);
        int.set_json(&json!("1200")).unwrap();
        int.update();
        assert_eq!(int.value_json(), json!(1200));
        assert!(matches!(
            int.set_json(&json!(true)),
            Err(AppError::InvalidValue { expected: "int", .. })
        ));

        let mut flag = Parameter::new("SPI_TR_MISO_FLAG", true);
        flag.set_json(&json!(0)).unwrap();
        flag.update();
        assert_eq!(flag.value_json(), json!(false));

        // hex text stays text
        let mut hex = Parameter::new("SPI_TR_MOSI", "33AA".to_string());
        hex.set_json(&json!("0x1234")).unwrap();
        hex.update();
        assert_eq!(hex.value(), "0x1234");
        assert!(hex.set_json(&json!(1234)).is_err());
    }
}
