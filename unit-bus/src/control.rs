use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Value of a unit control. Chain descriptions carry these as plain JSON
/// scalars, so `5` is an `Int` and `5.0` a `Float`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Bool,
    Int,
    Float,
    Str,
}

impl ControlValue {
    pub fn kind(&self) -> ControlKind {
        match self {
            ControlValue::Bool(_) => ControlKind::Bool,
            ControlValue::Int(_) => ControlKind::Int,
            ControlValue::Float(_) => ControlKind::Float,
            ControlValue::Str(_) => ControlKind::Str,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ControlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ControlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ControlValue::Float(v) => Some(*v),
            ControlValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ControlValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ControlValue {
    fn from(v: bool) -> Self {
        ControlValue::Bool(v)
    }
}

impl From<i64> for ControlValue {
    fn from(v: i64) -> Self {
        ControlValue::Int(v)
    }
}

impl From<i32> for ControlValue {
    fn from(v: i32) -> Self {
        ControlValue::Int(v as i64)
    }
}

impl From<u32> for ControlValue {
    fn from(v: u32) -> Self {
        ControlValue::Int(v as i64)
    }
}

impl From<u8> for ControlValue {
    fn from(v: u8) -> Self {
        ControlValue::Int(v as i64)
    }
}

impl From<f64> for ControlValue {
    fn from(v: f64) -> Self {
        ControlValue::Float(v)
    }
}

impl From<&str> for ControlValue {
    fn from(v: &str) -> Self {
        ControlValue::Str(v.to_string())
    }
}

impl From<String> for ControlValue {
    fn from(v: String) -> Self {
        ControlValue::Str(v)
    }
}

/// The declared controls of one unit. Only controls declared up front can be
/// set, and a set value keeps the declared kind (an `Int` is widened when the
/// control is a `Float`).
#[derive(Clone, Debug)]
pub struct Controls {
    unit: String,
    values: BTreeMap<String, ControlValue>,
}

impl Controls {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            values: BTreeMap::new(),
        }
    }

    /// Declare a control with its default value.
    pub fn with(mut self, name: &str, default: impl Into<ControlValue>) -> Self {
        self.values.insert(name.to_string(), default.into());
        self
    }

    pub fn set(&mut self, name: &str, value: ControlValue) -> Result<(), BusError> {
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| BusError::UnknownControl {
                unit: self.unit.clone(),
                control: name.to_string(),
            })?;

        let value = match (slot.kind(), value) {
            (ControlKind::Float, ControlValue::Int(v)) => ControlValue::Float(v as f64),
            (expected, value) if expected == value.kind() => value,
            (expected, value) => {
                return Err(BusError::ControlType {
                    unit: self.unit.clone(),
                    control: name.to_string(),
                    expected,
                    got: value.kind(),
                });
            }
        };
        *slot = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ControlValue> {
        self.values.get(name)
    }

    pub fn bool(&self, name: &str) -> bool {
        self.get(name).and_then(ControlValue::as_bool).unwrap_or(false)
    }

    pub fn int(&self, name: &str) -> i64 {
        self.get(name).and_then(ControlValue::as_int).unwrap_or(0)
    }

    pub fn float(&self, name: &str) -> f64 {
        self.get(name).and_then(ControlValue::as_float).unwrap_or(0.0)
    }

    pub fn str(&self, name: &str) -> &str {
        self.get(name).and_then(ControlValue::as_str).unwrap_or("")
    }
}
