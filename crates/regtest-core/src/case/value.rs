use crate::{
    error::CanonicalError,
    identity::{
        Canonical,
        Canonicalize,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// A build option or input-file value as written in a case manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    /// Loose truthiness used for feature toggles (`0`, `""` and `false` are off)
    pub fn is_truthy(&self) -> bool {
        match self {
            ConfigValue::Bool(b) => *b,
            ConfigValue::Int(i) => *i != 0,
            ConfigValue::Float(f) => *f != 0.0,
            ConfigValue::Str(s) => !s.is_empty(),
            ConfigValue::List(items) => !items.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

/// Renders values the way the build configuration script and the input
/// files expect them (`True`, `1.0`, `2`).
impl fmt::Display for ConfigValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigValue::Bool(true) => f.write_str("True"),
            ConfigValue::Bool(false) => f.write_str("False"),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{:?}", x),
            ConfigValue::Str(s) => f.write_str(s),
            ConfigValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            },
        }
    }
}

impl Canonicalize for ConfigValue {
    fn canonicalize(&self) -> Result<Canonical, CanonicalError> {
        match self {
            ConfigValue::Bool(b) => b.canonicalize(),
            ConfigValue::Int(i) => i.canonicalize(),
            ConfigValue::Float(x) => x.canonicalize(),
            ConfigValue::Str(s) => s.canonicalize(),
            ConfigValue::List(items) => items.canonicalize(),
        }
    }
}
