use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

/// Importance of a case; a run selects cases at or above a minimum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(transparent)]
pub struct Priority(pub u32);

impl Priority {
    pub const HIGH: Priority = Priority(30);
    pub const MEDIUM: Priority = Priority(20);
    pub const LOW: Priority = Priority(10);

    pub fn value(self) -> u32 {
        self.0
    }
}

impl FromStr for Priority {
    type Err = String;

    /// `high`, `medium`, `low` (any case) or a non-negative integer
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::HIGH),
            "medium" => Ok(Priority::MEDIUM),
            "low" => Ok(Priority::LOW),
            other => other.parse::<u32>().map(Priority).map_err(|_| {
                format!(
                    "Invalid string priority: '{}'. Must be 'high', 'medium', 'low', or a non-negative integer.",
                    s
                )
            }),
        }
    }
}

impl TryFrom<i64> for Priority {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value).map(Priority).map_err(|_| {
            format!("Integer priority must be non-negative, got {}.", value)
        })
    }
}

impl fmt::Display for Priority {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriority {
    Int(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawPriority::deserialize(deserializer)? {
            RawPriority::Int(i) => Priority::try_from(i),
            RawPriority::Name(name) => name.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}
