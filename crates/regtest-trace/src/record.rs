//! The unit of data flowing from producers to sinks

use chrono::{
    DateTime,
    Local,
};
use serde::{
    Serialize,
    Serializer,
};
use std::{
    collections::BTreeMap,
    fmt,
};
use tracing::Level;

/// Placeholder written when a record carries no case or phase
pub const NO_CONTEXT: &str = "-";

fn serialize_level<S: Serializer>(
    level: &Level,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(level.as_str())
}

/// A log event, enriched with the producer's context at creation time.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    pub test_id: Option<String>,
    pub phase: Option<String>,
    pub thread: Option<String>,
}

impl LogRecord {
    pub fn test_id_or_placeholder(&self) -> &str {
        self.test_id.as_deref().unwrap_or(NO_CONTEXT)
    }

    pub fn phase_or_placeholder(&self) -> &str {
        self.phase.as_deref().unwrap_or(NO_CONTEXT)
    }

    /// Message followed by any structured fields as `key=value`
    pub fn body(&self) -> RecordBody<'_> {
        RecordBody(self)
    }
}

pub struct RecordBody<'a>(&'a LogRecord);

impl fmt::Display for RecordBody<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0.message)?;
        for (key, value) in &self.0.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}
