//! Field visitors for events and context spans

use std::{
    collections::BTreeMap,
    fmt,
};
use tracing::field::{
    Field,
    Visit,
};

pub(crate) const TEST_ID_FIELD: &str = "test_id";
pub(crate) const PHASE_FIELD: &str = "phase";

/// Collects the message and the remaining fields of an event as strings
pub(crate) struct RecordVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut BTreeMap<String, String>,
}

impl<'a> RecordVisitor<'a> {
    pub(crate) fn new(
        message: &'a mut String,
        fields: &'a mut BTreeMap<String, String>,
    ) -> Self {
        Self { message, fields }
    }
}

impl Visit for RecordVisitor<'_> {
    fn record_debug(
        &mut self,
        field: &Field,
        value: &dyn fmt::Debug,
    ) {
        if field.name() == "message" {
            *self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    // Display values (`%`) arrive here without Debug quoting
    fn record_str(
        &mut self,
        field: &Field,
        value: &str,
    ) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }
}

/// Context fields stored in the extensions of a span
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SpanContext {
    pub(crate) test_id: Option<String>,
    pub(crate) phase: Option<String>,
}

impl SpanContext {
    pub(crate) fn is_complete(&self) -> bool {
        self.test_id.is_some() && self.phase.is_some()
    }

    /// Fill the fields still missing here from an enclosing span
    pub(crate) fn inherit(
        &mut self,
        outer: &SpanContext,
    ) {
        if self.test_id.is_none() {
            self.test_id.clone_from(&outer.test_id);
        }
        if self.phase.is_none() {
            self.phase.clone_from(&outer.phase);
        }
    }
}

pub(crate) struct ContextVisitor<'a>(pub(crate) &'a mut SpanContext);

impl Visit for ContextVisitor<'_> {
    fn record_debug(
        &mut self,
        field: &Field,
        value: &dyn fmt::Debug,
    ) {
        self.record_str(field, &format!("{:?}", value));
    }

    fn record_str(
        &mut self,
        field: &Field,
        value: &str,
    ) {
        match field.name() {
            TEST_ID_FIELD => self.0.test_id = Some(value.to_string()),
            PHASE_FIELD => self.0.phase = Some(value.to_string()),
            _ => {},
        }
    }
}
