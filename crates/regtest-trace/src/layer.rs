//! `tracing_subscriber` layer turning events into queued, context-enriched records

use crate::{
    field_visitor::{
        ContextVisitor,
        RecordVisitor,
        SpanContext,
    },
    queue::RecordQueue,
    record::LogRecord,
};
use chrono::Local;
use std::{
    collections::BTreeMap,
    sync::Arc,
    thread,
};
use tracing::{
    Event,
    Metadata,
    Subscriber,
    level_filters::LevelFilter,
    span::{
        Attributes,
        Id,
        Record,
    },
};
use tracing_subscriber::{
    layer::{
        Context,
        Layer,
    },
    registry::LookupSpan,
};

/// Enriches every event with the innermost `test_id` and `phase` of its span
/// scope and enqueues it.
///
/// Context is resolved on the producing thread when the event is created;
/// the listener only ever sees finished records.
pub struct QueueLayer {
    queue: Arc<RecordQueue>,
    max_level: LevelFilter,
}

impl QueueLayer {
    pub(crate) fn new(
        queue: Arc<RecordQueue>,
        max_level: LevelFilter,
    ) -> Self {
        Self { queue, max_level }
    }

    fn resolve_context<S>(
        event: &Event<'_>,
        ctx: &Context<'_, S>,
    ) -> SpanContext
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let mut resolved = SpanContext::default();
        if let Some(scope) = ctx.event_scope(event) {
            // innermost first, so the closest phase wins
            for span in scope {
                if let Some(fields) = span.extensions().get::<SpanContext>() {
                    resolved.inherit(fields);
                }
                if resolved.is_complete() {
                    break;
                }
            }
        }
        resolved
    }
}

impl<S> Layer<S> for QueueLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(
        &self,
        metadata: &Metadata<'_>,
        _ctx: Context<'_, S>,
    ) -> bool {
        // context spans must exist regardless of the event level
        metadata.is_span() || self.max_level >= *metadata.level()
    }

    fn on_new_span(
        &self,
        attrs: &Attributes<'_>,
        id: &Id,
        ctx: Context<'_, S>,
    ) {
        let mut fields = SpanContext::default();
        attrs.record(&mut ContextVisitor(&mut fields));
        if fields == SpanContext::default() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(
        &self,
        id: &Id,
        values: &Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanContext>() {
            values.record(&mut ContextVisitor(fields));
        } else {
            let mut fields = SpanContext::default();
            values.record(&mut ContextVisitor(&mut fields));
            if fields != SpanContext::default() {
                extensions.insert(fields);
            }
        }
    }

    fn on_event(
        &self,
        event: &Event<'_>,
        ctx: Context<'_, S>,
    ) {
        let context = Self::resolve_context(event, &ctx);
        let mut message = String::new();
        let mut fields = BTreeMap::new();
        event.record(&mut RecordVisitor::new(&mut message, &mut fields));

        let metadata = event.metadata();
        self.queue.push(LogRecord {
            timestamp: Local::now(),
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message,
            fields,
            test_id: context.test_id,
            phase: context.phase,
            thread: thread::current().name().map(str::to_string),
        });
    }
}
