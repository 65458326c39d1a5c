use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::span;
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A log record held in memory by the capture layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: u64,
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    pub fields: Option<String>,
    pub span_id: Option<String>,
    /// GraphQL operation name, taken from the event or an enclosing span.
    pub operation: Option<String>,
}

/// Query parameters for searching captured logs.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    pub level: Option<String>,
    pub target: Option<String>,
    pub operation: Option<String>,
    pub limit: Option<usize>,
}

/// Records kept by [`LogSink::new`].
const DEFAULT_SINK_CAPACITY: usize = 1000;

/// In-memory ring of captured log records. Once full, the oldest record is
/// dropped for each new one.
pub struct LogSink {
    records: Mutex<VecDeque<LogRecord>>,
    capacity: usize,
    next_id: Mutex<u64>,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SINK_CAPACITY)
    }
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_SINK_CAPACITY))),
            capacity: capacity.max(1),
            next_id: Mutex::new(0),
        }
    }

    fn insert(&self, record: LogInsert) {
        let id = {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            *next_id
        };
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(LogRecord {
            id,
            timestamp: record.timestamp,
            level: record.level,
            target: record.target,
            message: record.message,
            fields: record.fields,
            span_id: record.span_id,
            operation: record.operation,
        });
    }

    /// Matching records, most recent first.
    pub fn query(&self, q: &LogQuery) -> Vec<LogRecord> {
        let records = self.records.lock();
        records
            .iter()
            .rev()
            .filter(|r| q.level.as_ref().map_or(true, |l| &r.level == l))
            .filter(|r| q.target.as_ref().map_or(true, |t| r.target.contains(t.as_str())))
            .filter(|r| q.operation.is_none() || r.operation == q.operation)
            .take(q.limit.unwrap_or(100))
            .cloned()
            .collect()
    }

    /// Records currently held.
    pub fn count(&self) -> usize {
        self.records.lock().len()
    }
}

/// Internal insert record (not public).
struct LogInsert {
    timestamp: String,
    level: String,
    target: String,
    message: String,
    fields: Option<String>,
    span_id: Option<String>,
    operation: Option<String>,
}

/// tracing Layer that captures events at or above `min_level` into a [`LogSink`].
pub struct CaptureLayer {
    sink: Arc<LogSink>,
    min_level: Level,
}

impl CaptureLayer {
    /// Captures warn+ events.
    pub fn new(sink: Arc<LogSink>) -> Self {
        Self::with_min_level(sink, Level::WARN)
    }

    pub fn with_min_level(sink: Arc<LogSink>, min_level: Level) -> Self {
        Self { sink, min_level }
    }
}

/// Visitor that extracts fields from a tracing event.
struct FieldVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
    operation: Option<String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: serde_json::Map::new(),
            operation: None,
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let val = format!("{:?}", value);
        match field.name() {
            "message" => self.message = Some(val),
            "operation" => self.operation = Some(val.trim_matches('"').to_string()),
            name => {
                self.fields
                    .insert(name.to_string(), serde_json::Value::String(val));
            }
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "operation" => self.operation = Some(value.to_string()),
            name => {
                self.fields
                    .insert(name.to_string(), serde_json::Value::String(value.to_string()));
            }
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        // Lower levels compare greater (TRACE > DEBUG > ... > ERROR)
        let level = *event.metadata().level();
        if level > self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        if visitor.operation.is_none() {
            if let Some(scope) = ctx.event_scope(event) {
                for span in scope {
                    let extensions = span.extensions();
                    if let Some(fields) = extensions.get::<SpanFields>() {
                        visitor.operation.clone_from(&fields.operation);
                        break;
                    }
                }
            }
        }

        let span_id = ctx
            .event_scope(event)
            .and_then(|mut scope| scope.next())
            .map(|span| format!("{:?}", span.id()));

        let fields_json = if visitor.fields.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&visitor.fields).unwrap_or_default())
        };

        self.sink.insert(LogInsert {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string().to_uppercase(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: fields_json,
            span_id,
            operation: visitor.operation,
        });
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::new();
        attrs.record(&mut visitor);

        if visitor.operation.is_some() {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(SpanFields {
                    operation: visitor.operation,
                });
            }
        }
    }
}

/// Stored on spans to propagate the operation name to child events.
struct SpanFields {
    operation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(min_level: Level) -> (Arc<LogSink>, impl tracing::Subscriber + Send + Sync) {
        let sink = Arc::new(LogSink::new());
        let subscriber = tracing_subscriber::registry()
            .with(CaptureLayer::with_min_level(sink.clone(), min_level));
        (sink, subscriber)
    }

    #[test]
    fn warn_layer_ignores_info_and_debug() {
        let (sink, subscriber) = capture(Level::WARN);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("quiet");
            tracing::info!("still quiet");
            tracing::warn!(attempts = 3, "loud");
        });

        assert_eq!(sink.count(), 1);
        let records = sink.query(&LogQuery::default());
        assert_eq!(records[0].level, "WARN");
        assert_eq!(records[0].message, "loud");
        assert_eq!(records[0].fields.as_deref(), Some(r#"{"attempts":3}"#));
    }

    #[test]
    fn operation_is_inherited_from_span() {
        let (sink, subscriber) = capture(Level::DEBUG);
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("query", operation = "AccountSubscriptions");
            let _enter = span.enter();
            tracing::debug!("cache write");
        });

        let records = sink.query(&LogQuery {
            operation: Some("AccountSubscriptions".into()),
            ..Default::default()
        });
        assert_eq!(records.len(), 1);
        assert!(records[0].span_id.is_some());
    }

    #[test]
    fn query_filters_by_level_and_target() {
        let (sink, subscriber) = capture(Level::TRACE);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: "subrepro_client::cache", "one");
            tracing::warn!(target: "subrepro_store", "two");
            tracing::warn!(target: "subrepro_client::transport", "three");
        });

        let errors = sink.query(&LogQuery {
            level: Some("ERROR".into()),
            ..Default::default()
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "one");

        let client = sink.query(&LogQuery {
            target: Some("client".into()),
            ..Default::default()
        });
        assert_eq!(client.len(), 2);
        // Most recent first
        assert_eq!(client[0].message, "three");
    }

    #[test]
    fn query_limit() {
        let (sink, subscriber) = capture(Level::WARN);
        tracing::subscriber::with_default(subscriber, || {
            for i in 0..10 {
                tracing::warn!("msg {i}");
            }
        });

        let limited = sink.query(&LogQuery {
            limit: Some(3),
            ..Default::default()
        });
        assert_eq!(limited.len(), 3);
        assert_eq!(limited[0].message, "msg 9");
    }

    #[test]
    fn full_sink_drops_oldest_records() {
        let sink = Arc::new(LogSink::with_capacity(4));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(sink.clone()));
        tracing::subscriber::with_default(subscriber, || {
            for i in 0..10 {
                tracing::warn!("msg {i}");
            }
        });

        assert_eq!(sink.count(), 4);
        let records = sink.query(&LogQuery::default());
        assert_eq!(records[0].message, "msg 9");
        assert_eq!(records[3].message, "msg 6");
        assert_eq!(records[0].id, 10);
    }
}
