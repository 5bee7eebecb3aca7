//! Masking tracing layer for JSONL output.
//!
//! Every string field of every event is passed through the
//! [`SecretMasker`] before serialization, so a registered secret can
//! never reach the log stream even when a call site logs it directly.
//! This is defense in depth behind the store's own discipline of not
//! logging secret values in the first place.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::masker::SecretMasker;

/// Span fields carried onto every event inside the span.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    job_id: Option<String>,
    task_id: Option<String>,
}

struct SpanContextVisitor {
    context: SpanContext,
}

impl tracing::field::Visit for SpanContextVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "job_id" => self.context.job_id = Some(value.to_string()),
            "task_id" => self.context.task_id = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "job_id" => self.context.job_id = Some(format!("{:?}", value)),
            "task_id" => self.context.task_id = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

/// A visitor that extracts event fields, masking every string.
struct MaskedFieldVisitor<'a> {
    masker: &'a SecretMasker,
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl<'a> MaskedFieldVisitor<'a> {
    fn new(masker: &'a SecretMasker) -> Self {
        MaskedFieldVisitor {
            masker,
            fields: serde_json::Map::new(),
            message: None,
        }
    }

    fn record_masked(&mut self, field: &tracing::field::Field, value: &str) {
        let masked = self.masker.mask(value);
        if field.name() == "message" {
            self.message = Some(masked);
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(masked));
        }
    }
}

impl tracing::field::Visit for MaskedFieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record_masked(field, value);
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.record_masked(field, &s);
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(value.into()),
        );
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(serde_json::Number::from(value)),
        );
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer that masks secrets and writes to stderr.
pub struct MaskingLayer<W = io::Stderr> {
    masker: Arc<SecretMasker>,
    writer: Mutex<W>,
}

impl MaskingLayer<io::Stderr> {
    /// Create a masking layer writing to stderr.
    pub fn stderr(masker: Arc<SecretMasker>) -> Self {
        MaskingLayer {
            masker,
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> MaskingLayer<W> {
    /// Create a masking layer with a custom writer.
    pub fn new(masker: Arc<SecretMasker>, writer: W) -> Self {
        MaskingLayer {
            masker,
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for MaskingLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = SpanContextVisitor {
            context: SpanContext::default(),
        };
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let ts = Utc::now();

        let mut job_id = None;
        let mut task_id = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    if job_id.is_none() {
                        job_id.clone_from(&span_ctx.job_id);
                    }
                    if task_id.is_none() {
                        task_id.clone_from(&span_ctx.task_id);
                    }
                }
            }
        }

        let mut visitor = MaskedFieldVisitor::new(&self.masker);
        event.record(&mut visitor);

        let level = event.metadata().level().as_str().to_ascii_lowercase();
        let mut obj = serde_json::Map::new();
        obj.insert("ts".to_string(), serde_json::json!(ts.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert(
            "event".to_string(),
            serde_json::json!(event.metadata().target()),
        );
        if let Some(id) = job_id {
            obj.insert("job_id".to_string(), serde_json::json!(id));
        }
        if let Some(id) = task_id {
            obj.insert("task_id".to_string(), serde_json::json!(id));
        }
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), serde_json::json!(msg));
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}

/// Install masked JSONL logging as the global subscriber.
///
/// Filter comes from `JOBFORGE_LOG`, then `RUST_LOG`, then `info`.
/// Call once at worker startup, before any job output.
pub fn init_masked_logging(masker: Arc<SecretMasker>) {
    let filter = EnvFilter::try_from_env("JOBFORGE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(MaskingLayer::stderr(masker))
        .init();
}
