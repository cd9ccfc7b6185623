//! Execution trace capture.
//!
//! [`TraceRecorder`] is a `tracing` layer that stays dormant until a capture
//! is started. While a [`TraceCapture`] is alive every event that passes the
//! global filter is formatted into one line and buffered; finishing the
//! capture hands the lines back and returns the layer to its dormant state.

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::config::MAX_TRACE_EVENTS;
use crate::error::AppError;

#[derive(Debug, Default)]
struct Buffer {
    lines: Vec<String>,
    dropped: usize,
}

/// Shared recorder; clones refer to the same buffer.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    active: Arc<Mutex<Option<Buffer>>>,
    capacity: usize,
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACE_EVENTS)
    }
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Buffer>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Begin buffering events. Only one capture may run at a time.
    pub fn start(&self) -> Result<TraceCapture, AppError> {
        let mut active = self.lock();
        if active.is_some() {
            return Err(AppError::TraceInProgress);
        }
        *active = Some(Buffer::default());
        Ok(TraceCapture {
            recorder: self.clone(),
            finished: false,
        })
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().is_some()
    }

    fn record(&self, line: impl FnOnce() -> String) {
        let mut active = self.lock();
        if let Some(buffer) = active.as_mut() {
            if buffer.lines.len() < self.capacity {
                buffer.lines.push(line());
            } else {
                buffer.dropped += 1;
            }
        }
    }
}

/// A running capture. Dropping it without [`TraceCapture::finish`] discards
/// the buffered events, e.g. when the client disconnects mid-capture.
#[derive(Debug)]
pub struct TraceCapture {
    recorder: TraceRecorder,
    /// Set once the buffer is handed back. From then on the slot may belong
    /// to a newer capture and must not be cleared on drop.
    finished: bool,
}

impl TraceCapture {
    /// Stop the capture and return the buffered lines.
    pub fn finish(mut self) -> Vec<String> {
        let buffer = self.recorder.lock().take().unwrap_or_default();
        self.finished = true;
        let mut lines = buffer.lines;
        if buffer.dropped > 0 {
            lines.push(format!("# {} events dropped (buffer full)", buffer.dropped));
        }
        lines
    }
}

impl Drop for TraceCapture {
    fn drop(&mut self) {
        if !self.finished {
            self.recorder.lock().take();
        }
    }
}

impl<S> Layer<S> for TraceRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.record(|| format_event(event, &ctx));
    }
}

fn format_event<S>(event: &Event<'_>, ctx: &Context<'_, S>) -> String
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let meta = event.metadata();
    let scope = ctx
        .event_scope(event)
        .map(|scope| {
            scope
                .from_root()
                .map(|span| span.name())
                .collect::<Vec<_>>()
                .join(":")
        })
        .unwrap_or_default();

    let mut fields = FieldVisitor::default();
    event.record(&mut fields);

    let mut line = format!(
        "{} {:>5} {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        meta.level(),
        meta.target()
    );
    if !scope.is_empty() {
        let _ = write!(line, " [{}]", scope);
    }
    let _ = write!(line, " {}", fields.message);
    for (name, value) in fields.fields {
        let _ = write!(line, " {}={}", name, value);
    }
    line
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push((field.name(), format!("{:?}", value)));
        }
    }
}
