//! Agent events — a side channel for rendering progress.
//!
//! The executor's return value is authoritative; events exist only so an
//! observer (terminal UI, log) can follow along. Per turn the order is: at
//! most one `text_delta`, then `tool_start`/`tool_result` pairs in call
//! order, then one `turn_complete`.

use serde::{Deserialize, Serialize};
use shellwright_core::{ToolCall, ToolResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Events emitted by the executor during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Text the model produced this turn.
    TextDelta { text: String },

    /// A tool call is about to be dispatched.
    ToolStart { call: ToolCall },

    /// A tool call finished (including denied and unknown tools).
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: ToolResult,
    },

    /// One turn is done.
    TurnComplete { turn: u32 },

    /// Something went wrong; the run may still finish normally.
    Error { message: String },

    /// The run was cancelled.
    Aborted,

    /// The run stopped on a repeated identical tool call.
    DoomLoop { tool_name: String },
}

impl AgentEvent {
    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolResult { .. } => "tool_result",
            Self::TurnComplete { .. } => "turn_complete",
            Self::Error { .. } => "error",
            Self::Aborted => "aborted",
            Self::DoomLoop { .. } => "doom_loop",
        }
    }
}

/// Where the executor delivers events. Delivery is best-effort and can
/// never affect the outcome of a run.
#[derive(Clone)]
pub struct EventSink {
    emit: Arc<dyn Fn(AgentEvent) + Send + Sync>,
}

impl EventSink {
    pub fn new(emit: impl Fn(AgentEvent) + Send + Sync + 'static) -> Self {
        Self {
            emit: Arc::new(emit),
        }
    }

    /// Discard every event.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Forward events into a bounded channel. Full or closed channels drop
    /// the event.
    pub fn channel(tx: mpsc::Sender<AgentEvent>) -> Self {
        Self::new(move |event| {
            let _ = tx.try_send(event);
        })
    }

    /// Deliver one event. A panicking callback is contained here and the
    /// event is dropped; the run carries on.
    pub fn emit(&self, event: AgentEvent) {
        let event_type = event.event_type();
        if panic::catch_unwind(AssertUnwindSafe(|| (self.emit)(event))).is_err() {
            warn!(event_type, "Event sink panicked, event dropped");
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventSink")
    }
}
