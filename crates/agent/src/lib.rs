//! The agent turn loop — the heart of Shellwright.
//!
//! The executor follows a **Call → Act → Observe** cycle:
//!
//! 1. **Receive** a query (fresh, or appended to a prior history)
//! 2. **Fit the context** (structural compaction when over budget)
//! 3. **Call the model** via the configured provider and adapter
//! 4. **If tool calls**: gate each one, execute it, fold the result back, loop
//! 5. **If text response**: that is the final answer
//!
//! The loop also stops on cancellation, on a repeated identical tool call,
//! or when the turn budget runs out.

pub mod context;
pub mod doom_loop;
pub mod error;
pub mod event;
pub mod executor;
pub mod prompt;

pub use context::{ContextManager, rebuild_from_summary, summarize_history};
pub use doom_loop::DoomLoopDetector;
pub use error::AgentError;
pub use event::{AgentEvent, EventSink};
pub use executor::{
    AgentExecutor, CumulativeUsage, DOOM_LOOP_MESSAGE, MAX_STEPS_MESSAGE, PermissionPrompt,
    RunConfig, RunOutcome, RunRequest, StopReason,
};
pub use prompt::{DefaultPromptBuilder, StaticPrompt, SystemPromptBuilder};
