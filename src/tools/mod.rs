//! Background tools: the capability interface, the single-tool execution
//! gate and the debounced merge of their streamed results.

pub mod builtin;
mod coalescer;
mod controller;
mod messages;
mod tool;

pub use coalescer::{DEFAULT_MERGE_DELAY, MergeReport, PendingToolOutput, ResultCoalescer};
pub use controller::{FinishKind, ToolExecutionController, ToolState, ToolTransition};
pub use messages::{RunId, RunOutcome, ToolEvent};
pub use tool::{OutputKinds, Tool, ToolContext, ToolData, ToolInputs};
