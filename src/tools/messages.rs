//! Messages sent from a tool's worker thread back to the control thread.

use super::tool::ToolData;

/// Identifies one tool run; events from older runs are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// How a tool run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Ran to completion; carries the tool's final data snapshot.
    Completed(ToolData),
    /// Acknowledged a cancellation request.
    Cancelled,
    /// Returned an error or panicked.
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum ToolEvent {
    /// Partial result streamed while running.
    Updated { run: RunId, data: ToolData },
    /// Last message of a run.
    Finished { run: RunId, outcome: RunOutcome },
}

impl ToolEvent {
    pub fn run(&self) -> RunId {
        match self {
            ToolEvent::Updated { run, .. } | ToolEvent::Finished { run, .. } => *run,
        }
    }
}
