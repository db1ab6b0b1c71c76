//! ToolExecutionController - gates at most one background tool at a time.
//!
//! ```text
//!            start                 Finished
//!   Idle ───────────▶ Running ─────────────────▶ Idle
//!                        │                        ▲
//!                 cancel │                        │ Finished (ack)
//!                        ▼                        │
//!                    Cancelling ──────────────────┘
//! ```
//!
//! The tool body runs on its own worker thread and talks back only through
//! [`ToolEvent`]s on a channel drained by the control thread. Results are
//! never applied here: partial and final data are forwarded to the
//! [`ResultCoalescer`], which owns the merge.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::ToolError;

use super::coalescer::ResultCoalescer;
use super::messages::{RunId, RunOutcome, ToolEvent};
use super::tool::{Tool, ToolContext, ToolData, ToolInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Idle,
    Running,
    Cancelling,
}

/// How a finished run ended, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishKind {
    Completed,
    Cancelled,
    Failed(String),
}

/// Effect of handling one worker event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolTransition {
    /// Stale or unexpected event; nothing changed.
    Ignored,
    /// A partial result was staged. `armed` is true if it armed the merge
    /// deadline.
    Staged { armed: bool },
    /// The run ended and the controller is idle again. Staged results should
    /// be merged now.
    Finished { tool: String, kind: FinishKind },
}

struct ActiveTool {
    run: RunId,
    name: String,
    cancelable: bool,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Runs at most one tool at a time on a worker thread and tracks its state.
pub struct ToolExecutionController {
    state: ToolState,
    active: Option<ActiveTool>,
    next_run: u64,
    sender: Sender<ToolEvent>,
    receiver: Receiver<ToolEvent>,
}

impl ToolExecutionController {
    /// Create a new idle controller.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            state: ToolState::Idle,
            active: None,
            next_run: 0,
            sender,
            receiver,
        }
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ToolState::Idle
    }

    /// Tool triggers are only enabled while idle.
    pub fn can_start(&self) -> bool {
        self.is_idle()
    }

    pub fn can_cancel(&self) -> bool {
        self.state == ToolState::Running && self.active.as_ref().is_some_and(|t| t.cancelable)
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.active.as_ref().map(|t| t.name.as_str())
    }

    /// Channel the control thread drains for worker events.
    pub fn events(&self) -> &Receiver<ToolEvent> {
        &self.receiver
    }

    /// Start `tool` on a worker thread with the given input snapshot.
    ///
    /// Fails with [`ToolError::AlreadyRunning`] unless idle, and with
    /// [`ToolError::Declined`] if the tool rejects its inputs; in both cases
    /// nothing is spawned and the state is unchanged.
    pub fn start(
        &mut self,
        mut tool: Box<dyn Tool>,
        inputs: ToolInputs,
        coalescer: &mut ResultCoalescer,
    ) -> Result<RunId, ToolError> {
        if self.state != ToolState::Idle {
            debug!("Rejected start of '{}': a tool is already running", tool.name());
            return Err(ToolError::AlreadyRunning);
        }

        let name = tool.name().to_string();
        if !tool.accepts(&inputs) {
            info!("Tool '{}' declined to start", name);
            return Err(ToolError::Declined(name));
        }

        let run = RunId(self.next_run);
        self.next_run += 1;

        let outputs = tool.outputs();
        let cancelable = tool.is_cancelable();
        let cancel = Arc::new(AtomicBool::new(false));
        let latest = Arc::new(Mutex::new(ToolData::default()));
        coalescer.begin(outputs);

        let ctx = ToolContext::new(run, self.sender.clone(), cancel.clone(), latest);
        let handle = thread::spawn(move || run_worker(tool.as_mut(), inputs, ctx));

        info!("Started tool '{}' ({})", name, run);
        self.active = Some(ActiveTool {
            run,
            name,
            cancelable,
            cancel,
            handle: Some(handle),
        });
        self.state = ToolState::Running;
        Ok(run)
    }

    /// Ask the running tool to stop. The controller stays `Cancelling` until
    /// the worker acknowledges by finishing.
    pub fn cancel(&mut self) -> Result<(), ToolError> {
        let active = match (self.state, self.active.as_ref()) {
            (ToolState::Running, Some(active)) => active,
            _ => return Err(ToolError::NotRunning),
        };
        if !active.cancelable {
            return Err(ToolError::NotCancelable(active.name.clone()));
        }

        active.cancel.store(true, Ordering::SeqCst);
        info!("Cancelling tool '{}'", active.name);
        self.state = ToolState::Cancelling;
        Ok(())
    }

    /// Handle one worker event.
    pub fn handle_event(
        &mut self,
        event: ToolEvent,
        coalescer: &mut ResultCoalescer,
    ) -> ToolTransition {
        let current = match self.active.as_ref() {
            Some(active) if active.run == event.run() => active.run,
            _ => {
                debug!("Ignoring event from stale {}", event.run());
                return ToolTransition::Ignored;
            }
        };

        match event {
            ToolEvent::Updated { data, .. } => ToolTransition::Staged {
                armed: coalescer.stage(data),
            },
            ToolEvent::Finished { outcome, .. } => {
                let kind = match outcome {
                    RunOutcome::Completed(data) => {
                        coalescer.stage(data);
                        FinishKind::Completed
                    }
                    RunOutcome::Cancelled => FinishKind::Cancelled,
                    RunOutcome::Failed(reason) => FinishKind::Failed(reason),
                };
                let tool = self.finish(current);
                match &kind {
                    FinishKind::Failed(reason) => warn!("Tool '{}' failed: {}", tool, reason),
                    other => info!("Tool '{}' finished: {:?}", tool, other),
                }
                ToolTransition::Finished { tool, kind }
            }
        }
    }

    /// Drop the finished run and return to idle.
    fn finish(&mut self, run: RunId) -> String {
        self.state = ToolState::Idle;
        match self.active.take() {
            Some(mut active) => {
                debug_assert_eq!(active.run, run);
                if let Some(handle) = active.handle.take() {
                    // Finished is the worker's last send; this returns promptly
                    let _ = handle.join();
                }
                active.name
            }
            None => String::new(),
        }
    }
}

impl Default for ToolExecutionController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ToolExecutionController {
    fn drop(&mut self) {
        // Ask a cancelable tool to stop; the worker thread is detached
        if let Some(active) = self.active.as_ref() {
            active.cancel.store(true, Ordering::SeqCst);
        }
    }
}

/// Worker thread body: run the tool and always send exactly one Finished.
fn run_worker(tool: &mut dyn Tool, inputs: ToolInputs, ctx: ToolContext) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| tool.run(inputs, &ctx)));
    let outcome = match result {
        Ok(Ok(())) if ctx.is_cancelled() => RunOutcome::Cancelled,
        Ok(Ok(())) => RunOutcome::Completed(ctx.data()),
        Ok(Err(e)) => RunOutcome::Failed(format!("{e:#}")),
        Err(_) => RunOutcome::Failed("tool panicked".to_string()),
    };
    ctx.send(ToolEvent::Finished {
        run: ctx.run_id(),
        outcome,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use anyhow::bail;
    use crossbeam_channel::bounded;

    use crate::scene::{FrameId, Landmark, LandmarkMap, TrackId};
    use crate::tools::tool::OutputKinds;

    const WAIT: Duration = Duration::from_secs(5);

    /// Streams `steps` landmark sets, waiting for a go signal before
    /// finishing so tests control timing.
    struct ScriptedTool {
        steps: u64,
        cancelable: bool,
        gate: Option<Receiver<()>>,
        fail: bool,
    }

    impl ScriptedTool {
        fn new(steps: u64) -> Self {
            Self {
                steps,
                cancelable: true,
                gate: None,
                fail: false,
            }
        }

        fn gated(steps: u64) -> (Self, Sender<()>) {
            let (tx, rx) = bounded(1);
            let tool = Self {
                gate: Some(rx),
                ..Self::new(steps)
            };
            (tool, tx)
        }
    }

    impl Tool for ScriptedTool {
        fn name(&self) -> &str {
            "scripted"
        }

        fn outputs(&self) -> OutputKinds {
            OutputKinds::LANDMARKS
        }

        fn is_cancelable(&self) -> bool {
            self.cancelable
        }

        fn accepts(&self, _inputs: &ToolInputs) -> bool {
            true
        }

        fn run(&mut self, _inputs: ToolInputs, ctx: &ToolContext) -> anyhow::Result<()> {
            for n in 1..=self.steps {
                let lms: LandmarkMap = (0..n)
                    .map(|i| (TrackId::new(i), Landmark::new(0.0, 0.0, 1.0)))
                    .collect();
                ctx.update(ToolData::default().with_landmarks(lms));
            }
            if let Some(gate) = &self.gate {
                while gate.recv_timeout(Duration::from_millis(5)).is_err() {
                    if ctx.is_cancelled() {
                        return Ok(());
                    }
                }
            }
            if self.fail {
                bail!("scripted failure");
            }
            Ok(())
        }
    }

    struct DecliningTool;

    impl Tool for DecliningTool {
        fn name(&self) -> &str {
            "declining"
        }

        fn outputs(&self) -> OutputKinds {
            OutputKinds::ACTIVE_FRAME
        }

        fn accepts(&self, _inputs: &ToolInputs) -> bool {
            false
        }

        fn run(&mut self, _inputs: ToolInputs, _ctx: &ToolContext) -> anyhow::Result<()> {
            unreachable!("declined tools never run")
        }
    }

    struct PanickingTool;

    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "panicking"
        }

        fn outputs(&self) -> OutputKinds {
            OutputKinds::ACTIVE_FRAME
        }

        fn accepts(&self, _inputs: &ToolInputs) -> bool {
            true
        }

        fn run(&mut self, _inputs: ToolInputs, ctx: &ToolContext) -> anyhow::Result<()> {
            ctx.update(ToolData::default().with_active_frame(FrameId::new(0)));
            panic!("boom");
        }
    }

    /// Drain events until the run finishes.
    fn drive(
        controller: &mut ToolExecutionController,
        coalescer: &mut ResultCoalescer,
    ) -> Vec<ToolTransition> {
        let mut seen = Vec::new();
        while !controller.is_idle() {
            let event = controller.events().recv_timeout(WAIT).expect("tool event");
            seen.push(controller.handle_event(event, coalescer));
        }
        seen
    }

    #[test]
    fn test_run_to_completion() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));

        controller
            .start(Box::new(ScriptedTool::new(3)), ToolInputs::default(), &mut coalescer)
            .unwrap();
        assert_eq!(controller.state(), ToolState::Running);
        assert!(!controller.can_start());

        let seen = drive(&mut controller, &mut coalescer);
        assert_eq!(
            seen,
            vec![
                ToolTransition::Staged { armed: true },
                ToolTransition::Staged { armed: false },
                ToolTransition::Staged { armed: false },
                ToolTransition::Finished {
                    tool: "scripted".into(),
                    kind: FinishKind::Completed
                },
            ]
        );
        assert_eq!(controller.state(), ToolState::Idle);
        assert_eq!(coalescer.pending().landmarks.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));
        let (tool, go) = ScriptedTool::gated(1);

        let run = controller
            .start(Box::new(tool), ToolInputs::default(), &mut coalescer)
            .unwrap();
        let err = controller
            .start(Box::new(ScriptedTool::new(1)), ToolInputs::default(), &mut coalescer)
            .unwrap_err();
        assert_eq!(err, ToolError::AlreadyRunning);
        assert_eq!(controller.state(), ToolState::Running);
        assert_eq!(controller.active_tool(), Some("scripted"));

        go.send(()).unwrap();
        let seen = drive(&mut controller, &mut coalescer);
        assert!(matches!(
            seen.last(),
            Some(ToolTransition::Finished {
                kind: FinishKind::Completed,
                ..
            })
        ));
        assert_eq!(run, RunId(0));
    }

    #[test]
    fn test_declined_tool_stays_idle() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));

        let err = controller
            .start(Box::new(DecliningTool), ToolInputs::default(), &mut coalescer)
            .unwrap_err();
        assert_eq!(err, ToolError::Declined("declining".into()));
        assert!(controller.is_idle());
        assert!(controller.active_tool().is_none());
        assert!(controller.events().try_recv().is_err());
    }

    #[test]
    fn test_cancel_waits_for_acknowledgement() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));
        let (tool, _go) = ScriptedTool::gated(2);

        controller
            .start(Box::new(tool), ToolInputs::default(), &mut coalescer)
            .unwrap();
        assert!(controller.can_cancel());
        controller.cancel().unwrap();
        assert_eq!(controller.state(), ToolState::Cancelling);
        assert_eq!(controller.cancel(), Err(ToolError::NotRunning));
        assert_eq!(
            controller.start(Box::new(ScriptedTool::new(1)), ToolInputs::default(), &mut coalescer),
            Err(ToolError::AlreadyRunning)
        );

        let seen = drive(&mut controller, &mut coalescer);
        assert_eq!(
            seen.last(),
            Some(&ToolTransition::Finished {
                tool: "scripted".into(),
                kind: FinishKind::Cancelled
            })
        );
        // Partials received before the acknowledgement are still staged
        assert_eq!(coalescer.pending().landmarks.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_cancel_non_cancelable_tool() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));
        let (mut tool, go) = ScriptedTool::gated(0);
        tool.cancelable = false;

        controller
            .start(Box::new(tool), ToolInputs::default(), &mut coalescer)
            .unwrap();
        assert!(!controller.can_cancel());
        assert_eq!(
            controller.cancel(),
            Err(ToolError::NotCancelable("scripted".into()))
        );
        assert_eq!(controller.state(), ToolState::Running);

        go.send(()).unwrap();
        drive(&mut controller, &mut coalescer);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_cancel_when_idle() {
        let mut controller = ToolExecutionController::new();
        assert_eq!(controller.cancel(), Err(ToolError::NotRunning));
    }

    #[test]
    fn test_failure_returns_to_idle() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));
        let mut tool = ScriptedTool::new(1);
        tool.fail = true;

        controller
            .start(Box::new(tool), ToolInputs::default(), &mut coalescer)
            .unwrap();
        let seen = drive(&mut controller, &mut coalescer);
        match seen.last() {
            Some(ToolTransition::Finished {
                kind: FinishKind::Failed(reason),
                ..
            }) => assert!(reason.contains("scripted failure")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(controller.is_idle());
    }

    #[test]
    fn test_panic_is_contained() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));

        controller
            .start(Box::new(PanickingTool), ToolInputs::default(), &mut coalescer)
            .unwrap();
        let seen = drive(&mut controller, &mut coalescer);
        assert_eq!(
            seen.last(),
            Some(&ToolTransition::Finished {
                tool: "panicking".into(),
                kind: FinishKind::Failed("tool panicked".into())
            })
        );
        assert!(controller.is_idle());
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let mut controller = ToolExecutionController::new();
        let mut coalescer = ResultCoalescer::new(Duration::from_secs(60));
        let stale = ToolEvent::Updated {
            run: RunId(42),
            data: ToolData::default(),
        };
        assert_eq!(
            controller.handle_event(stale, &mut coalescer),
            ToolTransition::Ignored
        );
    }
}
