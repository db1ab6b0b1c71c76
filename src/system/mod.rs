//! Session orchestration: the single owner of scene state on the control
//! thread, driving tool workers through their event channel.

mod session;

pub use session::{ExportReport, LoadReport, SessionConfig, ViewerSession};
