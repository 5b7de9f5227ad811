//! Pipeline execution engine for the ApkForge build toolkit
//!
//! A small interpreter over an ordered list of step descriptors: each
//! name resolves against an explicit [`Registry`] (host methods, free
//! functions, auto-constructed helpers), executes with timing and error
//! capture, and the [`PolicyEngine`] decides whether to continue, ask
//! the operator, or abort.

pub mod error;
pub mod executor;
pub mod inject;
pub mod policy;
pub mod registry;
pub mod report;
pub mod runner;

pub use error::{ResolveError, StepError};
pub use inject::{Dep, Deps, Injector};
pub use policy::{ConsolePrompt, ContinuePrompt, PolicyEngine, Verdict};
pub use registry::{HelperSpec, Registry};
pub use report::{RunReport, StepRecord, StepStatus};
pub use runner::PipelineRunner;

use apkforge_core::Diagnostics;

/// Contract the orchestrating application object must satisfy for the
/// engine to run steps against it.
pub trait Host {
    /// Warning channel collaborators write into during a step
    fn diagnostics(&self) -> &Diagnostics;
    fn diagnostics_mut(&mut self) -> &mut Diagnostics;
}
