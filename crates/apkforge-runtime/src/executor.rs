//! Execution of a single resolved step
//!
//! Owns the record state machine (`PENDING → RUNNING → SUCCESS|FAILED`),
//! the wall-clock timing, the post-call warning classification and the
//! append of exactly one record per attempt.

use crate::error::StepError;
use crate::registry::{HelperCache, Target};
use crate::report::{StepRecord, StepStatus};
use crate::Host;
use apkforge_core::CallArgs;
use chrono::Utc;
use std::time::Instant;
use tracing::debug;

/// A fully prepared invocation: target reference plus parsed arguments
pub struct Invocation<'r, H> {
    pub target: Target<'r, H>,
    pub args: CallArgs,
}

/// Classified result of one step, used for the policy lookup only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed { is_warning: bool },
}

/// Run one step and append its finished record to `results`.
///
/// `prepared` already carries resolution/parse failures so they flow
/// through the same FAILED path as execution errors.
pub fn execute<H: Host>(
    host: &mut H,
    cache: &mut HelperCache,
    results: &mut Vec<StepRecord>,
    mut record: StepRecord,
    prepared: Result<Invocation<'_, H>, StepError>,
    stop_on_warning: bool,
) -> Outcome {
    record.status = StepStatus::Running;
    record.started_at = Some(Utc::now());
    let started = Instant::now();

    let result = match prepared {
        Ok(invocation) => invoke(host, cache, invocation),
        Err(err) => Err(err),
    };

    record.duration = started.elapsed().as_secs_f64();

    // the warning channel is cleared after every step, success or not,
    // so nothing leaks into the next step's classification
    let had_warnings = host.diagnostics().has_warnings();
    host.diagnostics_mut().clear();

    let outcome = match result {
        Ok(()) => {
            if had_warnings && stop_on_warning {
                debug!(step = %record.name, "completed with warnings, treated as failure");
                fail(&mut record, "Step completed with warnings", true)
            } else {
                record.status = StepStatus::Success;
                println!("  [OK] Completed in {:.2}s", record.duration);
                Outcome::Success
            }
        }
        Err(err) => {
            let is_warning = err.is_warning();
            fail(&mut record, &err.to_string(), is_warning)
        }
    };

    results.push(record);
    outcome
}

fn invoke<H: Host>(
    host: &mut H,
    cache: &mut HelperCache,
    invocation: Invocation<'_, H>,
) -> Result<(), StepError> {
    match invocation.target {
        Target::Host(f) => f(host, &invocation.args),
        Target::Function(f) => f(&invocation.args),
        Target::Helper {
            class,
            spec: _,
            method,
        } => {
            let instance = cache.get_mut(class).ok_or_else(|| {
                StepError::execution(format!("helper instance '{}' missing from run cache", class))
            })?;
            method(instance.as_mut(), &invocation.args, host.diagnostics_mut())
        }
    }
}

fn fail(record: &mut StepRecord, message: &str, is_warning: bool) -> Outcome {
    record.status = StepStatus::Failed;
    record.error = Some(message.to_string());

    if is_warning {
        println!("  [WARNING] {}", message);
    } else {
        println!("  [ERROR] {}", message);
    }

    Outcome::Failed { is_warning }
}
