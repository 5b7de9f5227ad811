//! The pipeline runner: drives descriptors through resolve → parse →
//! execute → policy and aggregates the run report

use crate::error::StepError;
use crate::executor::{self, Invocation, Outcome};
use crate::inject::Injector;
use crate::policy::{ContinuePrompt, PolicyEngine, Verdict};
use crate::registry::{HelperCache, Registry, Target};
use crate::report::{RunReport, StepRecord, StepStatus};
use crate::Host;
use apkforge_core::{CallArgs, PipelinePolicy};
use std::path::Path;
use tracing::debug;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Executes one ordered list of step descriptors against a host
pub struct PipelineRunner<H> {
    registry: Registry<H>,
    injector: Injector<H>,
    policy: PolicyEngine,
    results: Vec<StepRecord>,
}

impl<H: Host> PipelineRunner<H> {
    pub fn new(registry: Registry<H>, injector: Injector<H>, policy: PipelinePolicy) -> Self {
        Self {
            registry,
            injector,
            policy: PolicyEngine::new(policy),
            results: Vec::new(),
        }
    }

    /// Same, with a scripted prompt instead of the console one
    pub fn with_prompt(
        registry: Registry<H>,
        injector: Injector<H>,
        policy: PipelinePolicy,
        prompt: Box<dyn ContinuePrompt>,
    ) -> Self {
        Self {
            registry,
            injector,
            policy: PolicyEngine::with_prompt(policy, prompt),
            results: Vec::new(),
        }
    }

    /// Finished records of the last run, in execution order
    pub fn results(&self) -> &[StepRecord] {
        &self.results
    }

    /// Sorted step names invocable directly on the host
    pub fn list_available_steps(&self) -> Vec<&str> {
        self.registry.host_names()
    }

    /// Run all steps in order. Returns `false` if any step failed,
    /// whether or not the run continued past it.
    pub fn run(&mut self, host: &mut H, steps: &[String]) -> bool {
        println!("\n{}", RULE);
        println!("   PIPELINE EXECUTION");
        println!("{}", RULE);
        println!("   Steps total: {}", steps.len());
        println!("{}", RULE);

        self.results.clear();
        let mut instances = HelperCache::new();
        let mut overall_success = true;
        let total = steps.len();

        for (index, raw) in steps.iter().enumerate() {
            let display_name = display_name(raw);
            println!(
                "\n[{}/{}] {} {}",
                index + 1,
                total,
                StepStatus::Running.glyph(),
                display_name
            );
            debug!(step = %raw, "executing pipeline step");

            let record = StepRecord::new(display_name);
            let prepared = prepare(&self.registry, &self.injector, host, &mut instances, raw);
            let stop_on_warning = self.policy.policy().stop_on_warning;
            let outcome = executor::execute(
                host,
                &mut instances,
                &mut self.results,
                record,
                prepared,
                stop_on_warning,
            );

            if let Outcome::Failed { is_warning } = outcome {
                overall_success = false;
                let last = match self.results.last() {
                    Some(record) => record.clone(),
                    None => continue,
                };
                if self.policy.decide(&last, is_warning) == Verdict::Stop {
                    println!("\n[INFO] Pipeline stopped.");
                    break;
                }
            }
        }

        self.print_summary();
        overall_success
    }

    /// Persist the report of the last run
    pub fn save_report(&self, path: &Path) -> anyhow::Result<()> {
        RunReport::from_records(&self.results).save(path)
    }

    fn print_summary(&self) {
        println!("\n{}", RULE);
        println!("PIPELINE EXECUTION SUMMARY");
        println!("{}", RULE);

        for record in &self.results {
            println!(
                "  {} {:<35} ({:.2}s)",
                record.status.glyph(),
                record.name,
                record.duration
            );
            if let Some(error) = &record.error {
                println!("       {}", truncate(error, 120));
            }
        }

        if !self.results.is_empty() {
            let report = RunReport::from_records(&self.results);
            println!("{}", THIN_RULE);
            println!("  Total time : {:.2}s", report.total_time);
            println!(
                "  Steps      : {} total, {} OK, {} failed",
                report.results.len(),
                report.success_count,
                report.failed_count
            );
        }

        println!("{}", RULE);
    }
}

/// Display name for progress lines: descriptor text up to the first `(`
fn display_name(raw: &str) -> &str {
    raw.split('(').next().unwrap_or(raw).trim()
}

/// Resolve a raw descriptor into an invocation, constructing (and
/// caching) the helper instance when the target needs one.
fn prepare<'r, H: Host>(
    registry: &'r Registry<H>,
    injector: &Injector<H>,
    host: &mut H,
    instances: &mut HelperCache,
    raw: &str,
) -> Result<Invocation<'r, H>, StepError> {
    let descriptor = apkforge_parser::parse_descriptor(raw)?;
    let args = match descriptor.args_text.as_deref() {
        Some(text) => apkforge_parser::parse_call_args(text)?,
        None => CallArgs::new(),
    };

    let target = registry.resolve(&descriptor.name)?;

    if let Target::Helper { class, spec, .. } = &target {
        if !instances.contains(class) {
            debug!(%class, "constructing helper instance");
            let deps = injector.resolve(class, spec.requires(), host)?;
            let instance = spec.construct(&deps)?;
            instances.insert(class, instance);
        }
    }

    Ok(Invocation { target, args })
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
