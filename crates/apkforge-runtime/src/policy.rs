//! Failure policy: continue, ask the operator, or stop
//!
//! The confirm-with-timeout primitive spawns a detached thread to read
//! one line of operator input and waits on a channel with a one-second
//! poll, refreshing an on-screen countdown. On timeout the reader
//! thread is abandoned, never joined; the process does not block on it.

use crate::report::StepRecord;
use apkforge_core::PipelinePolicy;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Continuation decision for a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop,
}

/// Seam for the interactive confirmation, so tests can script answers
pub trait ContinuePrompt {
    /// Ask whether to continue; `true` on an answer starting with `y`
    /// (case-insensitive) or on timeout.
    fn confirm(&mut self, timeout_seconds: u64) -> bool;
}

/// Real operator prompt reading from stdin
pub struct ConsolePrompt;

impl ContinuePrompt for ConsolePrompt {
    fn confirm(&mut self, timeout_seconds: u64) -> bool {
        confirm_with_timeout(BufReader::new(io::stdin()), timeout_seconds)
    }
}

/// Wait up to `timeout_seconds` for one line from `reader`.
///
/// The reader runs on its own thread and sends the trimmed, lowercased
/// line over a channel; EOF counts as no answer. The foreground polls
/// the channel once per second so the countdown stays fresh, and stops
/// waiting the moment an answer arrives.
pub fn confirm_with_timeout<R>(reader: R, timeout_seconds: u64) -> bool
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>();

    thread::spawn(move || {
        let mut reader = reader;
        let mut line = String::new();
        if matches!(reader.read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(line.trim().to_lowercase());
        }
    });

    print!(
        "\nContinue pipeline? (y/n) - Auto-continue in {}s: ",
        timeout_seconds
    );
    io::stdout().flush().ok();

    let mut listener_gone = false;
    for elapsed in 0..timeout_seconds {
        if listener_gone {
            thread::sleep(Duration::from_secs(1));
        } else {
            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(answer) => {
                    println!();
                    return answer.starts_with('y');
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // reader hit EOF without an answer; keep the
                    // countdown honest with plain sleeps
                    listener_gone = true;
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }

        let remaining = timeout_seconds - elapsed - 1;
        if remaining > 0 {
            print!(
                "\rContinue pipeline? (y/n) - Auto-continue in {}s: ",
                remaining
            );
            io::stdout().flush().ok();
        }
    }

    println!();
    println!(
        "[INFO] Timeout reached ({}s), continuing automatically...",
        timeout_seconds
    );
    true
}

/// Applies the configured failure policy to a just-failed step
pub struct PolicyEngine {
    policy: PipelinePolicy,
    prompt: Box<dyn ContinuePrompt>,
}

impl PolicyEngine {
    pub fn new(policy: PipelinePolicy) -> Self {
        Self {
            policy,
            prompt: Box::new(ConsolePrompt),
        }
    }

    /// Replace the operator prompt, used by tests
    pub fn with_prompt(policy: PipelinePolicy, prompt: Box<dyn ContinuePrompt>) -> Self {
        Self { policy, prompt }
    }

    pub fn policy(&self) -> &PipelinePolicy {
        &self.policy
    }

    /// Decide continuation for a failed (or warning-failed) step
    pub fn decide(&mut self, _record: &StepRecord, is_warning: bool) -> Verdict {
        let stop_configured = if is_warning {
            self.policy.stop_on_warning
        } else {
            self.policy.stop_on_error
        };

        if !stop_configured {
            let label = if is_warning { "warning" } else { "error" };
            println!(
                "  [INFO] Continuing despite {} (configured in pipeline_behavior).",
                label
            );
            return Verdict::Continue;
        }

        if self.prompt.confirm(self.policy.timeout_seconds) {
            Verdict::Continue
        } else {
            println!("\n[INFO] Pipeline stopped by user.");
            Verdict::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::StepStatus;
    use std::io::Cursor;
    use std::time::Instant;

    fn failed_record() -> StepRecord {
        let mut record = StepRecord::new("build_unsigned_apk");
        record.status = StepStatus::Failed;
        record.error = Some("apktool failed".to_string());
        record
    }

    #[test]
    fn test_yes_answer_continues_immediately() {
        let started = Instant::now();
        assert!(confirm_with_timeout(Cursor::new(b"y\n".to_vec()), 30));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_yes_variants_accepted() {
        assert!(confirm_with_timeout(Cursor::new(b"YES\n".to_vec()), 5));
        assert!(confirm_with_timeout(Cursor::new(b"  Y  \n".to_vec()), 5));
    }

    #[test]
    fn test_other_answer_stops() {
        assert!(!confirm_with_timeout(Cursor::new(b"n\n".to_vec()), 5));
        assert!(!confirm_with_timeout(Cursor::new(b"abort\n".to_vec()), 5));
    }

    #[test]
    fn test_timeout_defaults_to_continue() {
        // empty reader = EOF, no answer ever arrives
        let started = Instant::now();
        assert!(confirm_with_timeout(Cursor::new(Vec::new()), 1));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "returned too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "returned too late: {:?}", elapsed);
    }

    struct Scripted {
        answer: bool,
        asked: usize,
    }

    impl ContinuePrompt for Scripted {
        fn confirm(&mut self, _timeout_seconds: u64) -> bool {
            self.asked += 1;
            self.answer
        }
    }

    #[test]
    fn test_policy_off_never_prompts() {
        let policy = PipelinePolicy {
            stop_on_error: false,
            ..PipelinePolicy::default()
        };
        let mut engine = PolicyEngine::with_prompt(
            policy,
            Box::new(Scripted {
                answer: false,
                asked: 0,
            }),
        );
        assert_eq!(engine.decide(&failed_record(), false), Verdict::Continue);
    }

    #[test]
    fn test_policy_on_respects_answer() {
        let mut engine = PolicyEngine::with_prompt(
            PipelinePolicy::default(),
            Box::new(Scripted {
                answer: false,
                asked: 0,
            }),
        );
        assert_eq!(engine.decide(&failed_record(), false), Verdict::Stop);

        let mut engine = PolicyEngine::with_prompt(
            PipelinePolicy::default(),
            Box::new(Scripted {
                answer: true,
                asked: 0,
            }),
        );
        assert_eq!(engine.decide(&failed_record(), false), Verdict::Continue);
    }

    #[test]
    fn test_warning_uses_stop_on_warning_key() {
        // stop_on_error=true but the failure is a warning and
        // stop_on_warning=false, so no prompt happens
        let mut engine = PolicyEngine::with_prompt(
            PipelinePolicy::default(),
            Box::new(Scripted {
                answer: false,
                asked: 0,
            }),
        );
        assert_eq!(engine.decide(&failed_record(), true), Verdict::Continue);
    }
}
