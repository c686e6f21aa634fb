use std::sync::Arc;

use tracing::{debug, info, warn};

use super::runner::{CommandOutput, CommandSpec, ProcessRunner};

/// Ordered alternatives for one logical action ("stop the service").
///
/// The order is a policy ranking: the first attempt that exits zero wins and
/// later attempts are never launched.
#[derive(Debug, Clone)]
pub struct CommandStrategy {
    pub action: String,
    pub attempts: Vec<CommandSpec>,
}

impl CommandStrategy {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            attempts: Vec::new(),
        }
    }

    pub fn attempt(mut self, spec: CommandSpec) -> Self {
        self.attempts.push(spec);
        self
    }
}

#[derive(Debug)]
pub struct StrategyOutcome {
    pub success: bool,
    /// How many attempts were actually launched.
    pub attempts_run: usize,
    /// Output of the winning attempt, or of the last failing one.
    pub output: Option<CommandOutput>,
}

/// Runs a strategy's attempts in order until one succeeds.
///
/// A failed, timed-out, or unspawnable attempt never aborts the loop, and
/// exhausting every attempt is reported as an outcome, not an error. The
/// caller decides how severe exhaustion is.
pub struct StrategyRunner {
    runner: Arc<dyn ProcessRunner>,
}

impl StrategyRunner {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub async fn run(&self, strategy: &CommandStrategy) -> StrategyOutcome {
        let mut last_output = None;
        let mut attempts_run = 0;

        for spec in &strategy.attempts {
            attempts_run += 1;
            info!(
                action = %strategy.action,
                attempt = attempts_run,
                command = %spec.display_line(),
                "Trying strategy attempt"
            );

            match self.runner.run(spec).await {
                Ok(output) if output.success() => {
                    debug!(action = %strategy.action, attempt = attempts_run, "Attempt succeeded");
                    return StrategyOutcome {
                        success: true,
                        attempts_run,
                        output: Some(output),
                    };
                }
                Ok(output) => {
                    if output.timed_out {
                        warn!(
                            action = %strategy.action,
                            command = %spec.display_line(),
                            "Attempt timed out"
                        );
                    } else {
                        warn!(
                            action = %strategy.action,
                            code = ?output.code,
                            output = %output.tail(10),
                            "Attempt failed"
                        );
                    }
                    last_output = Some(output);
                }
                Err(e) => {
                    warn!(
                        action = %strategy.action,
                        command = %spec.display_line(),
                        error = %e,
                        "Attempt could not be launched"
                    );
                }
            }
        }

        warn!(
            action = %strategy.action,
            attempts = attempts_run,
            "All strategy attempts exhausted"
        );
        StrategyOutcome {
            success: false,
            attempts_run,
            output: last_output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::runner::testing::ScriptedRunner;

    fn strategy(n: usize) -> CommandStrategy {
        let mut s = CommandStrategy::new("stop");
        for i in 0..n {
            s = s.attempt(CommandSpec::new(format!("cmd{i}")));
        }
        s
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(1),
            ScriptedRunner::exit(0),
            ScriptedRunner::exit(0),
        ]));
        let outcome = StrategyRunner::new(runner.clone()).run(&strategy(4)).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts_run, 2);
        // Attempts after the winner are never launched.
        assert_eq!(runner.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exhaustion_is_failure_not_error() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::exit(1),
            ScriptedRunner::exit(2),
            ScriptedRunner::exit(3),
        ]));
        let outcome = StrategyRunner::new(runner).run(&strategy(3)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts_run, 3);
        assert_eq!(outcome.output.unwrap().code, Some(3));
    }

    #[tokio::test]
    async fn spawn_error_continues_to_next_attempt() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            ScriptedRunner::spawn_error(),
            ScriptedRunner::exit(0),
        ]));
        let outcome = StrategyRunner::new(runner).run(&strategy(2)).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts_run, 2);
    }

    #[tokio::test]
    async fn timeout_counts_as_failed_attempt() {
        let timed_out = Ok(CommandOutput {
            code: None,
            timed_out: true,
            ..Default::default()
        });
        let runner = Arc::new(ScriptedRunner::new(vec![timed_out, ScriptedRunner::exit(0)]));
        let outcome = StrategyRunner::new(runner).run(&strategy(2)).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts_run, 2);
    }

    #[tokio::test]
    async fn empty_strategy_fails_without_running_anything() {
        let runner = Arc::new(ScriptedRunner::new(vec![]));
        let outcome = StrategyRunner::new(runner.clone()).run(&strategy(0)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts_run, 0);
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
