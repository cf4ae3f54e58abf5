use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::instrument;
use yup_utils::exit::ExitCode;

use crate::classify::LineClassifier;
use crate::command::ExternalCommand;
use crate::error::{LaunchError, ProcessError, SupervisorError};
use crate::output::SharedSink;
use crate::strategy::{
    BruteForce, ConfirmationStrategyBox, Passive, ShellFamily, Smart, StrategyKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Answer the tool's confirmation prompts instead of leaving them to a human.
    pub auto_confirm: bool,
    /// With `auto_confirm`, pipe affirmatives in blindly rather than detecting prompts.
    pub force_brute_force: bool,
    /// How long an unterminated line may sit idle before it is checked for a prompt. [None]
    /// only ever checks complete lines.
    pub prompt_idle: Option<Duration>,
    /// How long output listeners may keep draining after the tool exits.
    pub drain_grace: Duration,
    /// Directory to launch the tool in; our own working directory if unset.
    pub working_dir: Option<PathBuf>,
}

impl SupervisorConfig {
    pub const DEFAULT_PROMPT_IDLE: Duration = Duration::from_millis(250);
    pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            auto_confirm: false,
            force_brute_force: false,
            prompt_idle: Some(Self::DEFAULT_PROMPT_IDLE),
            drain_grace: Self::DEFAULT_DRAIN_GRACE,
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: ExitCode,
    pub elapsed: Duration,
    pub strategy: StrategyKind,
    /// Responses written to the tool's input. Always zero outside [StrategyKind::Smart].
    pub responses_sent: usize,
}

/// Runs the external tool to completion under the configured confirmation strategy.
pub struct Supervisor {
    config: SupervisorConfig,
    sink: SharedSink,
    classifier: Arc<LineClassifier>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, sink: SharedSink) -> Self {
        Self {
            config,
            sink,
            classifier: Arc::new(LineClassifier::default()),
        }
    }

    /// Replaces the built-in classifier, e.g. with one carrying extra prompt rules.
    pub fn with_classifier(mut self, classifier: LineClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        StrategyKind::select(self.config.auto_confirm, self.config.force_brute_force)
    }

    pub fn strategy(&self) -> ConfirmationStrategyBox {
        match self.strategy_kind() {
            StrategyKind::Passive => Box::new(Passive),
            StrategyKind::BruteForce => Box::new(BruteForce::new(
                ShellFamily::host(),
                self.config.drain_grace,
            )),
            StrategyKind::Smart => Box::new(Smart::new(
                self.classifier.clone(),
                self.config.prompt_idle,
                self.config.drain_grace,
            )),
        }
    }

    /// Launches `command`, streams its output to the sink, and waits for it to exit.
    ///
    /// There is no deadline: a tool blocked on an unanswered prompt blocks this future too.
    /// Callers wanting one should wrap the call.
    #[instrument(
        level = "debug",
        skip_all,
        fields(command = %command, strategy = %self.strategy_kind())
    )]
    pub async fn run(&self, command: &ExternalCommand) -> Result<ProcessOutcome, SupervisorError> {
        let strategy = self.strategy();

        let mut process = strategy.prepare(command);
        if let Some(dir) = &self.config.working_dir {
            process.current_dir(dir);
        }

        let start = Instant::now();
        let child = process.spawn().map_err(|source| LaunchError {
            executable: command.executable().to_owned(),
            source,
        })?;
        tracing::debug!(pid = ?child.id(), "launched tool");

        let supervised = strategy
            .supervise(child, self.sink.clone())
            .await
            .map_err(|source| SupervisorError::Wait {
                executable: command.executable().to_owned(),
                source,
            })?;
        let elapsed = start.elapsed();

        let exit_code = ExitCode::from(supervised.status);
        tracing::debug!(
            %exit_code,
            ?elapsed,
            responses_sent = supervised.responses_sent,
            "tool exited"
        );

        if !exit_code.is_success() {
            return Err(ProcessError {
                executable: command.executable().to_owned(),
                arguments: command.arguments().to_vec(),
                exit_code,
                elapsed,
            }
            .into());
        }

        Ok(ProcessOutcome {
            exit_code,
            elapsed,
            strategy: strategy.kind(),
            responses_sent: supervised.responses_sent,
        })
    }

    /// [run](Self::run) on a fresh single-threaded runtime, for callers outside of async code.
    pub fn run_blocking(
        &self,
        command: &ExternalCommand,
    ) -> Result<ProcessOutcome, SupervisorError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SupervisorError::Runtime)?;
        rt.block_on(self.run(command))
    }
}
