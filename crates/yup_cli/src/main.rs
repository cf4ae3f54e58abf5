mod args;
mod assemble;
mod config;
mod locate;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use yup_supervisor::{
    compose_shell_line, ExternalCommand, SharedSink, ShellFamily, StdioSink, StrategyKind,
    Supervisor, SupervisorConfig, SupervisorError, TracingSink,
};
use yup_utils::exit::ExitCode;

use args::{Cli, Command, ConfirmArgs, Target};
use config::Config;

fn main() {
    let log_guard = match logging::init() {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("warning: logging is disabled: {error:#}");
            None
        }
    };

    let cli = Cli::parse();

    let exit_code = match run(cli) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::YUP_ERROR
        }
    };

    // `exit` skips destructors; flush file logs first.
    drop(log_guard);
    std::process::exit(exit_code.get());
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Absolute, since the tool is spawned inside it by a path that may be relative to it.
    let current_dir = std::env::current_dir().context("cannot determine the current directory")?;
    let working_dir = match cli.working_dir {
        Some(dir) => current_dir.join(dir),
        None => current_dir,
    };
    let config = config::load(cli.config.as_deref(), &working_dir)?;

    match cli.command {
        Command::Locate => {
            let executable = resolve_tool(&config, &working_dir)?;
            println!("{}", executable.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::ShowCommand { target, confirm } => {
            let command = build_command(&config, &target, &working_dir)?;
            println!("{command}");

            let supervisor_config = supervisor_config(&config, &confirm, working_dir);
            let strategy = StrategyKind::select(
                supervisor_config.auto_confirm,
                supervisor_config.force_brute_force,
            );
            if strategy == StrategyKind::BruteForce {
                println!("{}", compose_shell_line(ShellFamily::host(), &command));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Build {
            target,
            confirm,
            log_output,
        } => {
            let command = build_command(&config, &target, &working_dir)?;
            let sink: SharedSink = if log_output {
                Arc::new(TracingSink)
            } else {
                Arc::new(StdioSink)
            };
            let supervisor = Supervisor::new(
                supervisor_config(&config, &confirm, working_dir),
                sink,
            )
            .with_classifier(config.classifier()?);

            tracing::info!(%command, strategy = %supervisor.strategy_kind(), "running tool");

            match supervisor.run_blocking(&command) {
                Ok(outcome) => {
                    tracing::info!(
                        elapsed = ?outcome.elapsed,
                        responses_sent = outcome.responses_sent,
                        "tool finished"
                    );
                    Ok(outcome.exit_code)
                }
                Err(SupervisorError::Process(error)) => {
                    eprintln!("error: {error}");
                    Ok(error.exit_code)
                }
                Err(error) => Err(error.into()),
            }
        }
    }
}

fn resolve_tool(config: &Config, working_dir: &Path) -> anyhow::Result<PathBuf> {
    let name = config
        .tool_name
        .as_deref()
        .context("no tool configured; set `name` under [tool] in yup.toml")?;
    let executable = locate::locate(name, &config.search_dirs, working_dir)?;
    tracing::debug!(executable = %executable.display(), "resolved tool");
    Ok(executable)
}

fn build_command(
    config: &Config,
    target: &Target,
    working_dir: &Path,
) -> anyhow::Result<ExternalCommand> {
    let executable = resolve_tool(config, working_dir)?;
    Ok(assemble::assemble(
        executable,
        config,
        &target.subcommand,
        target.include_debug_files || config.include_debug_files,
        &target.passthrough,
    ))
}

/// Flags override the configuration files.
fn supervisor_config(
    config: &Config,
    confirm: &ConfirmArgs,
    working_dir: PathBuf,
) -> SupervisorConfig {
    SupervisorConfig {
        auto_confirm: confirm.auto_confirm().unwrap_or(config.auto_confirm),
        force_brute_force: confirm
            .force_brute_force()
            .unwrap_or(config.force_brute_force),
        prompt_idle: config.prompt_idle,
        drain_grace: config.drain_grace,
        working_dir: Some(working_dir),
    }
}
