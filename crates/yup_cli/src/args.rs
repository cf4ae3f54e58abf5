use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

/// Run an interactive build tool unattended
///
/// yup launches the configured tool, streams its output, and answers its yes/no confirmation
/// prompts when asked to.
#[derive(Parser)]
#[clap(version)]
pub struct Cli {
    /// Project configuration file.
    /// When not specified, `yup.toml` in the working directory is used if it exists.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to run the tool in. Defaults to the current directory.
    #[clap(long, global = true)]
    pub working_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Runs a tool subcommand under supervision.
    ///
    /// Exits with the tool's exit code if it fails.
    Build {
        #[clap(flatten)]
        target: Target,

        #[clap(flatten)]
        confirm: ConfirmArgs,

        /// Route the tool's output through the log instead of echoing it verbatim.
        #[clap(long)]
        log_output: bool,
    },
    /// Prints the resolved path of the tool executable.
    Locate,
    /// Prints the command `build` would run, without running it.
    ShowCommand {
        #[clap(flatten)]
        target: Target,

        #[clap(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Args)]
pub struct Target {
    /// Tool subcommand to run, e.g. `export`.
    pub subcommand: String,

    /// Add the configured debug-file arguments.
    #[clap(long)]
    pub include_debug_files: bool,

    /// Further arguments passed to the tool verbatim.
    #[clap(last = true)]
    pub passthrough: Vec<String>,
}

#[derive(Args)]
pub struct ConfirmArgs {
    /// Answer the tool's confirmation prompts. `--auto-confirm=false` opts out.
    #[clap(
        long,
        env = "YUP_AUTO_CONFIRM",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    auto_confirm: Option<bool>,

    /// Leave confirmation prompts to the terminal, even if configured otherwise.
    #[clap(long)]
    no_auto_confirm: bool,

    /// With auto-confirm, pipe affirmatives into the tool instead of detecting prompts.
    #[clap(
        long,
        env = "YUP_FORCE_BRUTE_FORCE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    force_brute_force: Option<bool>,
}

impl ConfirmArgs {
    /// [None] when neither the flags nor the environment say anything.
    pub fn auto_confirm(&self) -> Option<bool> {
        if self.no_auto_confirm {
            Some(false)
        } else {
            self.auto_confirm
        }
    }

    /// [None] when neither the flag nor the environment say anything.
    pub fn force_brute_force(&self) -> Option<bool> {
        self.force_brute_force
    }
}

#[cfg(test)]
mod test {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_with_passthrough() {
        let cli = Cli::try_parse_from([
            "yup",
            "--working-dir",
            "/work",
            "build",
            "export",
            "--auto-confirm",
            "--include-debug-files",
            "--",
            "--target",
            "linux",
        ])
        .unwrap();

        assert_eq!(cli.working_dir.unwrap().to_str(), Some("/work"));
        let Command::Build {
            target,
            confirm,
            log_output,
        } = cli.command
        else {
            panic!("expected build");
        };
        assert_eq!(target.subcommand, "export");
        assert!(target.include_debug_files);
        assert_eq!(target.passthrough, ["--target", "linux"]);
        assert_eq!(confirm.auto_confirm(), Some(true));
        assert_eq!(confirm.force_brute_force(), None);
        assert!(!log_output);
    }

    #[test]
    fn opting_out_wins() {
        let cli = Cli::try_parse_from([
            "yup",
            "show-command",
            "export",
            "--auto-confirm",
            "--no-auto-confirm",
        ])
        .unwrap();

        let Command::ShowCommand { confirm, .. } = cli.command else {
            panic!("expected show-command");
        };
        assert_eq!(confirm.auto_confirm(), Some(false));
    }

    #[test]
    fn explicit_false_is_kept_apart_from_unset() {
        let cli = Cli::try_parse_from([
            "yup",
            "build",
            "export",
            "--auto-confirm=false",
            "--force-brute-force=no",
        ])
        .unwrap();

        let Command::Build { confirm, .. } = cli.command else {
            panic!("expected build");
        };
        assert_eq!(confirm.auto_confirm(), Some(false));
        assert_eq!(confirm.force_brute_force(), Some(false));
    }

    #[test]
    fn build_needs_a_subcommand() {
        assert!(Cli::try_parse_from(["yup", "build"]).is_err());
    }
}
