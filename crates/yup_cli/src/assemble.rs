use std::path::PathBuf;

use yup_supervisor::ExternalCommand;

use crate::config::Config;

/// `[subcommand] ++ build args ++ debug file args (if enabled) ++ passthrough`.
pub fn assemble(
    executable: PathBuf,
    config: &Config,
    subcommand: &str,
    include_debug_files: bool,
    passthrough: &[String],
) -> ExternalCommand {
    let debug_files_args: &[String] = if include_debug_files {
        &config.debug_files_args
    } else {
        &[]
    };

    let arguments = std::iter::once(subcommand)
        .chain(config.build_args.iter().map(String::as_str))
        .chain(debug_files_args.iter().map(String::as_str))
        .chain(passthrough.iter().map(String::as_str));

    ExternalCommand::new(executable, arguments)
}
