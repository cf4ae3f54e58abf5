use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use yup_utils::exit::ExitCode;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("failed waiting for {} to exit", .executable.display())]
    Wait {
        executable: PathBuf,
        source: io::Error,
    },
    #[error("failed to start the supervisor runtime: {0}")]
    Runtime(io::Error),
}

impl SupervisorError {
    /// The code `yup` should exit with: the tool's own for a tool failure, [ExitCode::YUP_ERROR]
    /// for anything that went wrong on our side.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SupervisorError::Process(e) => e.exit_code,
            SupervisorError::Launch(_)
            | SupervisorError::Wait { .. }
            | SupervisorError::Runtime(_) => ExitCode::YUP_ERROR,
        }
    }
}

/// The executable could not be started at all.
#[derive(Debug, Error)]
#[error("failed to launch {}", .executable.display())]
pub struct LaunchError {
    pub executable: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The tool ran to completion but reported failure.
#[derive(Debug, Error)]
pub struct ProcessError {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    pub exit_code: ExitCode,
    pub elapsed: Duration,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exited with code {} after {:.2?}",
            self.executable.display(),
            self.exit_code,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    use yup_utils::exit::ExitCode;

    use super::{LaunchError, ProcessError, SupervisorError};

    #[test]
    fn process_error_reports_code_and_elapsed() {
        let err = ProcessError {
            executable: PathBuf::from("/opt/tool/bin/tool"),
            arguments: vec!["export".to_owned()],
            exit_code: ExitCode::new(2),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "/opt/tool/bin/tool exited with code 2 after 1.50s"
        );
    }

    #[test]
    fn exit_codes_separate_tool_failures_from_our_own() {
        let process = SupervisorError::from(ProcessError {
            executable: PathBuf::from("tool"),
            arguments: vec![],
            exit_code: ExitCode::new(7),
            elapsed: Duration::ZERO,
        });
        assert_eq!(process.exit_code(), ExitCode::new(7));

        let launch = SupervisorError::from(LaunchError {
            executable: PathBuf::from("tool"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(launch.exit_code(), ExitCode::YUP_ERROR);
        assert_eq!(launch.to_string(), "failed to launch tool");
    }

    #[test]
    fn launch_failure_chain_names_each_cause_once() {
        let launch = SupervisorError::from(LaunchError {
            executable: PathBuf::from("tool"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });

        let mut chain = vec![launch.to_string()];
        let mut cause = std::error::Error::source(&launch);
        while let Some(error) = cause {
            chain.push(error.to_string());
            cause = error.source();
        }

        assert_eq!(chain, ["failed to launch tool", "no such file"]);
    }
}
