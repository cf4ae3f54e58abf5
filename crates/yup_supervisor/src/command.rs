use std::fmt;
use std::path::{Path, PathBuf};

/// An invocation of the external tool: the resolved executable and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    executable: PathBuf,
    arguments: Vec<String>,
}

impl ExternalCommand {
    pub fn new<S>(executable: impl Into<PathBuf>, arguments: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            executable: executable.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// A `tokio` command launching the executable directly, with no stream wiring configured.
    pub(crate) fn to_direct(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.executable);
        cmd.args(&self.arguments);
        cmd
    }
}

/// Space-joined rendering for logs and error messages. Not suitable for a shell.
impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable.display())?;
        for arg in &self.arguments {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::ExternalCommand;

    #[test]
    fn display_joins_with_spaces() {
        let cmd = ExternalCommand::new("/opt/tool/bin/tool", ["export", "--target", "linux"]);
        assert_eq!(cmd.to_string(), "/opt/tool/bin/tool export --target linux");
    }

    #[test]
    fn no_arguments() {
        let cmd = ExternalCommand::new("tool", Vec::<String>::new());
        assert!(cmd.arguments().is_empty());
        assert_eq!(cmd.to_string(), "tool");
    }
}
