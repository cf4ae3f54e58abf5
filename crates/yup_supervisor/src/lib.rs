//! Supervising an interactive external tool so that it can run unattended.
//!
//! A [Supervisor] launches the tool, streams its output to an [OutputSink], and, depending on the
//! configured [StrategyKind], answers the yes/no confirmation prompts the tool prints.

pub mod catalog;
pub mod classify;
pub mod command;
pub mod error;
pub mod inject;
pub mod lines;
pub mod multiplex;
pub mod output;
pub mod strategy;
pub mod supervisor;

pub use catalog::{InvalidPattern, PromptRule};
pub use classify::LineClassifier;
pub use command::ExternalCommand;
pub use error::{LaunchError, ProcessError, SupervisorError};
pub use output::{Origin, OutputLine, OutputSink, SharedSink, StdioSink, TracingSink};
pub use strategy::{compose_shell_line, ShellFamily, StrategyKind};
pub use supervisor::{ProcessOutcome, Supervisor, SupervisorConfig};
