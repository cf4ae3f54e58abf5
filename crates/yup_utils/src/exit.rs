use std::fmt;

/// Exit code to issue if yup itself fails, as opposed to the tool it supervises.
pub const CODE_ERROR: i32 = 101;

/// Exit code shells conventionally report for a process killed by a signal is this plus the
/// signal number.
#[cfg(unix)]
const SIGNAL_EXIT_BASE: i32 = 128;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    pub const YUP_ERROR: ExitCode = ExitCode(CODE_ERROR);

    pub const fn get(&self) -> i32 {
        self.0
    }

    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<std::process::ExitStatus> for ExitCode {
    fn from(es: std::process::ExitStatus) -> Self {
        if let Some(code) = es.code() {
            return Self::new(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = es.signal() {
                return Self::new(SIGNAL_EXIT_BASE + signal);
            }
        }

        Self::YUP_ERROR
    }
}

#[cfg(test)]
mod test {
    use super::ExitCode;

    #[test]
    #[cfg(unix)]
    fn status_codes_are_preserved() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        // Raw wait statuses keep the exit code in the second byte.
        assert_eq!(ExitCode::from(ExitStatus::from_raw(0)), ExitCode::SUCCESS);
        assert_eq!(ExitCode::from(ExitStatus::from_raw(2 << 8)), ExitCode::new(2));
    }

    #[test]
    #[cfg(unix)]
    fn signals_map_above_128() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        // SIGKILL
        assert_eq!(ExitCode::from(ExitStatus::from_raw(9)), ExitCode::new(137));
    }

    #[test]
    fn success_is_only_zero() {
        assert!(ExitCode::SUCCESS.is_success());
        assert!(!ExitCode::FAILURE.is_success());
        assert!(!ExitCode::new(-1).is_success());
    }
}
