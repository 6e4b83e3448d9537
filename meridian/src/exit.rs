// meridian/src/exit.rs

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    UsageError = 2,
    ValidationFailure = 3,
    ResolutionFailure = 4,
    ConnectivityFailure = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}
