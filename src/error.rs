/// Process-level error: an exit code plus a human-readable message.
///
/// Module seams use typed `thiserror` enums (`ConfigError`, `SourceError`,
/// `ResolveError`, `LayoutError`); those are folded into `AppError` only at the
/// point where the CLI or TUI has to stop.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

/// Exit code for configuration and usage problems.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for runtime failures (terminal, IO, exports).
pub const EXIT_RUNTIME: u8 = 4;

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::config(format!("Invalid configuration: {err}"))
    }
}

impl From<crate::table::LayoutError> for AppError {
    fn from(err: crate::table::LayoutError) -> Self {
        AppError::config(format!("Invalid table layout: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_errors_map_to_config_exit_code() {
        let err: AppError = crate::table::LayoutError::NoSeries.into();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
        assert!(err.to_string().contains("no series"));
    }
}
