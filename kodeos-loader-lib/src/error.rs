use thiserror::Error;

/// Convenient result type for `kodeos-loader-lib`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no serial port selected")]
    NoPortSelected,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("failed to launch `{program}`: {source}")]
    LaunchFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("flashing tool reported failure ({})", describe_exit(.code))]
    ToolReportedFailure { code: Option<i32> },

    #[error("operation cancelled by user")]
    CancelledByUser,

    #[error("failed to set up the tool output pipe: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Copyable classification of an [`Error`], suitable for storing in UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoPortSelected,
    InvalidParameters,
    LaunchFailure,
    ToolReportedFailure,
    CancelledByUser,
    Io,
}

impl Error {
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoPortSelected => ErrorKind::NoPortSelected,
            Self::InvalidParameters(_) => ErrorKind::InvalidParameters,
            Self::LaunchFailure { .. } => ErrorKind::LaunchFailure,
            Self::ToolReportedFailure { .. } => ErrorKind::ToolReportedFailure,
            Self::CancelledByUser => ErrorKind::CancelledByUser,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
