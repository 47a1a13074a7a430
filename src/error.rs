use std::fmt;
use std::path::PathBuf;

/// Faults raised while resolving jumps or executing a program.
#[derive(Debug, thiserror::Error)]
pub enum BrainfuckError {
    /// A bracket scan ran off either end of the program without finding its
    /// partner, or jump resolution started from something other than a bracket.
    #[error("Malformed program: {kind} at instruction {ip}")]
    MalformedProgram { ip: usize, kind: UnmatchedBracketKind },

    /// The data pointer left the tape and the bounds policy is `error`.
    #[error("Pointer out of bounds at instruction {ip} (ptr={ptr}, op='{op}')")]
    TapeBounds { ip: usize, ptr: usize, op: char },

    /// Reading stdin or writing stdout failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: u64 },

    #[error("Execution aborted: cancelled")]
    Canceled,
}

/// Why a bracket could not be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    Open,
    Close,
    /// The jump started on this byte instead of a bracket; `None` is the end of the program.
    NotABracket(Option<char>),
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::Open => write!(f, "unmatched bracket '['"),
            UnmatchedBracketKind::Close => write!(f, "unmatched bracket ']'"),
            UnmatchedBracketKind::NotABracket(Some(found)) => {
                write!(f, "jump from non-bracket {found:?}")
            }
            UnmatchedBracketKind::NotABracket(None) => write!(f, "jump from end of program"),
        }
    }
}

/// The source file could not be read.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", .path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Bad settings from the command line, the environment or the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid memory size '{0}': expected a positive integer")]
    InvalidMemorySize(String),

    #[error("cannot allocate a tape of {size} cells: {source}")]
    TapeAllocation {
        size: usize,
        #[source]
        source: std::collections::TryReserveError,
    },

    #[error("invalid step limit '{0}': expected a non-negative integer")]
    InvalidStepLimit(String),

    #[error("invalid {what} policy '{value}' (expected one of: {expected})")]
    InvalidPolicy {
        what: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{}: line {line}: {message}", .path.display())]
    ConfigFile {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing sourcefile, use -h for help")]
    MissingSource,
}
