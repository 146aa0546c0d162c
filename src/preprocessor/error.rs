use std::path::PathBuf;
use thiserror::Error;

/// A directive that cannot be expanded in the current scope.
/// Handlers know nothing about files, so the driver attaches the position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DirectiveError {
    pub message: String,
}

impl DirectiveError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        DirectiveError { message: message.into() }
    }
}

/// The only classified failure: every one of them aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}\nline {line}: {message}", .file.display())]
pub struct CompilationError {
    pub file: PathBuf,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error("invalid directive pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("unable to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_error_display() {
        let err = CompilationError {
            file: PathBuf::from("src/main.s"),
            line: 12,
            message: "Cannot call return outside of a function.".to_owned(),
        };
        assert_eq!(err.to_string(), "src/main.s\nline 12: Cannot call return outside of a function.");
    }
}
