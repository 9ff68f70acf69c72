//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Errors surfaced by parsing, parameter handling and the MIP engine.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{}: parsing error at line {line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParam { name: String, message: String },
    #[error("unknown solver `{0}`")]
    UnknownSolver(String),
    #[error("lp engine: {0}")]
    Lp(String),
    #[error("callback failed: {0}")]
    Callback(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
