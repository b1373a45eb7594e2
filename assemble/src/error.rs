use std::{io, path::PathBuf};

use common::ConfigError;
use thiserror::Error;
use ucode::UcodeError;

use crate::source::{ProjectFile, SourceLine};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("{file}: {message}")]
    Syntax { file: ProjectFile, message: String },
    #[error("{file} line {line}: {message}")]
    Line { file: ProjectFile, line: usize, message: String },
    #[error("{file} line {line}: {source}")]
    Config { file: ProjectFile, line: usize, source: ConfigError },
    #[error("{file}: {source}")]
    Invalid { file: ProjectFile, source: ConfigError },
    #[error("{file} line {line}: {source}")]
    Code { file: ProjectFile, line: usize, source: UcodeError },
    #[error("{file}: section [{section}] is missing")]
    MissingSection { file: ProjectFile, section: String },
    #[error(transparent)]
    Build(#[from] UcodeError),
}

impl SourceError {
    pub(crate) fn line<S: Into<String>>(file: ProjectFile, line: usize, message: S) -> SourceError {
        SourceError::Line { file, line, message: message.into() }
    }

    pub(crate) fn config(file: ProjectFile, line: &SourceLine) -> impl FnOnce(ConfigError) -> SourceError {
        let line = line.number;
        move |source| SourceError::Config { file, line, source }
    }

    pub(crate) fn code(file: ProjectFile, line: &SourceLine) -> impl FnOnce(UcodeError) -> SourceError {
        let line = line.number;
        move |source| SourceError::Code { file, line, source }
    }
}
