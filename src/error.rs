use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems with the scenario or policy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("scenario validation error: {0}")]
    Invalid(String),
    #[error("policy table '{table}' is malformed: {reason}")]
    PolicyTable { table: &'static str, reason: String },
    #[error("engine requires a hazard policy")]
    MissingPolicy,
}

/// Recoverable problems in the hazard data file. Collected and logged, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataFormatError {
    #[error("hazard file {path} could not be read: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("hazard file has no '#Day' header")]
    MissingHeader,
    #[error("line {line}: day '{value}' is not a non-negative integer")]
    BadDay { line: usize, value: String },
    #[error("line {line}: cell '{value}' for {location} is not an integer")]
    BadCell {
        line: usize,
        location: String,
        value: String,
    },
    #[error("line {line}: expected at most {expected} cells, found {found}")]
    TooManyCells {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Fatal problems with the validation reference data.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reference data has no '#Day' header")]
    MissingHeader,
    #[error("reference data line {line}: {reason}")]
    BadRow { line: usize, reason: String },
    #[error("reference data has no column for camp '{0}'")]
    MissingCamp(String),
}
