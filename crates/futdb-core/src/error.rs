use std::path::PathBuf;

use thiserror::Error;

/// Validation and contract errors exposed by `futdb-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date must be formatted YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("month {month} is outside 1..=12")]
    InvalidMonth { month: u8 },
    #[error("year {year} is outside the supported range")]
    InvalidYear { year: i32 },

    #[error("root cannot be empty")]
    EmptyRoot,
    #[error("root contains invalid character '{ch}' at index {index}")]
    RootInvalidChar { ch: char, index: usize },

    #[error("unknown roll strategy '{value}', expected calendar[-Nd], volume or open-interest")]
    UnknownRollStrategy { value: String },
    #[error("contract series id '{value}' has no FRONT or RANK_N token")]
    UnrecognizedSeriesId { value: String },
    #[error("continuous symbol '{value}' must look like ROOT.c.RANK")]
    InvalidContinuousSymbol { value: String },

    #[error("window start {start} is after end {end}")]
    InvertedWindow { start: String, end: String },
    #[error("window length must be at least one day")]
    EmptyWindow,
}

/// Errors raised while loading or validating the versioned mapping config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("root '{root}': {reason}")]
    InvalidRoot { root: String, reason: String },
}
