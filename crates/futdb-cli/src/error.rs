use thiserror::Error;

/// Anything that stops the tool. Data problems found by diagnostics are not
/// errors; they travel in the report and its exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] futdb_core::ValidationError),

    #[error(transparent)]
    Config(#[from] futdb_core::ConfigError),

    #[error(transparent)]
    Warehouse(#[from] futdb_warehouse::WarehouseError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_)
            | Self::Config(_)
            | Self::Warehouse(_)
            | Self::Command(_)
            | Self::Serialization(_)
            | Self::Io(_) => 1,
        }
    }
}
