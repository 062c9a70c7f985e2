use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// What a command produced: a JSON document, its console rendering and the
/// process exit code.
pub struct CommandOutput {
    pub data: Value,
    pub text: String,
    pub exit_code: u8,
}

impl CommandOutput {
    pub fn new(data: Value, text: impl Into<String>) -> Self {
        Self {
            data,
            text: text.into(),
            exit_code: 0,
        }
    }

    pub fn with_exit_code(mut self, exit_code: u8) -> Self {
        self.exit_code = exit_code;
        self
    }
}

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&output.data)?
            } else {
                serde_json::to_string(&output.data)?
            };
            println!("{payload}");
        }
        OutputFormat::Text => println!("{}", output.text.trim_end()),
    }

    Ok(())
}
