use crate::error::Result;
use crate::report::Report;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;

pub mod console;
pub mod json;

use console::ConsoleOutput;
use json::JsonOutput;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One compact JSON document per line
    #[default]
    Json,
    /// Indented JSON
    Pretty,
    /// Human-readable summary
    Text,
}

#[async_trait]
pub trait OutputHandler: Send + Sync {
    async fn write(&mut self, report: &Report) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Handler for `format` that writes the report to stdout.
pub fn create_output(format: OutputFormat) -> Box<dyn OutputHandler> {
    create_output_to(format, std::io::stdout())
}

pub fn create_output_to<W>(format: OutputFormat, writer: W) -> Box<dyn OutputHandler>
where
    W: Write + Send + Sync + 'static,
{
    match format {
        OutputFormat::Json => Box::new(JsonOutput::new(writer, false)),
        OutputFormat::Pretty => Box::new(JsonOutput::new(writer, true)),
        OutputFormat::Text => Box::new(ConsoleOutput::new(writer)),
    }
}
