use super::OutputHandler;
use crate::error::Result;
use crate::report::Report;
use async_trait::async_trait;
use std::io::Write;

/// Human-readable summary of a report.
pub struct ConsoleOutput<W> {
    writer: W,
}

impl<W: Write> ConsoleOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(report: &Report) -> Vec<String> {
        let classes = &report.failures_by_class;
        vec![
            "Load test completed:".to_string(),
            format!("   Elapsed Time: {}", report.elapsed_time),
            format!("   Requests Made: {}", report.total_requests),
            format!("   Successful (200): {}", report.successful_requests),
            format!("   3xx: {}", classes.redirection),
            format!("   4xx: {}", classes.client_error),
            format!("   5xx: {}", classes.server_error),
            format!("   Unclassified: {}", report.unclassified()),
        ]
    }
}

impl Default for ConsoleOutput<std::io::Stdout> {
    fn default() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send + Sync> OutputHandler for ConsoleOutput<W> {
    async fn write(&mut self, report: &Report) -> Result<()> {
        for line in Self::render(report) {
            writeln!(self.writer, "{}", line)?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
