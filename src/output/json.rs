use super::OutputHandler;
use crate::error::Result;
use crate::report::Report;
use async_trait::async_trait;
use std::io::Write;

pub struct JsonOutput<W> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonOutput<W> {
    pub fn new(writer: W, pretty: bool) -> Self {
        Self { writer, pretty }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send + Sync> OutputHandler for JsonOutput<W> {
    async fn write(&mut self, report: &Report) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, report)?;
        } else {
            serde_json::to_writer(&mut self.writer, report)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
