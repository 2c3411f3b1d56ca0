//! JSON output adapter.

use anyhow::Result;
use bubble_grade_core::{ResultOutput, SheetReport};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;

use crate::commands::OutputFormat;

/// JSON output adapter.
///
/// In JSON Lines mode every record is written as it arrives. In array mode
/// records are held until [`ResultOutput::flush`] writes them as one array.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    format: OutputFormat,
    pretty: bool,
    pending: Mutex<Vec<serde_json::Value>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat, pretty: bool) -> Self {
        Self::new(Box::new(io::stdout()), format, pretty)
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
            pretty,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Writes or buffers any serializable record.
    #[allow(clippy::significant_drop_tightening)]
    pub fn emit<T: Serialize>(&self, record: &T) -> Result<()> {
        match self.format {
            OutputFormat::Jsonl => {
                let json = serde_json::to_string(record)?;
                let mut writer = self
                    .writer
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
                writeln!(writer, "{json}")?;
            }
            OutputFormat::Json => {
                let value = serde_json::to_value(record)?;
                self.pending
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?
                    .push(value);
            }
        }
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn write_array(&self, writer: &mut dyn Write) -> Result<()> {
        let records = std::mem::take(
            &mut *self
                .pending
                .lock()
                .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?,
        );
        let json = if self.pretty {
            serde_json::to_string_pretty(&records)?
        } else {
            serde_json::to_string(&records)?
        };
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    fn write(&self, report: &SheetReport) -> Result<()> {
        self.emit(report)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        if matches!(self.format, OutputFormat::Json) {
            self.write_array(&mut **writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}
