use super::RecordSink;
use crate::config::JsonStyle;
use crate::shape::ShapedRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one JSON object per record, each terminated by a newline.
pub struct JsonLinesSink {
    writer: BufWriter<Box<dyn Write + Send>>,
    style: JsonStyle,
}

impl JsonLinesSink {
    pub fn new<P: AsRef<Path>>(path: P, style: JsonStyle) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("Sink: Failed to create {:?}", path))?;
        Ok(Self {
            writer: BufWriter::new(Box::new(file)),
            style,
        })
    }

    pub fn stdout(style: JsonStyle) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(Box::new(std::io::stdout())),
            style,
        })
    }
}

/// Default output location: the input path with `.json` appended.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".json");
    PathBuf::from(path)
}

impl RecordSink for JsonLinesSink {
    fn add_record(&mut self, record: ShapedRecord) -> Result<()> {
        match self.style {
            JsonStyle::Compact => serde_json::to_writer(&mut self.writer, &record)?,
            JsonStyle::Pretty => serde_json::to_writer_pretty(&mut self.writer, &record)?,
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
