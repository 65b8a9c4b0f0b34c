use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::artefact::Artefact;
use crate::export::{ExportError, ExportSink};

/// Streams a pretty-printed JSON array. The output is byte-identical to
/// `serde_json::to_writer_pretty` over the whole slice.
pub struct JsonSink {
    state: Mutex<JsonState>,
}

struct JsonState {
    writer: BufWriter<File>,
    count: usize,
    finished: bool,
}

impl JsonSink {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)?;
        Ok(Self {
            state: Mutex::new(JsonState {
                writer: BufWriter::new(file),
                count: 0,
                finished: false,
            }),
        })
    }
}

impl ExportSink for JsonSink {
    fn record(&self, record: &Artefact) -> Result<(), ExportError> {
        let mut state = self.state.lock().map_err(|_| ExportError::Poisoned)?;
        if state.finished {
            return Err(ExportError::Io(std::io::Error::other(
                "record after flush",
            )));
        }
        let body = serde_json::to_string_pretty(record)?;
        let separator = if state.count == 0 { "[\n" } else { ",\n" };
        state.writer.write_all(separator.as_bytes())?;
        for (idx, line) in body.lines().enumerate() {
            if idx > 0 {
                state.writer.write_all(b"\n")?;
            }
            state.writer.write_all(b"  ")?;
            state.writer.write_all(line.as_bytes())?;
        }
        state.count += 1;
        Ok(())
    }

    fn flush(&self) -> Result<(), ExportError> {
        let mut state = self.state.lock().map_err(|_| ExportError::Poisoned)?;
        if !state.finished {
            let trailer: &[u8] = if state.count == 0 { b"[]" } else { b"\n]" };
            state.writer.write_all(trailer)?;
            state.finished = true;
        }
        state.writer.flush()?;
        Ok(())
    }
}
