use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::artefact::Artefact;
use crate::export::{ExportError, ExportSink};

pub struct JsonlSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl ExportSink for JsonlSink {
    fn record(&self, record: &Artefact) -> Result<(), ExportError> {
        let mut guard = self.writer.lock().map_err(|_| ExportError::Poisoned)?;
        serde_json::to_writer(&mut *guard, record)?;
        guard.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ExportError> {
        let mut guard = self.writer.lock().map_err(|_| ExportError::Poisoned)?;
        guard.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::{ArtefactType, TimestampKind};
    use tempfile::tempdir;

    #[test]
    fn writes_one_object_per_line() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.jsonl");
        let sink = JsonlSink::create(&path).expect("sink");
        for ts in [1, 2] {
            let mut record = Artefact::new(ArtefactType::Cookie).at(TimestampKind::CreationTime, ts);
            record.cookie = Some("a=b".to_string());
            sink.record(&record).expect("record");
        }
        sink.flush().expect("flush");

        let text = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Artefact = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(second.timestamp, 2);
        assert_eq!(second.cookie.as_deref(), Some("a=b"));
    }
}
