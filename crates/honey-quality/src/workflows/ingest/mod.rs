//! CSV extraction of lab measurement exports.

mod mapping;
mod normalizer;
mod parser;

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::workflows::quality::domain::SampleRecord;
use crate::workflows::quality::repository::{RecordSource, SourceError};

enum CsvInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// [`RecordSource`] over a CSV file or an in-memory CSV body. Parsing happens on
/// `extract`, so read and format errors surface as extraction-stage failures.
pub struct CsvRecordSource {
    name: String,
    input: CsvInput,
}

impl CsvRecordSource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "csv".to_string());
        Self {
            name,
            input: CsvInput::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            input: CsvInput::Bytes(bytes.into()),
        }
    }
}

impl RecordSource for CsvRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self) -> Result<Vec<SampleRecord>, SourceError> {
        match &self.input {
            CsvInput::Path(path) => {
                let file = File::open(path).map_err(|source| SourceError::Io {
                    location: path.display().to_string(),
                    source,
                })?;
                parser::parse_records(file, &self.name)
            }
            CsvInput::Bytes(bytes) => parser::parse_records(Cursor::new(bytes), &self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn path_source_is_named_after_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("spring_harvest.csv");
        let mut file = File::create(&path).expect("create csv");
        writeln!(file, "sample_id,moisture").expect("write header");
        writeln!(file, "S-1,17.5").expect("write row");

        let source = CsvRecordSource::from_path(&path);
        assert_eq!(source.name(), "spring_harvest");
        let records = source.extract().expect("extracts");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].batch_id, "spring_harvest");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = CsvRecordSource::from_path("/nonexistent/honey.csv");
        assert!(matches!(source.extract(), Err(SourceError::Io { .. })));
    }

    #[test]
    fn byte_source_parses_lazily() {
        let source = CsvRecordSource::from_bytes("upload", "moisture\n16.0\n");
        let records = source.extract().expect("extracts");
        assert_eq!(records[0].measurement("moisture"), Some(16.0));
    }
}
