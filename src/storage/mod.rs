// src/storage/mod.rs
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::extractors::pipeline::Extraction;
use crate::extractors::rows::Record;
use crate::utils::error::StorageError;

/// Spreadsheet programs use the BOM to detect UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct StorageManager {
    output_path: PathBuf,
}

impl StorageManager {
    /// Creates a StorageManager writing to `output_path`, creating its directory if needed
    pub fn new<P: AsRef<Path>>(output_path: P) -> Result<Self, StorageError> {
        let output_path = output_path.as_ref().to_path_buf();

        let parent = output_dir(&output_path);
        if !parent.exists() {
            fs::create_dir_all(&parent).map_err(StorageError::IoError)?;
        }

        Ok(Self { output_path })
    }

    /// Writes all records as `;`-separated UTF-8 (with BOM), header line first.
    /// The file only appears once it is complete.
    pub fn save_records(&self, records: &[Record]) -> Result<PathBuf, StorageError> {
        let mut temp = NamedTempFile::new_in(output_dir(&self.output_path))?;
        temp.write_all(UTF8_BOM)?;

        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b';')
                .terminator(csv::Terminator::Any(b'\n'))
                .has_headers(false)
                .from_writer(temp.as_file_mut());
            writer.write_record(Record::COLUMNS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }

        temp.persist(&self.output_path)
            .map_err(|e| StorageError::IoError(e.error))?;

        tracing::info!("Saved {} records to {}", records.len(), self.output_path.display());

        Ok(self.output_path.clone())
    }

    /// Saves a JSON summary of the run
    pub fn save_summary<P: AsRef<Path>>(
        &self,
        summary_path: P,
        input_path: &Path,
        extraction: &Extraction,
    ) -> Result<PathBuf, StorageError> {
        let file_path = summary_path.as_ref().to_path_buf();

        let summary = serde_json::json!({
            "input": input_path.display().to_string(),
            "output": self.output_path.display().to_string(),
            "page_count": extraction.page_count,
            "pages_with_headings": extraction.pages_with_headings,
            "pages_with_records": extraction.pages_with_records,
            "record_count": extraction.records.len(),
            "generated_at": chrono::Utc::now().to_rfc3339(),
        });

        let summary_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let parent = output_dir(&file_path);
        if !parent.exists() {
            fs::create_dir_all(&parent).map_err(StorageError::IoError)?;
        }
        fs::write(&file_path, summary_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved run summary to {}", file_path.display());

        Ok(file_path)
    }
}

/// Directory a file will be written into; `.` for bare file names.
fn output_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "MINISTERIO;CDIR;CDES;PROVINCIA;LOCALIDAD;PUESTO;CPUESTO;ESPECIFICO";

    fn record() -> Record {
        Record {
            ministerio: "MINISTERIO DE EXAMPLE".into(),
            cdir: "D.G. Uno".into(),
            cdes: "S.G. Dos; Área \"B\"".into(),
            provincia: "MADRID".into(),
            localidad: "Getafe".into(),
            puesto: "Analista".into(),
            cpuesto: "4711".into(),
            especifico: "9.876,54".into(),
        }
    }

    #[test]
    fn test_csv_has_bom_and_header() {
        let dir = tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("vacantes.csv")).unwrap();
        let path = storage.save_records(&[record()]).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();

        assert_eq!(lines[0].split(';').collect::<Vec<_>>(), Record::COLUMNS.to_vec());
        assert_eq!(
            lines[1],
            "MINISTERIO DE EXAMPLE;D.G. Uno;\"S.G. Dos; Área \"\"B\"\"\";MADRID;Getafe;Analista;4711;9.876,54"
        );
        assert_eq!(lines[2], "", "file ends with a single terminator");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_header_written_without_records() {
        let dir = tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("empty.csv")).unwrap();
        let path = storage.save_records(&[]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("\u{feff}{}\n", HEADER));
    }

    #[test]
    fn test_creates_missing_directory_and_overwrites() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("out.csv");
        let storage = StorageManager::new(&target).unwrap();

        storage.save_records(&[record(), record()]).unwrap();
        storage.save_records(&[]).unwrap();

        let text = fs::read_to_string(&target).unwrap();
        assert_eq!(text.lines().count(), 1);
        // Only the output itself is left behind, no temporary files.
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_summary_contents() {
        let dir = tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("vacantes.csv")).unwrap();
        let extraction = Extraction {
            records: vec![record()],
            page_count: 4,
            pages_with_headings: 3,
            pages_with_records: 1,
        };

        let path = storage
            .save_summary(dir.path().join("summary.json"), Path::new("listado0.pdf"), &extraction)
            .unwrap();
        let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(summary["input"], "listado0.pdf");
        assert_eq!(summary["page_count"], 4);
        assert_eq!(summary["pages_with_headings"], 3);
        assert_eq!(summary["record_count"], 1);
        assert!(chrono::DateTime::parse_from_rfc3339(summary["generated_at"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_output_dir_of_bare_file_name() {
        assert_eq!(output_dir(Path::new("vacantes.csv")), PathBuf::from("."));
        assert_eq!(output_dir(Path::new("out/vacantes.csv")), PathBuf::from("out"));
    }
}
