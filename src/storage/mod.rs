// src/storage/mod.rs
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::extractors::{DocumentKind, OutputRecord, PassReport, Schema};
use crate::utils::error::StorageError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serializes fixed-schema records into a delimited table.
pub trait TabularWriter {
    /// Writes the header row and every record. Returns the number of records written.
    fn write_table(&mut self, schema: &Schema, records: &[OutputRecord]) -> Result<usize, StorageError>;
}

/// Semicolon-delimited UTF-8 output, quoting only where a field needs it.
pub struct CsvTableWriter<W: Write> {
    inner: W,
    bom: bool,
}

impl<W: Write> CsvTableWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, bom: false }
    }

    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> TabularWriter for CsvTableWriter<W> {
    fn write_table(&mut self, schema: &Schema, records: &[OutputRecord]) -> Result<usize, StorageError> {
        if self.bom {
            self.inner.write_all(UTF8_BOM)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(&mut self.inner);

        writer.write_record(schema.columns)?;
        for record in records {
            let fields = record.fields();
            if record.schema() != *schema || fields.len() != schema.width() {
                return Err(StorageError::Width {
                    schema: schema.name,
                    expected: schema.width(),
                    found: fields.len(),
                });
            }
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(records.len())
    }
}

pub struct StorageManager {
    base_dir: PathBuf,
    bom: bool,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P, bom: bool) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path, bom })
    }

    pub fn table_path(&self, stem: &str) -> PathBuf {
        self.base_dir.join(format!("{}.csv", stem))
    }

    /// Directory for the diagnostics of one document, created on demand.
    pub fn debug_dir(&self, stem: &str) -> Result<PathBuf, StorageError> {
        let dir = self.base_dir.join(format!("{}_debug", stem));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Writes the records of one pass to `<stem>.csv`. The table is rendered
    /// in memory first so a failure never leaves a partial file behind.
    pub fn save_table(&self, stem: &str, report: &PassReport) -> Result<PathBuf, StorageError> {
        let mut writer = CsvTableWriter::new(Vec::new()).with_bom(self.bom);
        writer.write_table(&report.schema, &report.records)?;

        let file_path = self.table_path(stem);
        fs::write(&file_path, writer.into_inner())?;

        tracing::info!("Saved {} records to {}", report.records.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves a summary of the pass in JSON format next to the table
    pub fn save_metadata(
        &self,
        stem: &str,
        input: &Path,
        kind: DocumentKind,
        extractor: &str,
        report: &PassReport,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("{}.meta.json", stem));

        let metadata = serde_json::json!({
            "input": input.display().to_string(),
            "kind": kind,
            "extractor": extractor,
            "schema": report.schema.name,
            "columns": report.schema.columns,
            "outcome": report.outcome,
            "records": report.records.len(),
            "units": report.units,
            "sections": report.sections,
            "assembler": report.stats,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }
}

/// Output stems for a batch of inputs, in input order. The first input with
/// a given file stem keeps it; later ones get `_2`, `_3`, ... so concurrent
/// documents never write the same table.
pub fn output_stems(inputs: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = inputs.iter().map(|input| file_stem(input)).collect();
    let mut claimed: HashSet<String> = HashSet::with_capacity(inputs.len());
    let mut stems = Vec::with_capacity(inputs.len());

    for input in inputs {
        let base = file_stem(input);
        let stem = if claimed.insert(base.clone()) {
            base
        } else {
            let unique = (2..)
                .map(|n| format!("{}_{}", base, n))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_else(|| base.clone());
            tracing::warn!(
                "Output name '{}' is already used in this run, writing {} as '{}'",
                base,
                input.display(),
                unique
            );
            taken.insert(unique.clone());
            claimed.insert(unique.clone());
            unique
        };
        stems.push(stem);
    }
    stems
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::records::{DestinationRow, ScoreRow, DESTINATION_SCHEMA, SCORE_SCHEMA};
    use crate::extractors::{run_pass, Profile};

    fn render(schema: &Schema, records: &[OutputRecord], bom: bool) -> String {
        let mut writer = CsvTableWriter::new(Vec::new()).with_bom(bom);
        writer.write_table(schema, records).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn destination_rows_keep_accents_and_decimal_commas() {
        let row = OutputRecord::Destination(DestinationRow {
            issuing_body: "MINISTERIO DE EDUCACIÓN".into(),
            directive_center: "SUBSECRETARÍA".into(),
            destination_center: String::new(),
            province: "A CORUÑA".into(),
            locality: "CORUÑA, A".into(),
            position: "AUXILIAR; OFICINA".into(),
            position_code: "1234567".into(),
            supplement: "3.656,24".into(),
        });
        let out = render(&DESTINATION_SCHEMA, &[row], false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "MINISTERIO;CDIR;CDES;PROVINCIA;LOCALIDAD;PUESTO;CPUESTO;ESPECIFICO");
        assert_eq!(
            lines[1],
            "MINISTERIO DE EDUCACIÓN;SUBSECRETARÍA;;A CORUÑA;CORUÑA, A;\"AUXILIAR; OFICINA\";1234567;3.656,24"
        );
    }

    #[test]
    fn scores_are_not_quoted() {
        let row = OutputRecord::Score(ScoreRow {
            surname1: "GARCIA".into(),
            surname2: "LOPEZ".into(),
            given_name: "JUAN".into(),
            id_digits: "12345678".into(),
            score: "9,20".into(),
        });
        let out = render(&SCORE_SCHEMA, &[row], false);
        assert_eq!(out.lines().nth(1), Some("GARCIA;LOPEZ;JUAN;***12345678**;9,20"));
    }

    #[test]
    fn bom_prefixes_the_header() {
        let out = render(&SCORE_SCHEMA, &[], true);
        assert!(out.starts_with('\u{feff}'));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn mismatched_width_is_rejected() {
        let row = OutputRecord::Destination(DestinationRow::default());
        let mut writer = CsvTableWriter::new(Vec::new());
        let err = writer.write_table(&SCORE_SCHEMA, &[row]).unwrap_err();
        assert!(matches!(err, StorageError::Width { expected: 5, found: 8, .. }));
    }

    #[test]
    fn empty_pass_writes_header_only_table_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out"), false).unwrap();
        let input = Path::new("/data/listado0.pdf");
        let report = run_pass(&Profile::for_kind(DocumentKind::Definitive), "", false);

        let table = storage.save_table("listado0", &report).unwrap();
        assert_eq!(table.file_name().unwrap(), "listado0.csv");
        let written = fs::read_to_string(&table).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.starts_with("DNI;Apellidos y nombre;"));

        let meta = storage
            .save_metadata("listado0", input, DocumentKind::Definitive, "pdf", &report)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(meta).unwrap()).unwrap();
        assert_eq!(json["outcome"], "no_records_found");
        assert_eq!(json["kind"], "definitive");
        assert_eq!(json["records"], 0);
    }

    #[test]
    fn shared_stems_get_distinct_outputs() {
        let inputs: Vec<PathBuf> = ["a/listado.pdf", "b/listado.txt", "listado_2.pdf", "c/listado.pdf", "otro.txt"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(
            output_stems(&inputs),
            vec!["listado", "listado_3", "listado_2", "listado_4", "otro"]
        );

        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path(), false).unwrap();
        let stems = output_stems(&inputs[..2]);
        assert_ne!(storage.table_path(&stems[0]), storage.table_path(&stems[1]));
    }
}
