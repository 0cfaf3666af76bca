// src/main.rs
mod extractors;
mod source;
mod storage;
mod utils;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use extractors::{run_pass, DocumentKind, PassOutcome, Profile, TokenMode};
use storage::{output_stems, StorageManager};
use utils::AppError;

/// Rebuilds tabular records from the text layer of BOE listings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Documents to process (PDF, or text already extracted to .txt)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Document family, which selects the record grammar
    #[arg(short, long, value_enum, default_value_t = DocumentKind::Destinations)]
    kind: DocumentKind,

    /// Output directory for the CSV tables
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Split record lines into words before classification
    #[arg(long)]
    split_words: bool,

    /// Minimum number of fragments a destination record needs to be resolved
    #[arg(long, default_value_t = extractors::profile::DEFAULT_MIN_FRAGMENTS)]
    min_fragments: usize,

    /// Write salary supplements with a decimal point (3656.24 instead of 3.656,24)
    #[arg(long)]
    decimal_point: bool,

    /// Prefix each CSV with a UTF-8 byte order mark
    #[arg(long)]
    bom: bool,

    /// Debug mode - save the raw text and the per-unit classification
    #[arg(short, long)]
    debug: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentStatus {
    Written(usize),
    Empty,
}

#[derive(Debug)]
struct DocumentSummary {
    table: PathBuf,
    status: DocumentStatus,
}

fn build_profile(args: &Args) -> Result<Profile, AppError> {
    if args.min_fragments < extractors::resolver::MIN_RESOLVABLE {
        return Err(AppError::Config(format!(
            "--min-fragments must be at least {}",
            extractors::resolver::MIN_RESOLVABLE
        )));
    }

    let mut profile = Profile::for_kind(args.kind)
        .with_min_fragments(args.min_fragments)
        .with_decimal_point(args.decimal_point);
    if args.split_words {
        if args.kind != DocumentKind::Destinations {
            tracing::warn!("--split-words only affects destination listings");
        }
        profile = profile.with_token_mode(TokenMode::Words);
    }
    tracing::debug!("Using profile: {:?}", profile);
    Ok(profile)
}

/// Runs one document end to end. Extraction failures are fatal for the
/// document and leave no table behind.
fn process_document(
    path: &Path,
    stem: &str,
    profile: &Profile,
    storage: &StorageManager,
    debug: bool,
) -> Result<DocumentSummary, AppError> {
    let extractor = source::extractor_for(path)?;
    tracing::info!("Extracting text from {} ({} extractor)", path.display(), extractor.name());
    let text = extractor.extract(path)?;

    let report = run_pass(profile, &text, debug);

    if debug {
        match storage.debug_dir(stem) {
            Ok(dir) => {
                if let Err(e) = utils::text_debug::save_raw_text(&text, &dir.join("raw_text.txt")) {
                    tracing::warn!("Failed to save raw text: {}", e);
                }
                if let Err(e) =
                    utils::text_debug::save_classification(&report.trace, &dir.join("classification.txt"))
                {
                    tracing::warn!("Failed to save classification: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to create debug directory: {}", e),
        }
    }

    let table = storage.save_table(stem, &report)?;
    if let Err(e) = storage.save_metadata(stem, path, profile.kind, extractor.name(), &report) {
        tracing::error!("Failed to save metadata for {}: {}", path.display(), e);
    }

    let status = match report.outcome {
        PassOutcome::Records(count) => DocumentStatus::Written(count),
        PassOutcome::NoRecordsFound => {
            tracing::warn!(
                "No records found in {} ({} units, {} sections); raw text follows on stdout",
                path.display(),
                report.units,
                report.sections
            );
            // One locked write per document keeps concurrent dumps apart.
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{}", text)?;
            DocumentStatus::Empty
        }
    };

    Ok(DocumentSummary { table, status })
}

/// Processes every input on the blocking pool. Passes share no state and
/// each writes under its own output name; results come back in input order.
async fn run_documents(
    inputs: Vec<PathBuf>,
    profile: Arc<Profile>,
    storage: Arc<StorageManager>,
    debug: bool,
) -> Vec<(PathBuf, Result<DocumentSummary, AppError>)> {
    let stems = output_stems(&inputs);
    let mut handles = Vec::with_capacity(inputs.len());
    for (path, stem) in inputs.into_iter().zip(stems) {
        let profile = Arc::clone(&profile);
        let storage = Arc::clone(&storage);
        let task_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            process_document(&task_path, &stem, &profile, &storage, debug)
        });
        handles.push((path, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(AppError::Task(e)),
        };
        results.push((path, result));
    }
    results
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.verbose);
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Build the engine profile and storage
    let profile = Arc::new(build_profile(&args)?);
    let storage = Arc::new(StorageManager::new(&args.output_dir, args.bom)?);

    // 4. Process each document
    let results = run_documents(args.inputs.clone(), profile, storage, args.debug).await;

    let mut success_count = 0;
    let mut empty_count = 0;
    let mut failure_count = 0;

    for (path, result) in results {
        match result {
            Ok(summary) => match summary.status {
                DocumentStatus::Written(count) => {
                    tracing::info!("{}: {} records -> {}", path.display(), count, summary.table.display());
                    success_count += 1;
                }
                DocumentStatus::Empty => {
                    tracing::info!("{}: header-only table -> {}", path.display(), summary.table.display());
                    empty_count += 1;
                }
            },
            Err(e) => {
                tracing::error!("Failed to process {}: {}", path.display(), e);
                failure_count += 1;
            }
        }
    }

    tracing::info!(
        "Processing finished. Success: {}, Empty: {}, Failures: {}",
        success_count,
        empty_count,
        failure_count
    );

    if success_count == 0 && empty_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to process any of {} documents",
            failure_count
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["boe_listings"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_defaults() {
        let args = args(&["listado.pdf"]);
        assert_eq!(args.kind, DocumentKind::Destinations);
        assert_eq!(args.output_dir, "./output");
        assert_eq!(args.min_fragments, 4);
        assert!(!args.split_words && !args.bom && !args.decimal_point);
        assert!(Args::try_parse_from(["boe_listings"]).is_err());
    }

    #[test]
    fn profile_follows_flags() {
        let profile = build_profile(&args(&[
            "--kind",
            "destinations",
            "--split-words",
            "--min-fragments",
            "5",
            "--decimal-point",
            "a.pdf",
        ]))
        .unwrap();
        assert_eq!(profile.token_mode, TokenMode::Words);
        assert_eq!(profile.min_fragments, 5);
        assert!(profile.decimal_point);

        let err = build_profile(&args(&["--min-fragments", "1", "a.pdf"])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn documents_are_processed_independently() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("listado.txt");
        std::fs::write(
            &listing,
            "MINISTERIO DE EJEMPLO\nSUBSECRETARIA\nMADRID\nMADRID, MADRID\nAUXILIAR\n1234567\n589,76\n",
        )
        .unwrap();
        let empty = dir.path().join("vacio.txt");
        std::fs::write(&empty, "\n\n").unwrap();
        let unsupported = dir.path().join("informe.docx");
        std::fs::write(&unsupported, b"PK\x03\x04").unwrap();

        let out_dir = dir.path().join("out");
        let storage = Arc::new(StorageManager::new(&out_dir, false).unwrap());
        let profile = Arc::new(Profile::for_kind(DocumentKind::Destinations));

        let results = tokio_test::block_on(run_documents(
            vec![listing.clone(), empty.clone(), unsupported.clone()],
            profile,
            storage,
            false,
        ));
        assert_eq!(results.len(), 3);

        let written = results[0].1.as_ref().unwrap();
        assert_eq!(written.status, DocumentStatus::Written(1));
        let csv = std::fs::read_to_string(&written.table).unwrap();
        assert_eq!(
            csv.lines().nth(1),
            Some("MINISTERIO DE EJEMPLO;SUBSECRETARIA;;MADRID;MADRID, MADRID;AUXILIAR;1234567;589,76")
        );
        assert!(out_dir.join("listado.meta.json").exists());

        let header_only = results[1].1.as_ref().unwrap();
        assert_eq!(header_only.status, DocumentStatus::Empty);
        assert_eq!(std::fs::read_to_string(&header_only.table).unwrap().lines().count(), 1);

        assert!(matches!(results[2].1, Err(AppError::Extraction(_))));
        assert!(!out_dir.join("informe.csv").exists());
    }

    #[test]
    fn debug_mode_writes_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("puntuaciones.txt");
        std::fs::write(&input, "GARCIA LOPEZ, JUAN ***12345678** 7,50\n").unwrap();
        let storage = StorageManager::new(dir.path().join("out"), false).unwrap();

        let summary =
            process_document(&input, "puntuaciones", &Profile::for_kind(DocumentKind::Scores), &storage, true).unwrap();
        assert_eq!(summary.status, DocumentStatus::Written(1));

        let debug_dir = dir.path().join("out").join("puntuaciones_debug");
        assert!(debug_dir.join("raw_text.txt").exists());
        let classification = std::fs::read_to_string(debug_dir.join("classification.txt")).unwrap();
        assert!(classification.contains("RECORD_LINE"));
    }

    #[test]
    fn inputs_sharing_a_stem_keep_separate_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        let first = dir.path().join("a").join("listado.txt");
        let second = dir.path().join("b").join("listado.txt");
        std::fs::write(&first, "GARCIA LOPEZ, JUAN ***12345678** 7,50\n").unwrap();
        std::fs::write(&second, "PEREZ RUIZ, ANA ***87654321** 9,20\n").unwrap();

        let out_dir = dir.path().join("out");
        let storage = Arc::new(StorageManager::new(&out_dir, false).unwrap());
        let profile = Arc::new(Profile::for_kind(DocumentKind::Scores));
        let results = tokio_test::block_on(run_documents(vec![first, second], profile, storage, false));

        let tables: Vec<PathBuf> = results
            .iter()
            .map(|(_, result)| result.as_ref().unwrap().table.clone())
            .collect();
        assert_eq!(tables[0], out_dir.join("listado.csv"));
        assert_eq!(tables[1], out_dir.join("listado_2.csv"));
        assert!(std::fs::read_to_string(&tables[0]).unwrap().contains("GARCIA"));
        assert!(std::fs::read_to_string(&tables[1]).unwrap().contains("PEREZ"));
        assert!(out_dir.join("listado_2.meta.json").exists());
    }
}
