use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use epirank::{loader, Measure, RankedCollection};
use parquet::arrow::ArrowWriter;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

#[test]
fn csv_load_collapses_duplicates_and_sorts_by_rank() {
    init_logging();
    // The fixture has 4 rows, one an exact duplicate.
    let coll = loader::load_file(&fixture("predictions.csv")).unwrap();

    assert_eq!(coll.len(), 3);
    assert_eq!(coll[0].peptide, "SIINFEKL");
    assert_eq!(coll[0].allele, "H-2-Kb");
    assert_eq!(coll[0].measure, Measure::Affinity);
    assert_abs_diff_eq!(coll[0].value, 12.5);
    assert_abs_diff_eq!(coll[0].percentile_rank, 0.12);
    assert_eq!(coll[2].peptide, "SIINFEKLL"); // weakest rank last
}

#[test]
fn json_and_csv_fixtures_agree() {
    init_logging();
    let from_csv = loader::load_file(&fixture("predictions.csv")).unwrap();
    let from_json = loader::load_file(&fixture("predictions.json")).unwrap();
    assert_eq!(from_csv, from_json);
}

#[test]
fn parquet_round_trips_through_dataframe_export() {
    init_logging();
    let coll = loader::load_file(&fixture("predictions.csv")).unwrap();
    let batch = coll.dataframe().unwrap();

    let path = std::env::temp_dir().join(format!("epirank-test-{}.parquet", std::process::id()));
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let reloaded = loader::load_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(reloaded, coll);
}

#[test]
fn unsupported_extension_is_rejected() {
    init_logging();
    let err = loader::load_file(Path::new("predictions.txt")).unwrap_err();
    assert!(err.to_string().contains("Unsupported file extension"));
}

#[test]
fn loaded_predictions_feed_the_query_surface() {
    init_logging();
    let coll = loader::load_file(&fixture("predictions.csv")).unwrap();

    // Both sub-500 nM affinities qualify under the default threshold.
    let strong = coll.strong_binders(None);
    assert_eq!(strong.len(), 2);

    let by_allele = coll.groupby_allele();
    assert_eq!(by_allele.len(), 2);
    assert_eq!(by_allele["H-2-Kb"].len(), 2);
}
