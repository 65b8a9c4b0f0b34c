mod common;

use std::fs;

use browser_artefacts::artefact::{Artefact, Browser};
use browser_artefacts::discovery;
use browser_artefacts::export::{self, ExportFormat, csv::CSV_HEADER};
use browser_artefacts::pipeline::{self, PipelineOptions, TimeRange};

use common::*;

fn timeline(root: &std::path::Path) -> Vec<Artefact> {
    write_chrome_history(
        &chrome_profile_dir(root, "alice"),
        &[
            ("https://a.example/", "A, with comma", FILETIME_2021_01_01),
            ("https://b.example/", "B \"quoted\"", FILETIME_2022_06_15),
        ],
    );
    write_firefox_logins(
        &firefox_profile_dir(root, "alice"),
        UNIX_MS_2022_06_15,
        UNIX_MS_2022_06_15,
        0,
    );
    let targets = discovery::discover(root, &Browser::all(), None);
    let opts = PipelineOptions {
        range: TimeRange::unbounded(),
        workers: 1,
        timestamp_diagnostics: false,
    };
    pipeline::run_pipeline(&targets, &opts).0
}

#[test]
fn json_and_json_lines_round_trip_the_same_records() {
    let root = tempfile::tempdir().expect("tempdir");
    let records = timeline(root.path());
    assert_eq!(records.len(), 4);

    let out = root.path().join("out");
    fs::create_dir_all(&out).expect("mkdir");

    let json_path = export::output_path(&out, "t", ExportFormat::Json);
    export::export_records(ExportFormat::Json, &json_path, &records).expect("json");
    let from_json: Vec<Artefact> =
        serde_json::from_str(&fs::read_to_string(&json_path).expect("read")).expect("parse");

    let jsonl_path = export::output_path(&out, "t", ExportFormat::JsonLines);
    export::export_records(ExportFormat::JsonLines, &jsonl_path, &records).expect("jsonl");
    let from_jsonl: Vec<Artefact> = fs::read_to_string(&jsonl_path)
        .expect("read")
        .lines()
        .map(|line| serde_json::from_str(line).expect("parse"))
        .collect();

    assert_eq!(from_json, records);
    assert_eq!(from_jsonl, records);
}

#[test]
fn absent_fields_are_omitted_from_json() {
    let root = tempfile::tempdir().expect("tempdir");
    let records = timeline(root.path());
    let value = serde_json::to_value(&records[0]).expect("json");
    let object = value.as_object().expect("object");
    assert!(object.contains_key("timestamp"));
    assert!(object.contains_key("timestamp_type"));
    assert!(!object.contains_key("addon_name"));
    assert!(!object.contains_key("cookie"));
}

#[test]
fn csv_keeps_header_and_quotes_text() {
    let root = tempfile::tempdir().expect("tempdir");
    let records = timeline(root.path());
    let path = root.path().join("t.csv");
    export::export_records(ExportFormat::Csv, &path, &records).expect("csv");

    let mut reader = csv::Reader::from_path(&path).expect("reader");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());
    let title = headers.iter().position(|h| h == "title").expect("title");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), records.len());
    assert_eq!(&rows[0][title], "A, with comma");
}
