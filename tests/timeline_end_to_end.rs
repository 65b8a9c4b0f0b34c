mod common;

use std::fs;

use browser_artefacts::config;
use browser_artefacts::export::ExportFormat;
use browser_artefacts::util;

use common::*;

#[test]
fn chrome_history_filtered_to_range_and_exported_as_csv() {
    let root = tempfile::tempdir().expect("tempdir");
    write_chrome_history(
        &chrome_profile_dir(root.path(), "alice"),
        &[
            ("https://old.example/", "Old", FILETIME_2021_01_01),
            ("https://mid.example/", "Mid", FILETIME_2022_06_15),
            ("https://new.example/", "New", FILETIME_2023_12_31),
        ],
    );

    let mut loaded = config::load_config(None).expect("config");
    loaded.config.run_id = "e2e".to_string();
    loaded.config.start_date = "2022-01-01".to_string();
    loaded.config.end_date = "2023-01-01".to_string();
    loaded.config.output_format = ExportFormat::Csv;
    loaded.config.file_base_name = "timeline".to_string();

    let out_dir = root.path().join("out");
    let summary = util::run(&loaded, root.path(), None, &out_dir).expect("run");

    assert_eq!(summary.output_path, out_dir.join("timeline.csv"));
    assert_eq!(summary.stats.profiles, 1);
    assert_eq!(summary.stats.records_collected, 3);
    assert_eq!(summary.stats.records_kept, 1);

    let mut reader = csv::Reader::from_path(&summary.output_path).expect("reader");
    let headers = reader.headers().expect("headers").clone();
    let col = |name: &str| headers.iter().position(|h| h == name).expect("column");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][col("timestamp")], UNIX_US_2022_06_15.to_string());
    assert_eq!(&rows[0][col("timestamp_type")], "visit_date");
    assert_eq!(&rows[0][col("url")], "https://mid.example/");
    assert_eq!(&rows[0][col("user")], "alice");
    assert_eq!(&rows[0][col("artifact_type")], "history");

    let raw = fs::read_to_string(&summary.output_path).expect("read");
    assert_eq!(raw.lines().count(), 2);
}

#[test]
fn output_is_sorted_across_browsers_and_users() {
    let root = tempfile::tempdir().expect("tempdir");
    write_chrome_history(
        &chrome_profile_dir(root.path(), "alice"),
        &[
            ("https://c-late.example/", "late", FILETIME_2023_12_31),
            ("https://c-early.example/", "early", FILETIME_2021_01_01),
        ],
    );
    write_firefox_places(
        &firefox_profile_dir(root.path(), "bob"),
        &[("https://f-mid.example/", "mid", UNIX_US_2022_06_15)],
    );

    let mut loaded = config::load_config(None).expect("config");
    loaded.config.output_format = ExportFormat::JsonLines;
    loaded.config.start_date = "2000-01-01".to_string();
    loaded.config.end_date = "now".to_string();

    let out_dir = root.path().join("out");
    let summary = util::run(&loaded, root.path(), None, &out_dir).expect("run");
    assert_eq!(summary.stats.profiles, 2);

    let text = fs::read_to_string(&summary.output_path).expect("read");
    let urls: Vec<String> = text
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json");
            value["url"].as_str().expect("url").to_string()
        })
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://c-early.example/",
            "https://f-mid.example/",
            "https://c-late.example/"
        ]
    );
}

#[test]
fn profile_filter_limits_users() {
    let root = tempfile::tempdir().expect("tempdir");
    write_chrome_history(
        &chrome_profile_dir(root.path(), "alice"),
        &[("https://a.example/", "a", FILETIME_2022_06_15)],
    );
    write_chrome_history(
        &chrome_profile_dir(root.path(), "carol"),
        &[("https://c.example/", "c", FILETIME_2022_06_15)],
    );

    let loaded = config::load_config(None).expect("config");
    let out_dir = root.path().join("out");
    let summary = util::run(&loaded, root.path(), Some("carol"), &out_dir).expect("run");
    assert_eq!(summary.stats.profiles, 1);

    let text = fs::read_to_string(&summary.output_path).expect("read");
    let records: Vec<serde_json::Value> = serde_json::from_str(&text).expect("json");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["user"], "carol");
}

#[test]
fn empty_root_writes_empty_export() {
    let root = tempfile::tempdir().expect("tempdir");
    let loaded = config::load_config(None).expect("config");
    let out_dir = root.path().join("out");
    let summary = util::run(&loaded, root.path(), None, &out_dir).expect("run");
    assert_eq!(summary.stats.records_kept, 0);
    assert_eq!(fs::read_to_string(&summary.output_path).expect("read"), "[]");
}
