mod common;

use browser_artefacts::artefact::{ArtefactType, TimestampKind};
use browser_artefacts::extract::{chrome, firefox, run_extractor};

use common::*;

const LOGIN_KINDS: [TimestampKind; 3] = [
    TimestampKind::DateCreated,
    TimestampKind::LastUsed,
    TimestampKind::PasswordChanged,
];

#[test]
fn chrome_login_yields_one_record_per_timestamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_chrome_logins(
        dir.path(),
        FILETIME_2021_01_01,
        FILETIME_2022_06_15,
        FILETIME_2023_12_31,
    );

    let records = run_extractor(&chrome::Logins, &profile(dir.path()));
    assert_eq!(records.len(), 3);
    let kinds: Vec<_> = records.iter().map(|r| r.timestamp_type).collect();
    assert_eq!(kinds, LOGIN_KINDS);
    assert_eq!(records[1].timestamp, UNIX_US_2022_06_15);
    for record in &records {
        assert_eq!(record.artifact_type, ArtefactType::Login);
        assert_eq!(record.url.as_deref(), Some("https://login.example/"));
        assert_eq!(record.fieldname.as_deref(), Some("username"));
        assert_eq!(record.value.as_deref(), Some("alice"));
        assert_eq!(record.visit_count, Some(4));
    }
}

#[test]
fn chrome_login_drops_unknown_timestamps() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_chrome_logins(dir.path(), FILETIME_2022_06_15, 0, 0);

    let records = run_extractor(&chrome::Logins, &profile(dir.path()));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].timestamp_type, TimestampKind::DateCreated);
}

#[test]
fn firefox_login_yields_one_record_per_timestamp() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_firefox_logins(
        dir.path(),
        UNIX_MS_2022_06_15,
        UNIX_MS_2022_06_15 + 1_000,
        UNIX_MS_2022_06_15 + 2_000,
    );

    let records = run_extractor(&firefox::Logins, &profile(dir.path()));
    assert_eq!(records.len(), 3);
    let kinds: Vec<_> = records.iter().map(|r| r.timestamp_type).collect();
    assert_eq!(kinds, LOGIN_KINDS);
    let stamps: Vec<_> = records.iter().map(|r| r.timestamp).collect();
    assert_eq!(
        stamps,
        vec![
            UNIX_US_2022_06_15,
            UNIX_US_2022_06_15 + 1_000_000,
            UNIX_US_2022_06_15 + 2_000_000
        ]
    );
    for record in &records {
        assert_eq!(record.url.as_deref(), Some("https://login.example"));
        assert_eq!(record.fieldname.as_deref(), Some("email"));
        assert!(record.value.is_none());
        assert_eq!(record.visit_count, Some(2));
    }
}
