//! Shared fixtures for integration tests.
//!
//! Builds small but real browser stores (SQLite databases, JSON documents)
//! inside a temporary filesystem root laid out like a host disk.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

use browser_artefacts::discovery::ProfilePaths;

/// 2021-01-01T00:00:00Z as a Windows filetime in microseconds.
pub const FILETIME_2021_01_01: i64 = 13_253_932_800_000_000;
/// 2022-06-15T00:00:00Z as a Windows filetime in microseconds.
pub const FILETIME_2022_06_15: i64 = 13_299_724_800_000_000;
/// 2023-12-31T00:00:00Z as a Windows filetime in microseconds.
pub const FILETIME_2023_12_31: i64 = 13_348_454_400_000_000;

/// 2022-06-15T00:00:00Z in Unix microseconds.
pub const UNIX_US_2022_06_15: i64 = 1_655_251_200_000_000;
pub const UNIX_MS_2022_06_15: i64 = UNIX_US_2022_06_15 / 1000;

// ============================================================================
// Filesystem Layout
// ============================================================================

pub fn chrome_profile_dir(root: &Path, user: &str) -> PathBuf {
    root.join("home")
        .join(user)
        .join(".config/google-chrome/Default")
}

pub fn firefox_profile_dir(root: &Path, user: &str) -> PathBuf {
    root.join("home")
        .join(user)
        .join(".mozilla/firefox/abcd1234.default-release")
}

pub fn mkdir(path: &Path) {
    fs::create_dir_all(path).expect("mkdir");
}

pub fn profile(dir: &Path) -> ProfilePaths {
    ProfilePaths::new(dir.to_path_buf())
}

// ============================================================================
// Chrome Stores
// ============================================================================

/// A `History` database with one visit per entry of `visits`
/// (url, title, filetime visit time).
pub fn write_chrome_history(profile_dir: &Path, visits: &[(&str, &str, i64)]) {
    mkdir(profile_dir);
    let conn = Connection::open(profile_dir.join("History")).expect("open history");
    conn.execute_batch(
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT, title TEXT, visit_count INTEGER, typed_count INTEGER);
         CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER, visit_time INTEGER, from_visit INTEGER, transition INTEGER, visit_duration INTEGER);
         CREATE TABLE downloads (id INTEGER PRIMARY KEY, start_time INTEGER, end_time INTEGER, target_path TEXT, received_bytes INTEGER, total_bytes INTEGER, tab_url TEXT, tab_referrer_url TEXT, mime_type TEXT);",
    )
    .expect("schema");
    for (idx, (url, title, visit_time)) in visits.iter().enumerate() {
        let id = idx as i64 + 1;
        conn.execute(
            "INSERT INTO urls (id, url, title, visit_count, typed_count) VALUES (?1, ?2, ?3, 1, 0)",
            params![id, url, title],
        )
        .expect("insert url");
        conn.execute(
            "INSERT INTO visits (id, url, visit_time, from_visit, transition, visit_duration) VALUES (?1, ?1, ?2, 0, 1, 0)",
            params![id, visit_time],
        )
        .expect("insert visit");
    }
}

pub fn write_chrome_logins(profile_dir: &Path, created: i64, last_used: i64, changed: i64) {
    mkdir(profile_dir);
    let conn = Connection::open(profile_dir.join("Login Data")).expect("open logins");
    conn.execute(
        "CREATE TABLE logins (origin_url TEXT, username_value TEXT, date_created INTEGER, date_last_used INTEGER, date_password_modified INTEGER, times_used INTEGER)",
        [],
    )
    .expect("schema");
    conn.execute(
        "INSERT INTO logins VALUES ('https://login.example/', 'alice', ?1, ?2, ?3, 4)",
        params![created, last_used, changed],
    )
    .expect("insert login");
}

// ============================================================================
// Firefox Stores
// ============================================================================

/// A `places.sqlite` with one visit per entry of `visits`
/// (url, title, PRTime visit date).
pub fn write_firefox_places(profile_dir: &Path, visits: &[(&str, &str, i64)]) {
    mkdir(profile_dir);
    let conn = Connection::open(profile_dir.join("places.sqlite")).expect("open places");
    conn.execute_batch(
        "CREATE TABLE moz_places (id INTEGER PRIMARY KEY, url TEXT, title TEXT, visit_count INTEGER, typed INTEGER);
         CREATE TABLE moz_historyvisits (id INTEGER PRIMARY KEY, place_id INTEGER, visit_date INTEGER, visit_type INTEGER, from_visit INTEGER);",
    )
    .expect("schema");
    for (idx, (url, title, visit_date)) in visits.iter().enumerate() {
        let id = idx as i64 + 1;
        conn.execute(
            "INSERT INTO moz_places (id, url, title, visit_count, typed) VALUES (?1, ?2, ?3, 1, 0)",
            params![id, url, title],
        )
        .expect("insert place");
        conn.execute(
            "INSERT INTO moz_historyvisits (id, place_id, visit_date, visit_type, from_visit) VALUES (?1, ?1, ?2, 1, 0)",
            params![id, visit_date],
        )
        .expect("insert visit");
    }
}

/// A `logins.json` with one login whose three timestamps are in ms.
pub fn write_firefox_logins(profile_dir: &Path, created: i64, last_used: i64, changed: i64) {
    mkdir(profile_dir);
    let doc = serde_json::json!({
        "nextId": 2,
        "logins": [{
            "id": 1,
            "hostname": "https://login.example",
            "usernameField": "email",
            "passwordField": "password",
            "encryptedUsername": "MDIEEPgAAAAAAAAAAAAAAAAAAAEwFAYIKoZIhvcNAwcECA==",
            "encryptedPassword": "MDIEEPgAAAAAAAAAAAAAAAAAAAEwFAYIKoZIhvcNAwcECB==",
            "timeCreated": created,
            "timeLastUsed": last_used,
            "timePasswordChanged": changed,
            "timesUsed": 2
        }],
        "version": 3
    });
    fs::write(
        profile_dir.join("logins.json"),
        serde_json::to_vec_pretty(&doc).expect("json"),
    )
    .expect("write logins");
}
