//! Chromium-family extractors.
//!
//! Chromium stores timestamps as microseconds since 1601-01-01 (Windows
//! filetime epoch). The autofill table of `Web Data` is the exception and
//! uses Unix seconds.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::artefact::{Artefact, ArtefactType, Browser, TimestampKind, non_empty};
use crate::discovery::ProfilePaths;
use crate::extract::{
    ExtractError, Extractor, JsonExtractor, RowExtractor, extract_json, extract_query,
    extract_sqlite, read_json, sorted_subdirs, source_label,
};
use crate::store::{Row, SqliteStore};
use crate::timestamp::{self, EpochKind, TimeUnit, normalize_opt};

pub fn extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(History),
        Box::new(Downloads),
        Box::new(Bookmarks),
        Box::new(Cookies),
        Box::new(FormHistory),
        Box::new(Logins),
        Box::new(Extensions),
        Box::new(Favicons),
        Box::new(Cache),
    ]
}

fn filetime(raw: Option<i64>) -> Option<i64> {
    normalize_opt(raw, EpochKind::WindowsFiletime, TimeUnit::Microseconds)
}

pub fn transition_label(transition: i64) -> &'static str {
    match transition & 0xFF {
        0 => "link",
        1 => "typed",
        2 => "auto_bookmark",
        3 => "auto_subframe",
        4 => "manual_subframe",
        5 => "generated",
        6 => "auto_toplevel",
        7 => "form_submit",
        8 => "reload",
        9 => "keyword",
        10 => "keyword_generated",
        _ => "other",
    }
}

pub struct History;

impl History {
    const WITHOUT_OPENER: &'static str = "SELECT visits.visit_time AS visit_time, \
         visits.visit_duration AS visit_duration, visits.transition AS transition, \
         urls.url AS url, urls.title AS title, urls.visit_count AS visit_count, \
         urls.typed_count AS typed_count, referrer_url.url AS referrer \
         FROM visits \
         LEFT JOIN urls ON urls.id = visits.url \
         LEFT JOIN visits AS referrer_visit ON referrer_visit.id = visits.from_visit \
         LEFT JOIN urls AS referrer_url ON referrer_url.id = referrer_visit.url \
         ORDER BY visits.id";
}

impl Extractor for History {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "history"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        let store = SqliteStore::open(&profile.data_dir.join("History"))?;
        // opener_visit is absent from older History databases
        if store.has_column("visits", "opener_visit")? {
            extract_query(self, &store, self.query())
        } else {
            extract_query(self, &store, Self::WITHOUT_OPENER)
        }
    }
}

impl RowExtractor for History {
    fn query(&self) -> &'static str {
        "SELECT visits.visit_time AS visit_time, visits.visit_duration AS visit_duration, \
         visits.transition AS transition, urls.url AS url, urls.title AS title, \
         urls.visit_count AS visit_count, urls.typed_count AS typed_count, \
         referrer_url.url AS referrer \
         FROM visits \
         LEFT JOIN urls ON urls.id = visits.url \
         LEFT JOIN visits AS referrer_visit \
           ON referrer_visit.id = COALESCE(NULLIF(visits.opener_visit, 0), visits.from_visit) \
         LEFT JOIN urls AS referrer_url ON referrer_url.id = referrer_visit.url \
         ORDER BY visits.id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let visited = filetime(row.opt_int("visit_time")?);

        let mut payload = Artefact::new(ArtefactType::History);
        payload.url = row.opt_text("url")?;
        payload.title = non_empty(row.opt_text("title")?);
        payload.http_referrer = non_empty(row.opt_text("referrer")?);
        payload.visit_count = row.opt_int("visit_count")?;
        payload.typed = row.opt_int("typed_count")?;
        payload.duration = row.opt_int("visit_duration")?;
        payload.action = row
            .opt_int("transition")?
            .map(|t| transition_label(t).to_string());

        Ok(payload.fan_out([(TimestampKind::VisitDate, visited)]))
    }
}

pub struct Downloads;

impl Extractor for Downloads {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "downloads"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("History"))
    }
}

impl RowExtractor for Downloads {
    fn query(&self) -> &'static str {
        "SELECT start_time, end_time, target_path, received_bytes, total_bytes, \
         tab_url, tab_referrer_url, mime_type \
         FROM downloads ORDER BY id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let started = filetime(row.opt_int("start_time")?);
        let ended = filetime(row.opt_int("end_time")?);
        let received = row.opt_int("received_bytes")?;
        let total = row.opt_int("total_bytes")?;

        let mut payload = Artefact::new(ArtefactType::Download);
        payload.url = non_empty(row.opt_text("tab_url")?);
        payload.http_referrer = non_empty(row.opt_text("tab_referrer_url")?);
        payload.filename = non_empty(row.opt_text("target_path")?);
        payload.http_content_type = non_empty(row.opt_text("mime_type")?);
        payload.bytes_in = received;
        payload.bytes_out = total.zip(received).map(|(t, r)| t - r);
        payload.duration = started.zip(ended).map(|(s, e)| e - s);

        Ok(payload.fan_out([(TimestampKind::DateAdded, started)]))
    }
}

#[derive(Debug, Deserialize)]
pub struct BookmarkFile {
    #[serde(default)]
    roots: BookmarkRoots,
}

#[derive(Debug, Default, Deserialize)]
struct BookmarkRoots {
    bookmark_bar: Option<BookmarkNode>,
    other: Option<BookmarkNode>,
    synced: Option<BookmarkNode>,
}

#[derive(Debug, Deserialize)]
struct BookmarkNode {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    url: Option<String>,
    date_added: Option<String>,
    date_last_used: Option<String>,
    #[serde(default)]
    children: Vec<BookmarkNode>,
}

fn filetime_str(raw: Option<&str>) -> Option<i64> {
    filetime(raw.and_then(|v| v.parse::<i64>().ok()))
}

fn walk_bookmarks(node: &BookmarkNode, folder: &str, out: &mut Vec<Artefact>) {
    if node.kind == "url" {
        let mut payload = Artefact::new(ArtefactType::Bookmark);
        payload.url = node.url.clone();
        payload.bookmark_title = non_empty(Some(node.name.clone()));
        payload.metadata = non_empty(Some(folder.to_string()));
        out.extend(payload.fan_out([
            (TimestampKind::DateAdded, filetime_str(node.date_added.as_deref())),
            (
                TimestampKind::DateLastUsed,
                filetime_str(node.date_last_used.as_deref()),
            ),
        ]));
        return;
    }

    let path = if folder.is_empty() {
        node.name.clone()
    } else {
        format!("{folder}/{}", node.name)
    };
    for child in &node.children {
        walk_bookmarks(child, &path, out);
    }
}

pub struct Bookmarks;

impl Extractor for Bookmarks {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "bookmarks"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_json(self, &profile.data_dir.join("Bookmarks"))
    }
}

impl JsonExtractor for Bookmarks {
    type Document = BookmarkFile;

    fn map_document(&self, doc: BookmarkFile) -> Vec<Artefact> {
        let mut out = Vec::new();
        let roots = [doc.roots.bookmark_bar, doc.roots.other, doc.roots.synced];
        for root in roots.iter().flatten() {
            walk_bookmarks(root, "", &mut out);
        }
        out
    }
}

pub struct Cookies;

impl Extractor for Cookies {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "cookies"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        let current = profile.data_dir.join("Network").join("Cookies");
        if current.is_file() {
            return extract_sqlite(self, &current);
        }
        extract_sqlite(self, &profile.data_dir.join("Cookies"))
    }
}

impl RowExtractor for Cookies {
    fn query(&self) -> &'static str {
        "SELECT creation_utc, last_access_utc, last_update_utc, host_key, source_port, name, value \
         FROM cookies"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let host = row.opt_text("host_key")?;
        let name = row.opt_text("name")?.unwrap_or_default();
        let value = row.opt_text("value")?.unwrap_or_default();

        let mut payload = Artefact::new(ArtefactType::Cookie);
        payload.url_domain = host.as_deref().map(|h| h.trim_start_matches('.').to_string());
        payload.url = host;
        payload.cookie = Some(format!("{name}={value}"));
        payload.dest_port = row.opt_int("source_port")?;

        Ok(payload.fan_out([
            (TimestampKind::CreationTime, filetime(row.opt_int("creation_utc")?)),
            (TimestampKind::LastAccessed, filetime(row.opt_int("last_access_utc")?)),
            (TimestampKind::LastUpdate, filetime(row.opt_int("last_update_utc")?)),
        ]))
    }
}

/// Autofill entries from `Web Data`.
pub struct FormHistory;

impl Extractor for FormHistory {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "formhistory"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("Web Data"))
    }
}

impl RowExtractor for FormHistory {
    fn query(&self) -> &'static str {
        "SELECT name, value, date_created, date_last_used, count FROM autofill"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let seconds = |raw| normalize_opt(raw, EpochKind::Unix, TimeUnit::Seconds);

        let mut payload = Artefact::new(ArtefactType::FormHistory);
        payload.fieldname = row.opt_text("name")?;
        payload.value = row.opt_text("value")?;
        payload.visit_count = row.opt_int("count")?;

        Ok(payload.fan_out([
            (TimestampKind::FirstUsed, seconds(row.opt_int("date_created")?)),
            (TimestampKind::LastUsed, seconds(row.opt_int("date_last_used")?)),
        ]))
    }
}

pub struct Logins;

impl Extractor for Logins {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "logins"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("Login Data"))
    }
}

impl RowExtractor for Logins {
    fn query(&self) -> &'static str {
        "SELECT origin_url, username_value, date_created, date_last_used, \
         date_password_modified, times_used FROM logins"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let mut payload = Artefact::new(ArtefactType::Login);
        payload.url = row.opt_text("origin_url")?;
        payload.fieldname = Some("username".to_string());
        payload.value = row.opt_text("username_value")?;
        payload.visit_count = row.opt_int("times_used")?;

        Ok(payload.fan_out([
            (TimestampKind::DateCreated, filetime(row.opt_int("date_created")?)),
            (TimestampKind::LastUsed, filetime(row.opt_int("date_last_used")?)),
            (
                TimestampKind::PasswordChanged,
                filetime(row.opt_int("date_password_modified")?),
            ),
        ]))
    }
}

#[derive(Debug, Deserialize)]
struct ExtensionManifest {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<serde_json::Value>,
    update_url: Option<String>,
    homepage_url: Option<String>,
}

impl ExtensionManifest {
    fn author(&self) -> Option<String> {
        match self.author.as_ref()? {
            serde_json::Value::String(name) => Some(name.clone()),
            serde_json::Value::Object(map) => map
                .get("email")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}

fn modified_micros(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(timestamp::from_datetime(&DateTime::<Utc>::from(modified)))
}

/// Installed extensions, one record per `Extensions/<id>/<version>/manifest.json`.
pub struct Extensions;

impl Extensions {
    fn map_manifest(&self, id: &str, path: &Path, manifest: ExtensionManifest) -> Artefact {
        let mut payload = Artefact::new(ArtefactType::Extension);
        payload.url = Some(format!("chrome-extension://{id}/"));
        payload.creator_name = manifest.author();
        payload.addon_name = manifest.name;
        payload.version = manifest.version;
        payload.description = manifest.description;
        payload.source_uri = manifest.update_url;
        payload.home_page_url = manifest.homepage_url;

        match modified_micros(path) {
            Some(ts) => payload.at(TimestampKind::ManifestModified, ts),
            None => payload.at(TimestampKind::Now, timestamp::from_datetime(&Utc::now())),
        }
    }
}

impl Extractor for Extensions {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "extensions"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        let root = profile.data_dir.join("Extensions");
        if !root.is_dir() {
            return Err(ExtractError::NotFound(root));
        }

        let mut out = Vec::new();
        for ext_dir in sorted_subdirs(&root)? {
            let id = ext_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for version_dir in sorted_subdirs(&ext_dir)? {
                let manifest_path = version_dir.join("manifest.json");
                if !manifest_path.is_file() {
                    continue;
                }
                match read_json::<ExtensionManifest>(&manifest_path) {
                    Ok(manifest) => out.push(self.map_manifest(&id, &manifest_path, manifest)),
                    Err(err) => warn!(
                        source = %source_label(self),
                        "skipping manifest {}: {err}",
                        manifest_path.display()
                    ),
                }
            }
        }
        Ok(out)
    }
}

pub struct Favicons;

impl Extractor for Favicons {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "favicons"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("Favicons"))
    }
}

impl RowExtractor for Favicons {
    fn query(&self) -> &'static str {
        "SELECT favicons.url AS icon_url, icon_mapping.page_url AS page_url, \
         favicon_bitmaps.last_updated AS last_updated, \
         favicon_bitmaps.last_requested AS last_requested \
         FROM favicons \
         LEFT JOIN favicon_bitmaps ON favicon_bitmaps.icon_id = favicons.id \
         LEFT JOIN icon_mapping ON icon_mapping.icon_id = favicons.id \
         ORDER BY favicons.id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let mut payload = Artefact::new(ArtefactType::Favicon);
        payload.url = row.opt_text("icon_url")?;
        payload.http_referrer = non_empty(row.opt_text("page_url")?);

        let records = payload.fan_out([
            (TimestampKind::LastUpdated, filetime(row.opt_int("last_updated")?)),
            (TimestampKind::LastRequested, filetime(row.opt_int("last_requested")?)),
        ]);
        if records.is_empty() {
            // usually only one of the two is set, sometimes neither
            return Ok(vec![payload.at(TimestampKind::Unknown, timestamp::UNKNOWN)]);
        }
        Ok(records)
    }
}

/// Chromium disk cache. The block-file format is not decoded yet.
pub struct Cache;

impl Extractor for Cache {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn name(&self) -> &'static str {
        "cache"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        debug!(
            source = %source_label(self),
            "cache decoding not implemented, skipping {}",
            profile.cache_dir.join("Cache").display()
        );
        Ok(Vec::new())
    }
}
