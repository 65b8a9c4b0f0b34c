//! Firefox-family extractors.
//!
//! `places.sqlite`, `cookies.sqlite` and `formhistory.sqlite` use PRTime
//! (microseconds since the Unix epoch). The JSON stores and `favicons.sqlite`
//! use milliseconds.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::artefact::{Artefact, ArtefactType, Browser, TimestampKind, non_empty};
use crate::discovery::ProfilePaths;
use crate::extract::{
    ExtractError, Extractor, JsonExtractor, RowExtractor, decode_entries, extract_json,
    extract_query, extract_sqlite, sorted_files, source_label,
};
use crate::parsers::{cache2, mozlz4};
use crate::store::{Row, SqliteStore};
use crate::timestamp::{self, EpochKind, TimeUnit, normalize_opt};

const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

pub fn extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(History),
        Box::new(Downloads),
        Box::new(Bookmarks),
        Box::new(FormHistory),
        Box::new(Cookies),
        Box::new(Cache),
        Box::new(Favicons),
        Box::new(Logins),
        Box::new(Addons),
        Box::new(Extensions),
        Box::new(BookmarkBackups),
    ]
}

fn prtime(raw: Option<i64>) -> Option<i64> {
    normalize_opt(raw, EpochKind::Unix, TimeUnit::Microseconds)
}

fn millis(raw: Option<i64>) -> Option<i64> {
    normalize_opt(raw, EpochKind::Unix, TimeUnit::Milliseconds)
}

pub fn visit_label(visit_type: i64) -> &'static str {
    match visit_type {
        1 => "link",
        2 => "typed",
        3 => "bookmark",
        4 => "embed",
        5 => "redirect_permanent",
        6 => "redirect_temporary",
        7 => "download",
        8 => "framed_link",
        9 => "reload",
        _ => "other",
    }
}

pub struct History;

impl Extractor for History {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "history"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("places.sqlite"))
    }
}

impl RowExtractor for History {
    fn query(&self) -> &'static str {
        "SELECT visit.visit_date AS visit_date, visit.visit_type AS visit_type, \
         place.url AS url, place.title AS title, place.visit_count AS visit_count, \
         place.typed AS typed, referrer.url AS referrer \
         FROM moz_historyvisits AS visit \
         JOIN moz_places AS place ON place.id = visit.place_id \
         LEFT JOIN moz_historyvisits AS referrer_visit ON referrer_visit.id = visit.from_visit \
         LEFT JOIN moz_places AS referrer ON referrer.id = referrer_visit.place_id \
         ORDER BY visit.id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let mut payload = Artefact::new(ArtefactType::History);
        payload.url = row.opt_text("url")?;
        payload.title = non_empty(row.opt_text("title")?);
        payload.http_referrer = non_empty(row.opt_text("referrer")?);
        payload.visit_count = row.opt_int("visit_count")?;
        payload.typed = row.opt_int("typed")?;
        payload.action = row
            .opt_int("visit_type")?
            .map(|t| visit_label(t).to_string());

        Ok(payload.fan_out([(TimestampKind::VisitDate, prtime(row.opt_int("visit_date")?))]))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadMetadata {
    file_size: Option<i64>,
}

/// Downloads recorded as page annotations in `places.sqlite`.
pub struct Downloads;

impl Extractor for Downloads {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "downloads"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("places.sqlite"))
    }
}

impl RowExtractor for Downloads {
    fn query(&self) -> &'static str {
        "SELECT dest.content AS file, meta.content AS metadata, \
         dest.dateAdded AS date_added, dest.lastModified AS last_modified, \
         place.url AS url, place.title AS title, place.visit_count AS visit_count \
         FROM moz_annos AS dest \
         JOIN moz_anno_attributes AS dest_attr \
           ON dest_attr.id = dest.anno_attribute_id \
          AND dest_attr.name = 'downloads/destinationFileURI' \
         LEFT JOIN moz_anno_attributes AS meta_attr ON meta_attr.name = 'downloads/metaData' \
         LEFT JOIN moz_annos AS meta \
           ON meta.place_id = dest.place_id AND meta.anno_attribute_id = meta_attr.id \
         LEFT JOIN moz_places AS place ON place.id = dest.place_id \
         ORDER BY dest.id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let metadata = non_empty(row.opt_text("metadata")?);

        let mut payload = Artefact::new(ArtefactType::Download);
        payload.url = row.opt_text("url")?;
        payload.title = non_empty(row.opt_text("title")?);
        payload.filename = non_empty(row.opt_text("file")?);
        payload.visit_count = row.opt_int("visit_count")?;
        payload.bytes_in = metadata
            .as_deref()
            .and_then(|m| serde_json::from_str::<DownloadMetadata>(m).ok())
            .and_then(|m| m.file_size);
        payload.metadata = metadata;

        Ok(payload.fan_out([
            (TimestampKind::DateAdded, prtime(row.opt_int("date_added")?)),
            (TimestampKind::LastModified, prtime(row.opt_int("last_modified")?)),
        ]))
    }
}

pub struct Bookmarks;

impl Extractor for Bookmarks {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "bookmarks"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("places.sqlite"))
    }
}

impl RowExtractor for Bookmarks {
    fn query(&self) -> &'static str {
        "SELECT bookmark.title AS bookmark_title, bookmark.dateAdded AS date_added, \
         bookmark.lastModified AS last_modified, place.url AS url, place.title AS title, \
         place.visit_count AS visit_count \
         FROM moz_bookmarks AS bookmark \
         LEFT JOIN moz_places AS place ON place.id = bookmark.fk \
         ORDER BY bookmark.id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let mut payload = Artefact::new(ArtefactType::Bookmark);
        payload.url = row.opt_text("url")?;
        payload.title = non_empty(row.opt_text("title")?);
        payload.bookmark_title = non_empty(row.opt_text("bookmark_title")?);
        payload.visit_count = row.opt_int("visit_count")?;

        Ok(payload.fan_out([
            (TimestampKind::DateAdded, prtime(row.opt_int("date_added")?)),
            (TimestampKind::LastModified, prtime(row.opt_int("last_modified")?)),
        ]))
    }
}

pub struct FormHistory;

impl FormHistory {
    const WITHOUT_SOURCES: &'static str = "SELECT fieldname, value, timesUsed AS times_used, \
         firstUsed AS first_used, lastUsed AS last_used, NULL AS source \
         FROM moz_formhistory ORDER BY id";
}

impl Extractor for FormHistory {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "formhistory"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        let store = SqliteStore::open(&profile.data_dir.join("formhistory.sqlite"))?;
        // moz_sources only exists since Firefox 113
        if store.has_table("moz_sources")? {
            extract_query(self, &store, self.query())
        } else {
            extract_query(self, &store, Self::WITHOUT_SOURCES)
        }
    }
}

impl RowExtractor for FormHistory {
    fn query(&self) -> &'static str {
        "SELECT entry.fieldname AS fieldname, entry.value AS value, \
         entry.timesUsed AS times_used, entry.firstUsed AS first_used, \
         entry.lastUsed AS last_used, source.source AS source \
         FROM moz_formhistory AS entry \
         LEFT JOIN moz_history_to_sources AS link ON link.history_id = entry.id \
         LEFT JOIN moz_sources AS source ON source.id = link.source_id \
         ORDER BY entry.id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let mut payload = Artefact::new(ArtefactType::FormHistory);
        payload.url = non_empty(row.opt_text("source")?);
        payload.fieldname = row.opt_text("fieldname")?;
        payload.value = row.opt_text("value")?;
        payload.visit_count = row.opt_int("times_used")?;

        Ok(payload.fan_out([
            (TimestampKind::FirstUsed, prtime(row.opt_int("first_used")?)),
            (TimestampKind::LastUsed, prtime(row.opt_int("last_used")?)),
        ]))
    }
}

pub struct Cookies;

impl Extractor for Cookies {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "cookies"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("cookies.sqlite"))
    }
}

impl RowExtractor for Cookies {
    fn query(&self) -> &'static str {
        "SELECT host, name, value, creationTime AS creation_time, \
         lastAccessed AS last_accessed FROM moz_cookies ORDER BY id"
    }

    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let host = row.opt_text("host")?;
        let name = row.opt_text("name")?.unwrap_or_default();
        let value = row.opt_text("value")?.unwrap_or_default();

        let mut payload = Artefact::new(ArtefactType::Cookie);
        payload.url_domain = host.as_deref().map(|h| h.trim_start_matches('.').to_string());
        payload.url = host;
        payload.cookie = Some(format!("{name}={value}"));

        Ok(payload.fan_out([
            (TimestampKind::CreationTime, prtime(row.opt_int("creation_time")?)),
            (TimestampKind::LastAccessed, prtime(row.opt_int("last_accessed")?)),
        ]))
    }
}

/// `cache2/entries`, one file per cached resource.
pub struct Cache;

impl Extractor for Cache {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "cache"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        let entries = profile.cache_dir.join("cache2").join("entries");
        if !entries.is_dir() {
            return Err(ExtractError::NotFound(entries));
        }

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for path in sorted_files(&entries)? {
            match cache2::parse_entry_file(&path) {
                Ok(meta) => out.extend(meta.to_artefacts()),
                Err(err) => {
                    skipped += 1;
                    warn!(source = %source_label(self), "skipping {}: {err}", path.display());
                }
            }
        }
        if skipped > 0 {
            warn!(
                source = %source_label(self),
                "skipped {skipped} cache entries in {}",
                entries.display()
            );
        }
        debug!(source = %source_label(self), "found {} cache records", out.len());
        Ok(out)
    }
}

pub struct Favicons;

impl Extractor for Favicons {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "favicons"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_sqlite(self, &profile.data_dir.join("favicons.sqlite"))
    }
}

impl RowExtractor for Favicons {
    fn query(&self) -> &'static str {
        "SELECT icon_url, expire_ms FROM moz_icons ORDER BY id"
    }

    /// Icons expire a week after they were fetched, so `expire_ms - 7 days`
    /// approximates the fetch time.
    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError> {
        let mut payload = Artefact::new(ArtefactType::Favicon);
        payload.url = row.opt_text("icon_url")?;

        let fetched = millis(
            row.opt_int("expire_ms")?
                .filter(|&ms| ms > 0)
                .map(|ms| ms - WEEK_MILLIS),
        );
        Ok(match fetched {
            Some(ts) => vec![payload.at(TimestampKind::ExpiresMinusWeek, ts)],
            None => vec![payload.at(TimestampKind::Unknown, timestamp::UNKNOWN)],
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginsFile {
    #[serde(default)]
    logins: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginEntry {
    hostname: Option<String>,
    username_field: Option<String>,
    time_created: Option<i64>,
    time_last_used: Option<i64>,
    time_password_changed: Option<i64>,
    times_used: Option<i64>,
}

/// `logins.json`. Usernames and passwords are encrypted and left out.
pub struct Logins;

impl Extractor for Logins {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "logins"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_json(self, &profile.data_dir.join("logins.json"))
    }
}

impl JsonExtractor for Logins {
    type Document = LoginsFile;

    fn map_document(&self, doc: LoginsFile) -> Vec<Artefact> {
        decode_entries::<_, LoginEntry>(self, doc.logins)
            .into_iter()
            .flat_map(|login| {
                let mut payload = Artefact::new(ArtefactType::Login);
                payload.url = login.hostname;
                payload.fieldname = non_empty(login.username_field);
                payload.visit_count = login.times_used;
                payload.fan_out([
                    (TimestampKind::DateCreated, millis(login.time_created)),
                    (TimestampKind::LastUsed, millis(login.time_last_used)),
                    (
                        TimestampKind::PasswordChanged,
                        millis(login.time_password_changed),
                    ),
                ])
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddonsFile {
    #[serde(default)]
    addons: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddonEntry {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    version: Option<String>,
    description: Option<String>,
    full_description: Option<String>,
    #[serde(rename = "sourceURI")]
    source_uri: Option<String>,
    #[serde(rename = "homepageURL")]
    homepage_url: Option<String>,
    #[serde(rename = "reviewURL")]
    review_url: Option<String>,
    #[serde(rename = "amoListingURL")]
    amo_listing_url: Option<String>,
    creator: Option<AddonCreator>,
    average_rating: Option<f64>,
    review_count: Option<i64>,
    update_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AddonCreator {
    name: Option<String>,
    url: Option<String>,
}

/// `addons.json`, the add-on repository cache.
pub struct Addons;

impl Extractor for Addons {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "addons"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_json(self, &profile.data_dir.join("addons.json"))
    }
}

impl JsonExtractor for Addons {
    type Document = AddonsFile;

    fn map_document(&self, doc: AddonsFile) -> Vec<Artefact> {
        decode_entries::<_, AddonEntry>(self, doc.addons)
            .into_iter()
            .flat_map(|addon| {
                let mut payload = Artefact::new(ArtefactType::Addon);
                payload.addon_name = addon.name;
                payload.addon_type = addon.kind;
                payload.version = addon.version;
                payload.description = non_empty(addon.description);
                payload.full_description = non_empty(addon.full_description);
                payload.source_uri = addon.source_uri;
                payload.home_page_url = non_empty(addon.homepage_url);
                payload.review_url = non_empty(addon.review_url).or(addon.amo_listing_url);
                if let Some(creator) = addon.creator {
                    payload.creator_name = creator.name;
                    payload.creator_url = creator.url;
                }
                payload.average_rating = addon.average_rating;
                payload.rating_count = addon.review_count;
                payload.fan_out([(TimestampKind::UpdateDate, millis(addon.update_date))])
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtensionsFile {
    #[serde(default)]
    addons: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionEntry {
    version: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "aboutURL")]
    about_url: Option<serde_json::Value>,
    default_locale: Option<ExtensionLocale>,
    visible: Option<bool>,
    active: Option<bool>,
    install_date: Option<i64>,
    update_date: Option<i64>,
    #[serde(rename = "sourceURI")]
    source_uri: Option<String>,
    #[serde(rename = "rootURI")]
    root_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionLocale {
    name: Option<String>,
    description: Option<String>,
    creator: Option<String>,
    #[serde(rename = "homepageURL")]
    homepage_url: Option<String>,
}

/// `extensions.json`, the installed add-on database.
pub struct Extensions;

impl Extractor for Extensions {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "extensions"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        extract_json(self, &profile.data_dir.join("extensions.json"))
    }
}

impl JsonExtractor for Extensions {
    type Document = ExtensionsFile;

    fn map_document(&self, doc: ExtensionsFile) -> Vec<Artefact> {
        decode_entries::<_, ExtensionEntry>(self, doc.addons)
            .into_iter()
            .flat_map(|addon| {
                let mut payload = Artefact::new(ArtefactType::Extension);
                payload.version = addon.version;
                payload.addon_type = addon.kind;
                payload.about_url = addon
                    .about_url
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                payload.active = addon.active;
                payload.visible = addon.visible;
                payload.source_uri = addon.source_uri;
                payload.url = addon.root_uri;
                if let Some(locale) = addon.default_locale {
                    payload.addon_name = locale.name;
                    payload.description = non_empty(locale.description);
                    payload.creator_name = locale.creator;
                    payload.home_page_url = locale.homepage_url;
                }
                payload.fan_out([
                    (TimestampKind::UpdateDate, millis(addon.update_date)),
                    (TimestampKind::InstallDate, millis(addon.install_date)),
                ])
            })
            .collect()
    }
}

/// `bookmarkbackups/*.jsonlz4`. Containers are decompressed and their JSON
/// validated, bookmark records are not produced from them yet.
pub struct BookmarkBackups;

impl Extractor for BookmarkBackups {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn name(&self) -> &'static str {
        "bookmarkbackups"
    }

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError> {
        let dir = profile.data_dir.join("bookmarkbackups");
        if !dir.is_dir() {
            return Err(ExtractError::NotFound(dir));
        }

        for path in sorted_files(&dir)? {
            let decoded = match mozlz4::decode_file(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(source = %source_label(self), "skipping {}: {err}", path.display());
                    continue;
                }
            };
            match serde_json::from_slice::<serde_json::Value>(&decoded) {
                Ok(_) => debug!(
                    source = %source_label(self),
                    "decoded {} bytes from {}",
                    decoded.len(),
                    path.display()
                ),
                Err(err) => warn!(
                    source = %source_label(self),
                    "backup {} is not valid JSON: {err}",
                    path.display()
                ),
            }
        }
        Ok(Vec::new())
    }
}
