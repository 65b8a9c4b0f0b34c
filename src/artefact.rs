//! Unified artefact record.
//!
//! Every extractor produces [`Artefact`] values regardless of the browser or
//! store it read. Field names follow the CIM web data model; the serialized
//! field order is the CSV column order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
}

impl Browser {
    pub fn as_str(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }

    pub fn all() -> [Browser; 2] {
        [Browser::Chrome, Browser::Firefox]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtefactType {
    History,
    Download,
    Bookmark,
    Cookie,
    Login,
    Extension,
    Favicon,
    Cache,
    FormHistory,
    Addon,
}

impl ArtefactType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtefactType::History => "history",
            ArtefactType::Download => "download",
            ArtefactType::Bookmark => "bookmark",
            ArtefactType::Cookie => "cookie",
            ArtefactType::Login => "login",
            ArtefactType::Extension => "extension",
            ArtefactType::Favicon => "favicon",
            ArtefactType::Cache => "cache",
            ArtefactType::FormHistory => "formhistory",
            ArtefactType::Addon => "addon",
        }
    }
}

/// Which event of the source row the record's timestamp stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampKind {
    #[serde(rename = "visit_date")]
    VisitDate,
    #[serde(rename = "dateAdded")]
    DateAdded,
    #[serde(rename = "dateLastUsed")]
    DateLastUsed,
    #[serde(rename = "lastModified")]
    LastModified,
    #[serde(rename = "creationTime")]
    CreationTime,
    #[serde(rename = "lastAccessed")]
    LastAccessed,
    #[serde(rename = "lastUpdate")]
    LastUpdate,
    #[serde(rename = "dateCreated")]
    DateCreated,
    #[serde(rename = "lastUsed")]
    LastUsed,
    #[serde(rename = "passwordChanged")]
    PasswordChanged,
    #[serde(rename = "firstUsed")]
    FirstUsed,
    #[serde(rename = "lastUpdated")]
    LastUpdated,
    #[serde(rename = "lastRequested")]
    LastRequested,
    #[serde(rename = "expires -7 days (favicons)")]
    ExpiresMinusWeek,
    #[serde(rename = "updateDate")]
    UpdateDate,
    #[serde(rename = "installDate")]
    InstallDate,
    #[serde(rename = "lastFetch")]
    LastFetch,
    /// Cache entry fetched and modified at the same instant.
    #[serde(rename = "lastFetch (lastMod)")]
    LastFetchModified,
    #[serde(rename = "manifestModified")]
    ManifestModified,
    #[serde(rename = "now")]
    Now,
    #[serde(rename = "unknown")]
    Unknown,
}

impl TimestampKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TimestampKind::VisitDate => "visit_date",
            TimestampKind::DateAdded => "dateAdded",
            TimestampKind::DateLastUsed => "dateLastUsed",
            TimestampKind::LastModified => "lastModified",
            TimestampKind::CreationTime => "creationTime",
            TimestampKind::LastAccessed => "lastAccessed",
            TimestampKind::LastUpdate => "lastUpdate",
            TimestampKind::DateCreated => "dateCreated",
            TimestampKind::LastUsed => "lastUsed",
            TimestampKind::PasswordChanged => "passwordChanged",
            TimestampKind::FirstUsed => "firstUsed",
            TimestampKind::LastUpdated => "lastUpdated",
            TimestampKind::LastRequested => "lastRequested",
            TimestampKind::ExpiresMinusWeek => "expires -7 days (favicons)",
            TimestampKind::UpdateDate => "updateDate",
            TimestampKind::InstallDate => "installDate",
            TimestampKind::LastFetch => "lastFetch",
            TimestampKind::LastFetchModified => "lastFetch (lastMod)",
            TimestampKind::ManifestModified => "manifestModified",
            TimestampKind::Now => "now",
            TimestampKind::Unknown => "unknown",
        }
    }
}

/// One normalized browser event.
///
/// `timestamp` is always canonical (microseconds since the Unix epoch, UTC).
/// `user` and `app` are left empty by extractors and filled in by the
/// pipeline. Optional fields are omitted from JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artefact {
    pub artifact_type: ArtefactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_out: Option<i64>,
    pub timestamp: i64,
    pub timestamp_type: TimestampKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<i64>,
}

impl Artefact {
    /// An empty payload of the given type, timestamp unknown.
    pub fn new(artifact_type: ArtefactType) -> Self {
        Self {
            artifact_type,
            dest: None,
            dest_port: None,
            src: None,
            user: None,
            app: None,
            action: None,
            cached: None,
            cookie: None,
            url: None,
            url_domain: None,
            http_method: None,
            http_referrer: None,
            http_user_agent: None,
            http_content_type: None,
            duration: None,
            status: None,
            bytes_in: None,
            bytes_out: None,
            timestamp: crate::timestamp::UNKNOWN,
            timestamp_type: TimestampKind::Unknown,
            typed: None,
            visit_count: None,
            title: None,
            bookmark_title: None,
            metadata: None,
            filename: None,
            fieldname: None,
            value: None,
            addon_name: None,
            addon_type: None,
            active: None,
            visible: None,
            description: None,
            full_description: None,
            version: None,
            source_uri: None,
            home_page_url: None,
            about_url: None,
            review_url: None,
            creator_name: None,
            creator_url: None,
            average_rating: None,
            rating_count: None,
        }
    }

    pub fn at(mut self, kind: TimestampKind, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self.timestamp_type = kind;
        self
    }

    /// Emit one record per known timestamp of a source row.
    ///
    /// Every record is a copy of `self` except for `timestamp` and
    /// `timestamp_type`. Kinds whose timestamp is `None` are skipped, the
    /// output follows the order of `stamps`.
    pub fn fan_out<I>(&self, stamps: I) -> Vec<Artefact>
    where
        I: IntoIterator<Item = (TimestampKind, Option<i64>)>,
    {
        stamps
            .into_iter()
            .filter_map(|(kind, ts)| ts.map(|ts| self.clone().at(kind, ts)))
            .collect()
    }

    /// Attach the profile owner and browser. Called once by the pipeline.
    pub(crate) fn decorate(&mut self, user: &str, app: Browser) {
        self.user = Some(user.to_string());
        self.app = Some(app.as_str().to_string());
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
