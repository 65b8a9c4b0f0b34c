use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::artefact::Artefact;
use crate::export::{ExportError, ExportSink};

pub const CSV_HEADER: [&str; 44] = [
    "artifact_type",
    "dest",
    "dest_port",
    "src",
    "user",
    "app",
    "action",
    "cached",
    "cookie",
    "url",
    "url_domain",
    "http_method",
    "http_referrer",
    "http_user_agent",
    "http_content_type",
    "duration",
    "status",
    "bytes_in",
    "bytes_out",
    "timestamp",
    "timestamp_type",
    "typed",
    "visit_count",
    "title",
    "bookmark_title",
    "metadata",
    "filename",
    "fieldname",
    "value",
    "addon_name",
    "addon_type",
    "active",
    "visible",
    "description",
    "full_description",
    "version",
    "source_uri",
    "home_page_url",
    "about_url",
    "review_url",
    "creator_name",
    "creator_url",
    "average_rating",
    "rating_count",
];

/// Flat CSV view of one record: absent text is empty, absent numbers are 0
/// and absent flags are `false`.
#[derive(Serialize)]
struct ArtefactCsv<'a> {
    artifact_type: &'a str,
    dest: &'a str,
    dest_port: i64,
    src: &'a str,
    user: &'a str,
    app: &'a str,
    action: &'a str,
    cached: bool,
    cookie: &'a str,
    url: &'a str,
    url_domain: &'a str,
    http_method: &'a str,
    http_referrer: &'a str,
    http_user_agent: &'a str,
    http_content_type: &'a str,
    duration: i64,
    status: &'a str,
    bytes_in: i64,
    bytes_out: i64,
    timestamp: i64,
    timestamp_type: &'a str,
    typed: i64,
    visit_count: i64,
    title: &'a str,
    bookmark_title: &'a str,
    metadata: &'a str,
    filename: &'a str,
    fieldname: &'a str,
    value: &'a str,
    addon_name: &'a str,
    addon_type: &'a str,
    active: bool,
    visible: bool,
    description: &'a str,
    full_description: &'a str,
    version: &'a str,
    source_uri: &'a str,
    home_page_url: &'a str,
    about_url: &'a str,
    review_url: &'a str,
    creator_name: &'a str,
    creator_url: &'a str,
    average_rating: f64,
    rating_count: i64,
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

impl<'a> From<&'a Artefact> for ArtefactCsv<'a> {
    fn from(r: &'a Artefact) -> Self {
        Self {
            artifact_type: r.artifact_type.as_str(),
            dest: text(&r.dest),
            dest_port: r.dest_port.unwrap_or(0),
            src: text(&r.src),
            user: text(&r.user),
            app: text(&r.app),
            action: text(&r.action),
            cached: r.cached.unwrap_or(false),
            cookie: text(&r.cookie),
            url: text(&r.url),
            url_domain: text(&r.url_domain),
            http_method: text(&r.http_method),
            http_referrer: text(&r.http_referrer),
            http_user_agent: text(&r.http_user_agent),
            http_content_type: text(&r.http_content_type),
            duration: r.duration.unwrap_or(0),
            status: text(&r.status),
            bytes_in: r.bytes_in.unwrap_or(0),
            bytes_out: r.bytes_out.unwrap_or(0),
            timestamp: r.timestamp,
            timestamp_type: r.timestamp_type.as_str(),
            typed: r.typed.unwrap_or(0),
            visit_count: r.visit_count.unwrap_or(0),
            title: text(&r.title),
            bookmark_title: text(&r.bookmark_title),
            metadata: text(&r.metadata),
            filename: text(&r.filename),
            fieldname: text(&r.fieldname),
            value: text(&r.value),
            addon_name: text(&r.addon_name),
            addon_type: text(&r.addon_type),
            active: r.active.unwrap_or(false),
            visible: r.visible.unwrap_or(false),
            description: text(&r.description),
            full_description: text(&r.full_description),
            version: text(&r.version),
            source_uri: text(&r.source_uri),
            home_page_url: text(&r.home_page_url),
            about_url: text(&r.about_url),
            review_url: text(&r.review_url),
            creator_name: text(&r.creator_name),
            creator_url: text(&r.creator_url),
            average_rating: r.average_rating.unwrap_or(0.0),
            rating_count: r.rating_count.unwrap_or(0),
        }
    }
}

pub struct CsvSink {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(CSV_HEADER)?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

impl ExportSink for CsvSink {
    fn record(&self, record: &Artefact) -> Result<(), ExportError> {
        let mut guard = self.writer.lock().map_err(|_| ExportError::Poisoned)?;
        guard.serialize(ArtefactCsv::from(record))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ExportError> {
        let mut guard = self.writer.lock().map_err(|_| ExportError::Poisoned)?;
        guard.flush()?;
        Ok(())
    }
}
