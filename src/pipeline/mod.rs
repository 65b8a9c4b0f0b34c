//! # Pipeline Module
//!
//! Merges the output of every extractor for every discovered profile,
//! filters it to a time range and orders it by canonical timestamp.
//!
//! Extraction order is profile order, then registry order within a profile.
//! That order is also the tie-break for records with equal timestamps.

pub mod workers;

use tracing::info;

use crate::artefact::{Artefact, Browser};
use crate::discovery::ProfileTarget;
use crate::extract::{Extractor, registry};
use crate::timestamp;

use workers::{ExtractJob, run_parallel, run_sequential};

/// Inclusive range of canonical timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub range: TimeRange,
    pub workers: usize,
    pub timestamp_diagnostics: bool,
}

/// Pipeline statistics collected during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub profiles: usize,
    pub jobs: usize,
    pub records_collected: usize,
    pub records_kept: usize,
    pub magnitude_warnings: usize,
}

/// Run every registered extractor against every target and concatenate the
/// decorated results in invocation order.
pub fn collect(targets: &[ProfileTarget], workers: usize) -> Vec<Artefact> {
    collect_counted(targets, workers).0
}

fn collect_counted(targets: &[ProfileTarget], workers: usize) -> (Vec<Artefact>, usize) {
    let chrome = registry(Browser::Chrome);
    let firefox = registry(Browser::Firefox);

    let mut jobs = Vec::new();
    for target in targets {
        let extractors: &[Box<dyn Extractor>] = match target.browser {
            Browser::Chrome => &chrome,
            Browser::Firefox => &firefox,
        };
        for extractor in extractors {
            jobs.push(ExtractJob {
                target,
                extractor: extractor.as_ref(),
            });
        }
    }

    let per_job = if workers > 1 {
        run_parallel(&jobs, workers)
    } else {
        run_sequential(&jobs)
    };
    (per_job.into_iter().flatten().collect(), jobs.len())
}

pub fn filter_by_range(records: Vec<Artefact>, range: &TimeRange) -> Vec<Artefact> {
    records
        .into_iter()
        .filter(|record| range.contains(record.timestamp))
        .collect()
}

/// Stable ascending sort by canonical timestamp.
pub fn sort_records(records: &mut [Artefact]) {
    records.sort_by_key(|record| record.timestamp);
}

pub fn aggregate(records: Vec<Artefact>, range: &TimeRange) -> Vec<Artefact> {
    let mut kept = filter_by_range(records, range);
    sort_records(&mut kept);
    kept
}

/// Collect, optionally diagnose, filter and sort.
pub fn run_pipeline(
    targets: &[ProfileTarget],
    opts: &PipelineOptions,
) -> (Vec<Artefact>, PipelineStats) {
    let (records, jobs) = collect_counted(targets, opts.workers);
    let mut stats = PipelineStats {
        profiles: targets.len(),
        jobs,
        records_collected: records.len(),
        ..PipelineStats::default()
    };

    if opts.timestamp_diagnostics {
        stats.magnitude_warnings = timestamp::check_consistency(&records).len();
    }

    let records = aggregate(records, &opts.range);
    stats.records_kept = records.len();
    info!(
        "collected {} records from {} profiles, {} within range",
        stats.records_collected, stats.profiles, stats.records_kept
    );
    (records, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::{ArtefactType, TimestampKind};

    fn record(ts: i64, title: &str) -> Artefact {
        let mut record = Artefact::new(ArtefactType::History).at(TimestampKind::VisitDate, ts);
        record.title = Some(title.to_string());
        record
    }

    #[test]
    fn range_is_inclusive() {
        let range = TimeRange::new(10, 20);
        let kept = filter_by_range(
            vec![record(9, "a"), record(10, "b"), record(20, "c"), record(21, "d")],
            &range,
        );
        let titles: Vec<_> = kept.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(titles, vec!["b", "c"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let range = TimeRange::new(0, 100);
        let input = vec![record(-5, "a"), record(50, "b"), record(0, "c"), record(101, "d")];
        let once = filter_by_range(input, &range);
        let twice = filter_by_range(once.clone(), &range);
        assert_eq!(once, twice);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let mut records = vec![
            record(30, "late"),
            record(10, "first-10"),
            record(20, "only-20"),
            record(10, "second-10"),
            record(10, "third-10"),
        ];
        sort_records(&mut records);
        let titles: Vec<_> = records.iter().filter_map(|r| r.title.as_deref()).collect();
        assert_eq!(
            titles,
            vec!["first-10", "second-10", "third-10", "only-20", "late"]
        );
    }

    #[test]
    fn aggregate_filters_then_sorts() {
        let out = aggregate(
            vec![record(5, "x"), record(3, "y"), record(100, "z")],
            &TimeRange::new(0, 10),
        );
        let stamps: Vec<_> = out.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![3, 5]);
    }

    #[test]
    fn unbounded_range_keeps_everything() {
        let range = TimeRange::unbounded();
        assert!(range.contains(i64::MIN));
        assert!(range.contains(0));
        assert!(range.contains(i64::MAX));
    }
}
