//! # Timestamp normalization
//!
//! Every browser store encodes time differently: Chromium counts microseconds
//! since 1601-01-01, Firefox counts micro- or milliseconds since 1970, the
//! cache index counts seconds. All of them are converted here into the
//! canonical representation used by the rest of the crate: signed
//! microseconds since the Unix epoch, UTC.
//!
//! A canonical value of `0` means "timestamp unknown". It is not possible to
//! tell it apart from a genuine 1970-01-01T00:00:00Z instant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::artefact::{Artefact, ArtefactType};

/// Seconds between 1601-01-01T00:00:00Z and 1970-01-01T00:00:00Z.
pub const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// [`FILETIME_UNIX_OFFSET_SECS`] in microseconds.
pub const FILETIME_UNIX_OFFSET_MICROS: i64 = FILETIME_UNIX_OFFSET_SECS * 1_000_000;

/// Canonical value reserved for "unknown".
pub const UNKNOWN: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochKind {
    /// 1970-01-01T00:00:00Z
    Unix,
    /// 1601-01-01T00:00:00Z, used by Chromium-family stores.
    WindowsFiletime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    fn micros_per_unit(self) -> i64 {
        match self {
            TimeUnit::Seconds => 1_000_000,
            TimeUnit::Milliseconds => 1_000,
            TimeUnit::Microseconds => 1,
        }
    }
}

/// Convert a raw source timestamp into canonical microseconds since the Unix epoch.
///
/// Pure integer arithmetic. It saturates, so the mapping stays monotonic for
/// out-of-range inputs.
pub fn normalize(raw: i64, epoch: EpochKind, unit: TimeUnit) -> i64 {
    let micros = raw.saturating_mul(unit.micros_per_unit());
    match epoch {
        EpochKind::Unix => micros,
        EpochKind::WindowsFiletime => micros.saturating_sub(FILETIME_UNIX_OFFSET_MICROS),
    }
}

/// Like [`normalize`], but NULL columns and the stores' own "never" marker
/// (a raw `0`) come back as `None` whatever the epoch.
pub fn normalize_opt(raw: Option<i64>, epoch: EpochKind, unit: TimeUnit) -> Option<i64> {
    match raw {
        None | Some(0) => None,
        Some(value) => Some(normalize(value, epoch, unit)),
    }
}

pub fn to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nsecs = (micros.rem_euclid(1_000_000) as u32) * 1000;
    DateTime::<Utc>::from_timestamp(secs, nsecs)
}

pub fn from_datetime(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_micros()
}

/// Order of magnitude a timestamp appears to be expressed in, assuming it
/// denotes an instant after September 2001.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MagnitudeClass {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl MagnitudeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            MagnitudeClass::Seconds => "sec",
            MagnitudeClass::Milliseconds => "milli",
            MagnitudeClass::Microseconds => "micro",
            MagnitudeClass::Nanoseconds => "nano",
        }
    }
}

const EPOCH_SECONDS_FLOOR: i64 = 1_000_000_000;

/// Guess the unit of a value. `None` for unknown timestamps.
pub fn classify(value: i64) -> Option<MagnitudeClass> {
    if value == UNKNOWN {
        return None;
    }
    let value = value.unsigned_abs();
    let floor = EPOCH_SECONDS_FLOOR as u64;
    let class = if value >= floor * 1_000_000_000 {
        MagnitudeClass::Nanoseconds
    } else if value >= floor * 1_000_000 {
        MagnitudeClass::Microseconds
    } else if value >= floor * 1_000 {
        MagnitudeClass::Milliseconds
    } else {
        MagnitudeClass::Seconds
    };
    Some(class)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnitudeMismatch {
    pub artefact_type: ArtefactType,
    pub expected: MagnitudeClass,
    pub found: MagnitudeClass,
    pub timestamp: i64,
}

/// Flag records whose timestamp magnitude disagrees with the first record of
/// the same artefact type. Purely diagnostic: mismatches are logged and
/// returned, extraction is never blocked.
pub fn check_consistency(records: &[Artefact]) -> Vec<MagnitudeMismatch> {
    let mut seen: BTreeMap<ArtefactType, MagnitudeClass> = BTreeMap::new();
    let mut mismatches = Vec::new();

    for record in records {
        let Some(class) = classify(record.timestamp) else {
            continue;
        };
        let expected = *seen.entry(record.artifact_type).or_insert(class);
        if expected != class {
            warn!(
                artefact_type = record.artifact_type.as_str(),
                expected = expected.as_str(),
                found = class.as_str(),
                timestamp = record.timestamp,
                date = %to_datetime(record.timestamp)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "out of range".to_string()),
                "inconsistent timestamp magnitude"
            );
            mismatches.push(MagnitudeMismatch {
                artefact_type: record.artifact_type,
                expected,
                found: class,
                timestamp: record.timestamp,
            });
        }
    }

    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::TimestampKind;

    // 2022-06-15T00:00:00Z
    const JUNE_2022_SECS: i64 = 1_655_251_200;

    #[test]
    fn converts_filetime_micros() {
        let raw = (JUNE_2022_SECS + FILETIME_UNIX_OFFSET_SECS) * 1_000_000;
        assert_eq!(
            normalize(raw, EpochKind::WindowsFiletime, TimeUnit::Microseconds),
            JUNE_2022_SECS * 1_000_000
        );
    }

    #[test]
    fn filetime_offset_matches_reference_instant() {
        // 13_303_353_600_000_000 is 2022-07-27T00:00:00Z in Chromium's encoding.
        let micros = normalize(
            13_303_353_600_000_000,
            EpochKind::WindowsFiletime,
            TimeUnit::Microseconds,
        );
        let dt = to_datetime(micros).expect("datetime");
        assert_eq!(dt.to_rfc3339(), "2022-07-27T00:00:00+00:00");
    }

    #[test]
    fn converts_unix_units() {
        assert_eq!(
            normalize(JUNE_2022_SECS, EpochKind::Unix, TimeUnit::Seconds),
            JUNE_2022_SECS * 1_000_000
        );
        assert_eq!(
            normalize(JUNE_2022_SECS * 1_000 + 7, EpochKind::Unix, TimeUnit::Milliseconds),
            JUNE_2022_SECS * 1_000_000 + 7_000
        );
        assert_eq!(
            normalize(42, EpochKind::Unix, TimeUnit::Microseconds),
            42
        );
    }

    #[test]
    fn raw_zero_is_unknown() {
        for epoch in [EpochKind::Unix, EpochKind::WindowsFiletime] {
            for unit in [TimeUnit::Seconds, TimeUnit::Milliseconds, TimeUnit::Microseconds] {
                assert_eq!(normalize_opt(Some(0), epoch, unit), None);
                assert_eq!(normalize_opt(None, epoch, unit), None);
            }
        }
        assert_eq!(
            normalize_opt(Some(JUNE_2022_SECS), EpochKind::Unix, TimeUnit::Seconds),
            Some(JUNE_2022_SECS * 1_000_000)
        );
    }

    #[test]
    fn normalize_is_monotonic() {
        let samples = [i64::MIN, -5_000, -1, 0, 1, 2, 1_000, JUNE_2022_SECS, i64::MAX / 2, i64::MAX];
        for epoch in [EpochKind::Unix, EpochKind::WindowsFiletime] {
            for unit in [TimeUnit::Seconds, TimeUnit::Milliseconds, TimeUnit::Microseconds] {
                for pair in samples.windows(2) {
                    assert!(
                        normalize(pair[0], epoch, unit) <= normalize(pair[1], epoch, unit),
                        "{epoch:?} {unit:?} {pair:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn datetime_round_trip_handles_negative_micros() {
        let dt = to_datetime(-1).expect("datetime");
        assert_eq!(from_datetime(&dt), -1);
    }

    #[test]
    fn classifies_magnitudes() {
        assert_eq!(classify(0), None);
        assert_eq!(classify(JUNE_2022_SECS), Some(MagnitudeClass::Seconds));
        assert_eq!(classify(JUNE_2022_SECS * 1_000), Some(MagnitudeClass::Milliseconds));
        assert_eq!(classify(JUNE_2022_SECS * 1_000_000), Some(MagnitudeClass::Microseconds));
        assert_eq!(
            classify(JUNE_2022_SECS * 1_000_000_000),
            Some(MagnitudeClass::Nanoseconds)
        );
    }

    #[test]
    fn flags_inconsistent_records() {
        let mut ok = Artefact::new(ArtefactType::Cookie);
        ok.timestamp = JUNE_2022_SECS * 1_000_000;
        ok.timestamp_type = TimestampKind::CreationTime;
        let mut unknown = ok.clone();
        unknown.timestamp = 0;
        let mut odd = ok.clone();
        odd.timestamp = JUNE_2022_SECS;
        let mut other_type = odd.clone();
        other_type.artifact_type = ArtefactType::History;

        let mismatches = check_consistency(&[ok, unknown, odd, other_type]);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].artefact_type, ArtefactType::Cookie);
        assert_eq!(mismatches[0].expected, MagnitudeClass::Microseconds);
        assert_eq!(mismatches[0].found, MagnitudeClass::Seconds);
    }
}
