//! Capture timestamps that may or may not carry a time zone.
//!
//! Immich stores `dateTimeOriginal` as an instant plus an optional zone name,
//! while EXIF capture tags are wall-clock strings with an optional offset tag.
//! [`Timestamp`] models both: a naive wall clock, or a wall clock labelled
//! with a [`Zone`] (a fixed offset or a named IANA zone whose offset depends on
//! the date).

use std::fmt;

use chrono::{
    DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

/// A time zone label: either a fixed UTC offset or a named IANA zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl Zone {
    /// Resolve a zone name as Immich or a user would spell it.
    ///
    /// IANA names (`Europe/Berlin`, `UTC`) are tried first, then fixed-offset
    /// spellings such as `UTC+02:00`, `GMT-5`, `+0530` or `Z`.
    pub fn resolve(name: &str) -> Option<Zone> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Ok(tz) = name.parse::<Tz>() {
            return Some(Zone::Named(tz));
        }
        let rest = name
            .strip_prefix("UTC")
            .or_else(|| name.strip_prefix("GMT"))
            .unwrap_or(name);
        if rest.is_empty() {
            return FixedOffset::east_opt(0).map(Zone::Fixed);
        }
        parse_offset(rest).map(Zone::Fixed)
    }

    /// UTC offset in effect for a wall-clock time in this zone.
    ///
    /// Ambiguous times (DST fold) take the earlier offset. Times that fall in
    /// a DST gap use the offset in effect at the same reading in UTC.
    pub fn offset_at_local(&self, local: &NaiveDateTime) -> FixedOffset {
        match self {
            Zone::Fixed(offset) => *offset,
            Zone::Named(tz) => tz
                .offset_from_local_datetime(local)
                .earliest()
                .map(|o| o.fix())
                .unwrap_or_else(|| tz.offset_from_utc_datetime(local).fix()),
        }
    }

    /// UTC offset in effect at a UTC instant.
    pub fn offset_at_utc(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            Zone::Fixed(offset) => *offset,
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix(),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Fixed(offset) => write!(f, "UTC{offset}"),
            Zone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// Parse an offset such as `+02:00`, `-0500`, `+5` or `Z`.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    if hours.is_empty()
        || hours.len() > 2
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !minutes.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// A capture time, naive or labelled with a zone.
///
/// A zoned value carries the UTC offset it was resolved with. Built from an
/// instant, that is the exact offset at that instant, which keeps the second
/// pass through a DST fold distinct from the first. Built from a bare wall
/// clock ([`Timestamp::zoned`]), the earlier offset of a fold is taken.
///
/// Derived equality is structural. Whether an asset needs an update is
/// decided by `reconcile::decision`, which also accepts different zone labels
/// with the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Zoned {
        local: NaiveDateTime,
        zone: Zone,
        offset: FixedOffset,
    },
}

impl Timestamp {
    /// Attach `zone` to a wall clock, resolving its offset from the zone rules.
    pub fn zoned(local: NaiveDateTime, zone: Zone) -> Self {
        Timestamp::Zoned {
            local,
            zone,
            offset: zone.offset_at_local(&local),
        }
    }

    /// Express an instant as wall-clock time in `zone`.
    pub fn from_instant(instant: &DateTime<FixedOffset>, zone: Zone) -> Self {
        Self::from_utc(instant.naive_utc(), zone)
    }

    fn from_utc(utc: NaiveDateTime, zone: Zone) -> Self {
        let offset = zone.offset_at_utc(&utc);
        Timestamp::Zoned {
            local: utc + offset_delta(offset),
            zone,
            offset,
        }
    }

    /// Current time truncated to the minute, in `zone` or naive system-local.
    pub fn now(zone: Option<Zone>) -> Self {
        let ts = match zone {
            Some(zone) => Timestamp::from_instant(&Utc::now().fixed_offset(), zone),
            None => Timestamp::Naive(Local::now().naive_local()),
        };
        ts.map_wall_clock(|wall| {
            wall.with_second(0)
                .and_then(|w| w.with_nanosecond(0))
                .unwrap_or(wall)
        })
    }

    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(wall) => *wall,
            Timestamp::Zoned { local, .. } => *local,
        }
    }

    pub fn zone(&self) -> Option<Zone> {
        match self {
            Timestamp::Naive(_) => None,
            Timestamp::Zoned { zone, .. } => Some(*zone),
        }
    }

    pub fn is_naive(&self) -> bool {
        matches!(self, Timestamp::Naive(_))
    }

    /// UTC offset at this wall-clock time, `None` when naive.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        match self {
            Timestamp::Naive(_) => None,
            Timestamp::Zoned { offset, .. } => Some(*offset),
        }
    }

    /// Keep the wall-clock fields and attach `zone` to them.
    ///
    /// This is not a conversion: for a zoned timestamp it moves the absolute
    /// instant by the difference between the old and new offsets. It is what
    /// "the clock was right, the zone label was wrong" means.
    pub fn relabel(self, zone: Zone) -> Self {
        Timestamp::zoned(self.wall_clock(), zone)
    }

    /// Convert to the same instant expressed in `zone`.
    ///
    /// A naive timestamp is read as system-local time first.
    pub fn convert_to(self, zone: Zone) -> Self {
        let utc = match self {
            Timestamp::Naive(wall) => Local
                .from_local_datetime(&wall)
                .earliest()
                .map(|dt| dt.naive_utc())
                .unwrap_or(wall),
            Timestamp::Zoned { local, offset, .. } => local - offset_delta(offset),
        };
        Self::from_utc(utc, zone)
    }

    /// Shift the wall clock; a zoned value re-resolves its offset.
    pub fn map_wall_clock(self, f: impl FnOnce(NaiveDateTime) -> NaiveDateTime) -> Self {
        match self {
            Timestamp::Naive(wall) => Timestamp::Naive(f(wall)),
            Timestamp::Zoned { local, zone, .. } => Timestamp::zoned(f(local), zone),
        }
    }

    /// ISO-8601 with microseconds only when non-zero, and the offset when zoned.
    pub fn to_iso8601(&self) -> String {
        let wall = self.wall_clock();
        let mut out = wall.format("%Y-%m-%dT%H:%M:%S").to_string();
        let micros = wall.nanosecond() / 1_000;
        if micros != 0 {
            out.push_str(&format!(".{micros:06}"));
        }
        if let Some(offset) = self.utc_offset() {
            out.push_str(&offset.to_string());
        }
        out
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

fn offset_delta(offset: FixedOffset) -> TimeDelta {
    TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}
