//! Pure decision steps: what the server holds now, what it should hold, and
//! whether the two already agree.

use crate::immich::ExifInfo;
use crate::timestamp::{Timestamp, Zone};

/// The asset's stored capture time as a [`Timestamp`].
///
/// - no `dateTimeOriginal`: `None`
/// - no zone name: the transport's wall clock, naive
/// - zone name Immich knows but we cannot resolve: same as no zone name
/// - resolvable zone name: the instant expressed in that zone
pub fn current_state(exif: &ExifInfo, asset_label: &str) -> Option<Timestamp> {
    let instant = exif.date_time_original.as_ref()?;
    let naive = Timestamp::Naive(instant.naive_local());
    let Some(name) = exif.time_zone.as_deref() else {
        return Some(naive);
    };
    match Zone::resolve(name) {
        Some(zone) => Some(Timestamp::from_instant(instant, zone)),
        None => {
            tracing::warn!("Asset {} has unknown time zone: {}", asset_label, name);
            Some(naive)
        }
    }
}

/// Where the corrected time comes from for one asset.
#[derive(Debug, Clone, Copy)]
pub enum TargetSource<'a> {
    /// A matched local file's capture time, taken verbatim.
    Local(&'a Timestamp),
    /// No local files: keep the stored wall clock, optionally under a new zone.
    Reset { zone: Option<Zone> },
}

/// The capture time the asset should have, or `None` when nothing is known.
pub fn derive_target(source: TargetSource<'_>, current: Option<&Timestamp>) -> Option<Timestamp> {
    match source {
        TargetSource::Local(ts) => Some(*ts),
        TargetSource::Reset { zone: Some(zone) } => current.map(|c| c.relabel(zone)),
        TargetSource::Reset { zone: None } => current.copied(),
    }
}

/// Give a naive target the asset's own zone, if the asset has one.
///
/// No zone is invented: a naive target against a naive asset stays naive.
pub fn backfill_zone(target: Timestamp, current: Option<&Timestamp>) -> Timestamp {
    match (target.is_naive(), current.and_then(Timestamp::zone)) {
        (true, Some(zone)) => target.relabel(zone),
        _ => target,
    }
}

/// Whether writing `target` would change nothing.
///
/// Against a zoned asset the target must be zoned too, with the same wall
/// clock and the same UTC offset at that time, so a fixed `+02:00` and
/// `Europe/Berlin` in summer count as the same. Against a zone-less asset a
/// naive target compares by wall clock, and so does a zoned target read from
/// a local file. A zoned target from a reset never equals a zone-less asset.
pub fn is_already_correct(
    source: TargetSource<'_>,
    target: &Timestamp,
    current: Option<&Timestamp>,
) -> bool {
    let Some(current) = current else {
        return false;
    };
    match current {
        Timestamp::Naive(wall) => {
            let comparable = target.is_naive() || matches!(source, TargetSource::Local(_));
            comparable && target.wall_clock() == *wall
        }
        Timestamp::Zoned { local, .. } => {
            !target.is_naive()
                && target.wall_clock() == *local
                && target.utc_offset() == current.utc_offset()
        }
    }
}
