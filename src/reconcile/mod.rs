//! Reconciliation engine: for every asset the search yields, decide whether
//! its stored capture time needs correcting, and correct it (or report it in
//! dry-run mode).
//!
//! Per asset the flow is key → eligibility → hydration → decision. The
//! eligibility check runs before any detail fetch, so unmatched assets cost no
//! extra request.

pub mod decision;

use std::cell::Cell;
use std::path::Path;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::immich::search::asset_stream;
use crate::immich::{AssetResponse, ExifInfo, ImmichApi, MetadataSearch};
use crate::local::{LocalRecord, LocalRecordMap};
use crate::timestamp::{Timestamp, Zone};
use decision::TargetSource;

/// Where corrected times come from.
#[derive(Debug)]
pub enum Mode {
    /// Match assets against capture times read from local files.
    LocalFiles(LocalRecordMap),
    /// No local files: every asset is eligible and keeps its wall clock,
    /// relabelled into the override zone when one is set.
    ResetOnly,
}

#[derive(Debug)]
pub struct ReconcileConfig {
    pub mode: Mode,
    /// `--timezone`; in reset-only mode the zone every asset is relabelled into.
    pub timezone: Option<Zone>,
    /// Also try `prefix + stem` when the bare stem has no local record.
    pub try_prefix: Option<String>,
    pub dry_run: bool,
}

/// What happened to one asset.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoMatch,
    AlreadyCorrect,
    WouldUpdate(Timestamp),
    Updated(Timestamp),
}

/// Result of the cheap, request-free eligibility check.
#[derive(Debug)]
enum Eligibility<'a> {
    NoMatch { key: String },
    Eligible { key: String, record: Option<&'a LocalRecord> },
}

/// Counts per outcome over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub seen: usize,
    pub no_match: usize,
    pub detail_failures: usize,
    pub already_correct: usize,
    pub would_update: usize,
    pub updated: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        self.seen += 1;
        match outcome {
            Outcome::NoMatch => self.no_match += 1,
            Outcome::AlreadyCorrect => self.already_correct += 1,
            Outcome::WouldUpdate(_) => self.would_update += 1,
            Outcome::Updated(_) => self.updated += 1,
        }
    }

    pub fn log(&self, dry_run: bool) {
        tracing::info!("Summary");
        tracing::info!("  {} assets scanned", self.seen);
        tracing::info!("  {} without a match", self.no_match);
        if self.detail_failures > 0 {
            tracing::info!("    {} of them after a failed detail fetch", self.detail_failures);
        }
        tracing::info!("  {} already correct", self.already_correct);
        if dry_run {
            tracing::info!("  {} would be updated", self.would_update);
        } else {
            tracing::info!("  {} updated", self.updated);
        }
    }
}

/// Drives the per-asset decision against one API.
pub struct Reconciler<'a, A: ?Sized> {
    api: &'a A,
    config: &'a ReconcileConfig,
    detail_failures: Cell<usize>,
}

impl<'a, A: ImmichApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A, config: &'a ReconcileConfig) -> Self {
        Self {
            api,
            config,
            detail_failures: Cell::new(0),
        }
    }

    /// Eligible assets skipped so far because their detail fetch failed.
    /// They are reported as [`Outcome::NoMatch`].
    pub fn detail_failures(&self) -> usize {
        self.detail_failures.get()
    }

    fn eligibility(&self, original_file_name: &str) -> Eligibility<'a> {
        let mut key = Path::new(original_file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let config: &'a ReconcileConfig = self.config;
        let records = match &config.mode {
            Mode::ResetOnly => return Eligibility::Eligible { key, record: None },
            Mode::LocalFiles(records) => records,
        };

        if let Some(prefix) = &config.try_prefix {
            let prefixed = format!("{prefix}{key}");
            if !records.contains_key(&key) && records.contains_key(&prefixed) {
                tracing::debug!("Trying prefix {:?} for {}", prefix, key);
                key = prefixed;
            }
        }

        match records.get(&key) {
            Some(record) => Eligibility::Eligible {
                key,
                record: Some(record),
            },
            None => Eligibility::NoMatch { key },
        }
    }

    /// The asset's EXIF block, fetching the full asset when the search
    /// summary left it out. `None` when that fetch fails.
    async fn hydrate(&self, asset: AssetResponse, key: &str) -> Option<ExifInfo> {
        if let Some(exif) = asset.exif_info {
            return Some(exif);
        }
        match self.api.get_asset_info(asset.id).await {
            Ok(full) => Some(full.exif_info.unwrap_or_default()),
            Err(e) => {
                tracing::error!(
                    "Failed to get full info for asset ID {} ({}): {}",
                    asset.id,
                    key,
                    e
                );
                self.detail_failures.set(self.detail_failures.get() + 1);
                None
            }
        }
    }

    /// Decide, and apply unless dry-running, the correction for one asset.
    ///
    /// Only a failed update call is an error; everything else maps to an
    /// [`Outcome`].
    pub async fn reconcile(&self, asset: AssetResponse) -> Result<Outcome> {
        let id = asset.id;
        let (key, record) = match self.eligibility(&asset.original_file_name) {
            Eligibility::NoMatch { key } => {
                tracing::debug!(
                    "No matching local file found for asset ID {} ({}, key {})",
                    id,
                    asset.original_file_name,
                    key
                );
                return Ok(Outcome::NoMatch);
            }
            Eligibility::Eligible { key, record } => (key, record),
        };

        let Some(exif) = self.hydrate(asset, &key).await else {
            tracing::debug!("Skipping asset ID {} ({}) due to client error", id, key);
            return Ok(Outcome::NoMatch);
        };

        let label = format!("ID {id} ({key})");
        let current = decision::current_state(&exif, &label);
        let source = match record {
            Some(record) => TargetSource::Local(&record.timestamp),
            None => TargetSource::Reset {
                zone: self.config.timezone,
            },
        };
        let Some(target) = decision::derive_target(source, current.as_ref()) else {
            tracing::debug!(
                "Cannot determine correct date for asset {}; skipping",
                label
            );
            return Ok(Outcome::NoMatch);
        };
        let target = decision::backfill_zone(target, current.as_ref());

        if decision::is_already_correct(source, &target, current.as_ref()) {
            tracing::debug!("Asset {} already has correct date {}", label, target);
            return Ok(Outcome::AlreadyCorrect);
        }

        let from = current.map_or_else(|| "None".to_string(), |c| c.to_iso8601());
        if self.config.dry_run {
            println!("Would update asset {} to date {} from {}", label, target, from);
            return Ok(Outcome::WouldUpdate(target));
        }

        tracing::info!("Updating asset {} to date {} from {}", label, target, from);
        self.apply(id, &target).await?;
        Ok(Outcome::Updated(target))
    }

    async fn apply(&self, id: Uuid, target: &Timestamp) -> Result<()> {
        self.api
            .update_asset(id, &target.to_iso8601())
            .await
            .with_context(|| format!("Updating asset {id}"))
    }
}

/// Reconcile every asset the search yields, one at a time.
///
/// A failed page request or update call aborts the run; a failed detail
/// fetch only skips that asset.
pub async fn reconcile_all<A>(
    api: &A,
    criteria: MetadataSearch,
    config: &ReconcileConfig,
) -> Result<RunSummary>
where
    A: ImmichApi + ?Sized,
{
    let reconciler = Reconciler::new(api, config);
    let mut summary = RunSummary::default();

    let assets = asset_stream(api, criteria);
    tokio::pin!(assets);

    while let Some(asset) = assets.next().await {
        let asset = asset.context("No usable response from Immich server to asset search")?;
        let outcome = reconciler.reconcile(asset).await?;
        summary.record(&outcome);
    }
    summary.detail_failures = reconciler.detail_failures();

    Ok(summary)
}
