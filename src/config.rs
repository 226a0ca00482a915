use crate::cli::Cli;
use crate::immich::search::SearchFilters;
use crate::timestamp::Zone;
use crate::types::LogLevel;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::PathBuf;

/// Validated run configuration.
pub struct Config {
    pub url: String,
    pub api_key: String,
    pub paths: Vec<PathBuf>,
    pub tags: Vec<String>,
    pub model: Option<String>,
    pub try_prefix: Option<String>,
    pub log_file: Option<PathBuf>,

    pub before: Option<NaiveDate>,
    pub after: Option<NaiveDate>,
    pub timezone: Option<Zone>,

    pub log_level: LogLevel,

    pub no_files: bool,
    pub dry_run: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("paths", &self.paths)
            .field("timezone", &self.timezone)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("tags", &self.tags)
            .field("no_files", &self.no_files)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        match (cli.paths.is_empty(), cli.no_files) {
            (true, false) => anyhow::bail!("Either PATHS or --no-files must be given"),
            (false, true) => anyhow::bail!("PATHS cannot be combined with --no-files"),
            _ => {}
        }

        let timezone = cli
            .timezone
            .as_deref()
            .map(|name| {
                Zone::resolve(name).ok_or_else(|| anyhow::anyhow!("Unknown time zone: '{}'", name))
            })
            .transpose()?;

        let before = cli.before.as_deref().map(parse_date).transpose()?;
        let after = cli.after.as_deref().map(parse_date).transpose()?;

        Ok(Self {
            url: cli.url,
            api_key: cli.api_key,
            paths: cli.paths.iter().map(|p| expand_tilde(p)).collect(),
            tags: cli.tags,
            model: cli.model,
            try_prefix: cli.try_prefix,
            log_file: cli.log_file.as_deref().map(expand_tilde),
            before,
            after,
            timezone,
            log_level: LogLevel::from_verbosity(cli.verbose),
            no_files: cli.no_files,
            dry_run: cli.dry_run,
        })
    }

    pub fn search_filters(&self) -> SearchFilters {
        SearchFilters {
            before: self.before,
            after: self.after,
            model: self.model.clone(),
            zone: self.timezone,
        }
    }
}

/// Parse a date filter.
///
/// Accepts an ISO date (`2025-01-02`) or an ISO datetime, with or without an
/// offset (`2025-01-02T14:30:00`, `2025-01-02T14:30:00+02:00`). Only the date
/// part is kept.
pub(crate) fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    anyhow::bail!(
        "Cannot parse '{}' as a date. Expected ISO date (2025-01-02) \
         or datetime (2025-01-02T14:30:00)",
        s
    )
}
