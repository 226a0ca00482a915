use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "immich-tzfix-rs",
    version,
    about = "Fix capture dates and time zones of Immich assets"
)]
pub struct Cli {
    /// Immich API base URL (e.g. https://photos.example.com/api)
    #[arg(long, env = "IMMICH_URL")]
    pub url: String,

    /// Immich API key.
    /// WARNING: passing via --api-key is visible in process listings.
    /// Prefer the IMMICH_API_KEY environment variable instead.
    #[arg(long, env = "IMMICH_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Print what would change without updating anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Time zone (IANA name or UTC offset) for naive times and date filters
    #[arg(long)]
    pub timezone: Option<String>,

    /// Only assets taken before this date (YYYY-MM-DD)
    #[arg(long)]
    pub before: Option<String>,

    /// Only assets taken after this date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Only assets from this camera model
    #[arg(long)]
    pub model: Option<String>,

    /// Only assets with this tag (repeatable; full value or short name)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Also match local files named PREFIX + asset name
    #[arg(long)]
    pub try_prefix: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write debug-level logs to this file
    #[arg(long)]
    pub log_file: Option<String>,

    /// Reset time zones without reading local files
    #[arg(long)]
    pub no_files: bool,

    /// Local files or directories to read capture times from
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,
}
