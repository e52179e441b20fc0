use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use fieldnote_config::{AuthMode, EnrichmentRoute, PrimaryEncoding, UploadStrategy};
use fieldnote_telemetry::LogFormat;
use jiff::Timestamp;
use jiff::civil::Date;

/// Fieldnote conference session uploader
#[derive(Debug, Parser)]
#[command(
    name = "fieldnote",
    version,
    about = "Upload booth notes, photos and recordings to a conference session API"
)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "fieldnote.toml", env = "FIELDNOTE_CONFIG", global = true)]
    pub config: PathBuf,

    /// `tracing` filter directive for console output
    #[arg(long, default_value = "warn", env = "FIELDNOTE_LOG", global = true)]
    pub log_filter: String,

    /// Console log format (text or json)
    #[arg(long, default_value = "text", env = "FIELDNOTE_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Print the request/response log as JSON lines to stderr on exit
    #[arg(long, global = true)]
    pub dump_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that the API is reachable
    Health,

    /// Manage conferences
    Conferences {
        #[command(subcommand)]
        action: ConferenceAction,
    },

    /// Manage vendors
    Vendors {
        #[command(subcommand)]
        action: VendorAction,
    },

    /// Find or create the conference and vendor an upload would use
    Resolve(EntityArgs),

    /// Upload a session with notes, audio and photos
    Upload(UploadArgs),

    /// Attach files to an existing session
    Attach {
        /// Session id
        session_id: String,

        /// Audio or image files to attach
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show a session's detail and status
    Session {
        /// Session id
        session_id: String,
    },

    /// Fetch a session's generated report
    Report {
        /// Session id
        session_id: String,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current settings (the API key is masked)
    Show,

    /// Merge new values into the settings file
    Set(SetArgs),
}

#[derive(Debug, ClapArgs)]
pub struct SetArgs {
    #[arg(long)]
    pub api_base_url: Option<String>,

    #[arg(long, env = "FIELDNOTE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// header, bearer or query
    #[arg(long)]
    pub auth_mode: Option<AuthMode>,

    #[arg(long)]
    pub auth_header: Option<String>,

    #[arg(long)]
    pub auth_query_param: Option<String>,

    /// combined or mobile
    #[arg(long)]
    pub strategy: Option<UploadStrategy>,

    /// multipart or json
    #[arg(long)]
    pub primary_encoding: Option<PrimaryEncoding>,

    /// enrich or trigger_enrichment
    #[arg(long)]
    pub enrichment_route: Option<EnrichmentRoute>,

    #[arg(long)]
    pub enrich: Option<bool>,

    #[arg(long)]
    pub poll_attempts: Option<u32>,

    /// e.g. "2s" or "500ms"
    #[arg(long)]
    pub poll_interval: Option<String>,

    #[arg(long)]
    pub log_capacity: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum ConferenceAction {
    /// List conferences
    List,

    /// Create a conference
    Create {
        name: String,

        /// First day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start: Option<Date>,

        /// Last day (YYYY-MM-DD); defaults to the start date
        #[arg(long)]
        end: Option<Date>,
    },
}

#[derive(Debug, Subcommand)]
pub enum VendorAction {
    /// List vendors, optionally only those of one conference
    List {
        #[arg(long)]
        conference: Option<String>,
    },

    /// Create a vendor under a conference
    Create {
        name: String,

        #[arg(long)]
        conference: String,
    },

    /// Show one vendor with its sessions
    Get { vendor_id: String },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct EntityArgs {
    /// Conference id; a placeholder conference is used when omitted
    #[arg(long)]
    pub conference: Option<String>,

    /// Vendor id; a vendor named `--vendor-name` is used when omitted
    #[arg(long)]
    pub vendor: Option<String>,

    /// Name of the vendor to find or create
    #[arg(long)]
    pub vendor_name: Option<String>,
}

#[derive(Debug, ClapArgs)]
pub struct UploadArgs {
    #[command(flatten)]
    pub entities: EntityArgs,

    /// Free-text notes
    #[arg(short, long, default_value = "")]
    pub notes: String,

    /// Audio recording
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Declared media type of the recording
    #[arg(long, requires = "audio")]
    pub audio_type: Option<String>,

    /// Photo; repeat for several
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,

    /// Session start (RFC 3339); defaults to now
    #[arg(long)]
    pub started_at: Option<Timestamp>,

    /// Session end (RFC 3339)
    #[arg(long, conflicts_with = "duration")]
    pub ended_at: Option<Timestamp>,

    /// Recording length, e.g. "4m30s"
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    duration_str::parse(raw).map_err(|e| e.to_string())
}
