//! Clap derive structures for the `crowdlens` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Also
//! compiled by `build.rs` for man pages, so only clap may be used here.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// crowdlens -- live people-counting dashboard in the terminal
#[derive(Debug, Parser)]
#[command(
    name = "crowdlens",
    version,
    about = "Live occupancy, footfall, and zone alerts from the command line",
    long_about = "Terminal dashboard for a people-counting analytics backend.\n\n\
        Shows occupancy, footfall, dwell time, and demographics per site,\n\
        pages through the entry/exit log, and streams live zone alerts.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// REST API base URL (overrides config), e.g. https://host/api
    #[arg(long, env = "CROWDLENS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Live feed origin (defaults to the API origin)
    #[arg(long, env = "CROWDLENS_SOCKET_URL", global = true)]
    pub socket_url: Option<String>,

    /// Site id or name; becomes the remembered selection
    #[arg(long, short = 's', env = "CROWDLENS_SITE", global = true)]
    pub site: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CROWDLENS_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CROWDLENS_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "CROWDLENS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one object per line when streaming)
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Dashboard date range.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum FilterArg {
    /// Since 00:00 UTC today
    #[default]
    Today,
    /// The previous UTC day
    Yesterday,
    /// The last 7 days
    Week,
    /// The last 30 days
    Month,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session token
    Login(LoginArgs),

    /// Forget the session token, selected site, and email
    Logout(LogoutArgs),

    /// List sites or change the selected site
    Sites(SitesArgs),

    /// Show occupancy, footfall, dwell, and demographics for a site
    #[command(alias = "dash")]
    Dashboard(DashboardArgs),

    /// Page through the entry/exit log
    Entries(EntriesArgs),

    /// Live dashboard: occupancy and alerts until interrupted
    Watch(WatchArgs),

    /// Stream live zone alerts
    Alerts(AlertsArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (prompted when omitted)
    pub email: Option<String>,

    /// Read the password from stdin
    #[arg(long)]
    pub password_stdin: bool,

    /// Store the password in the system keyring
    #[arg(long)]
    pub remember: bool,
}

#[derive(Debug, Args)]
pub struct LogoutArgs {
    /// Also delete the stored keyring password
    #[arg(long)]
    pub forget_password: bool,
}

// ── Sites ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List sites and their zones
    #[command(alias = "ls")]
    List,

    /// Select the site used by other commands
    Select {
        /// Site id or name (interactive picker when omitted)
        site: Option<String>,
    },
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Date range
    #[arg(long, short = 'f', value_enum, default_value_t)]
    pub filter: FilterArg,
}

#[derive(Debug, Args)]
pub struct EntriesArgs {
    /// Page to show (1-based)
    #[arg(long, short = 'p', default_value_t = 1)]
    pub page: u32,

    /// Rows per page (overrides config)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Only records for the selected site
    #[arg(long)]
    pub site_only: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Date range for the analytics header
    #[arg(long, short = 'f', value_enum, default_value_t)]
    pub filter: FilterArg,
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Exit after this many alerts
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration
    Show,

    /// Print the config and state file locations
    Path,

    /// Set a configuration value
    Set {
        /// Key, e.g. api_url or defaults.page_size
        key: String,
        /// Value
        value: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Account email (defaults to the logged-in user)
        email: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
