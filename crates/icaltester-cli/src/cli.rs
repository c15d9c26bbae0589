//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// icaltester - Exercise calendar sync against real and mock iCal feeds
#[derive(Debug, Parser)]
#[command(name = "icaltester")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ICALTESTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Allow plain-http feed URLs (ports 80 and 443)
    #[arg(long)]
    pub allow_http: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether a URL would be fetched
    CheckUrl {
        /// URL to validate
        url: String,
    },

    /// Fetch a feed through the guard and list its events
    Fetch {
        /// Feed URL
        url: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Parse a local iCalendar file
    Parse {
        /// Path to the .ics file
        file: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate a feed from a JSON list of bookings
    Build {
        /// Calendar name (X-WR-CALNAME)
        #[arg(long)]
        name: String,

        /// Product identifier
        #[arg(long)]
        prod_id: Option<String>,

        /// JSON file holding an array of bookings
        bookings: PathBuf,

        /// Write the feed here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Sync due subscriptions stored in a state file
    Sync {
        /// State file (defaults to the configured one)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Keep running on the configured tick until Ctrl-C
        #[arg(long, conflicts_with = "subscription")]
        watch: bool,

        /// Sync this subscription only, whether due or not
        #[arg(long)]
        subscription: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Render the public feed of a calendar
    Feed {
        /// State file (defaults to the configured one)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Feed token of the calendar
        token: String,

        /// Write the feed here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,
    /// Validate configuration
    Validate,
    /// Show configuration file path
    Path,
}
