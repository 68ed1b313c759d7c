//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::build;

/// Browse the Favor delivery catalog from the terminal
#[derive(Parser, Debug)]
#[command(name = "favor-rs")]
#[command(about = "Browse the Favor delivery catalog from the terminal")]
#[command(long_about = "
favor-rs fetches the Favor home page, cuisine listings and merchant menus
through a caching client. Every resource is cached for the configured TTL
and concurrent requests for the same resource share a single fetch.

EXAMPLES:
    # List cuisines and home page carousels
    favor-rs browse

    # Merchants serving pizza near a custom location
    favor-rs --lat 40.7128 --lng -74.0060 category pizza

    # Full menu of one merchant
    favor-rs menu 10370

    # Acquire a guest token and show when it expires
    favor-rs --verbose token

    # Use custom configuration file
    favor-rs --config /path/to/config.toml browse
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Load exactly this TOML file instead of the layered configuration
    /// directory. `FAVOR_*` environment variables still apply on top.
    ///
    /// Example: --config /etc/favor-rs/production.toml
    #[arg(short, long, global = true, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` is layered over the defaults.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, global = true, value_enum)]
    pub env: Option<Environment>,

    /// Latitude used for every catalog query
    #[arg(long, global = true, value_name = "LAT", requires = "lng", allow_negative_numbers = true, value_parser = super::validation::validate_latitude)]
    pub lat: Option<f64>,

    /// Longitude used for every catalog query
    #[arg(long, global = true, value_name = "LNG", requires = "lat", allow_negative_numbers = true, value_parser = super::validation::validate_longitude)]
    pub lng: Option<f64>,

    /// Enable verbose logging
    ///
    /// Increases log output to debug level, showing cache transitions,
    /// token refresh decisions and every HTTP exchange.
    /// Cannot be used with --quiet.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Reduces log output to error level only.
    /// Cannot be used with --verbose.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// List cuisines and the home page merchant carousels
    Browse,
    /// List the merchants of one cuisine
    ///
    /// Examples:
    ///   favor-rs category pizza
    ///   favor-rs category burgers
    Category {
        /// Cuisine id as shown by `browse`
        #[arg(value_name = "ID", value_parser = super::validation::validate_category_id)]
        id: String,
    },
    /// Show the sub-menus, sections and items of one merchant
    ///
    /// Costs two requests on a cold cache: the menu URL lookup, then the
    /// menu overview it points to.
    Menu {
        /// Merchant id as shown by `browse` or `category`
        #[arg(value_name = "MERCHANT_ID")]
        merchant_id: u64,
    },
    /// Acquire a guest token and print its expiry
    Token,
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
