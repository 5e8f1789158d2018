//! Command-line arguments and their resolution against the configuration file
//!
//! Precedence is command line, then configuration file, then built-in
//! defaults. [`Args::resolve`] produces the final [`Settings`].

use crate::app::cli::config::ConfigFile;
use crate::core::logging::{level_from_verbosity, LogFormat};
use crate::core::validation::{validate_listen_address, ValidationError};
use crate::controller::DEFAULT_MAX_ITEM_SIZE;
use crate::server::DEFAULT_LISTEN;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Data directory used when neither flag nor config file names one
pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "stashq")]
#[command(about = "Persistent memcached-protocol queue server")]
#[command(disable_version_flag = true)]
pub struct Args {
    /// Directory holding the queue stores
    #[arg(short = 'd', long = "data", value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Address to accept connections on
    #[arg(long = "listen", value_name = "ADDR")]
    pub listen: Option<String>,

    /// Write the process id to this file while running
    #[arg(long = "pid", value_name = "FILE")]
    pub pid: Option<PathBuf>,

    /// Close connections idle for this many seconds (0 = never)
    #[arg(long = "client-timeout", value_name = "SECS")]
    pub client_timeout: Option<u64>,

    /// Reject values larger than this many bytes
    #[arg(long = "max-item-size", value_name = "BYTES")]
    pub max_item_size: Option<usize>,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Force coloured log output
    #[arg(long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured log output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,

    /// More log output (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output (repeatable)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Print version information and exit
    #[arg(short = 'V', long = "version")]
    pub version: bool,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub listen: String,
    pub pid_file: Option<PathBuf>,
    pub client_timeout: Option<Duration>,
    pub max_item_size: usize,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
    /// `None` means colour when stderr is a terminal
    pub color: Option<bool>,
}

impl Settings {
    pub fn use_color(&self) -> bool {
        use std::io::IsTerminal;
        self.color
            .unwrap_or_else(|| std::io::stderr().is_terminal())
    }
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed `-v`/`-q` balance
    pub fn verbosity(&self) -> i8 {
        (self.verbose.min(i8::MAX as u8) as i8).saturating_sub(self.quiet.min(i8::MAX as u8) as i8)
    }

    /// Colour override from the command line, if any
    pub fn color_override(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Merge with `config` and apply defaults
    pub fn resolve(&self, config: ConfigFile) -> Result<Settings, ValidationError> {
        let listen = self
            .listen
            .clone()
            .or(config.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = validate_listen_address(&listen)?;

        let log_format = match self.log_format.as_deref().or(config.log_format.as_deref()) {
            Some(format) => format.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        // an explicit level beats -v/-q, which beat the config file
        let log_level = match (&self.log_level, self.verbosity(), config.log_level) {
            (Some(level), _, _) => level.clone(),
            (None, 0, Some(level)) => level,
            (None, verbosity, _) => level_from_verbosity(verbosity).to_string(),
        };

        let client_timeout = self
            .client_timeout
            .or(config.client_timeout)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let log_file = self
            .log_file
            .clone()
            .or(config.log_file)
            .filter(|path| path.as_os_str() != "none");

        Ok(Settings {
            data_dir: self
                .data
                .clone()
                .or(config.data_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            listen,
            pid_file: self.pid.clone().or(config.pid_file),
            client_timeout,
            max_item_size: self
                .max_item_size
                .or(config.max_item_size)
                .unwrap_or(DEFAULT_MAX_ITEM_SIZE),
            log_level,
            log_format,
            log_file,
            color: self.color_override().or(config.color),
        })
    }
}
