//! Command-line parsing and configuration file handling

pub mod args;
pub mod config;

pub use args::{Args, Settings, DEFAULT_DATA_DIR};
pub use config::ConfigFile;

#[cfg(test)]
mod tests;
