//! Tests for the CLI module
//!
//! Argument parsing, configuration file loading and how the two combine.

pub mod config_tests;
