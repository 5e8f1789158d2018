//! Application module

pub mod cli;
pub mod pidfile;
pub mod startup;
