//! Test modules for consumer groups
