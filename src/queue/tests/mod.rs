//! Test modules for the persistent queue
//!
//! Tests are organized by functional area.

mod concurrent;
