//! Starfin - a film catalog kept in step with media volumes on disk
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod filters;
pub mod metadata;
pub mod probe;
pub mod scanner;
pub mod sync;
pub mod volumes;
pub mod watch;
