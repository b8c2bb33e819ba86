//! Builders for configuration values.

pub mod config;
