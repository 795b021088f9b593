//! Strata CLI - Command-line interface for the Strata migration engine.
//!
//! This crate provides the `strata` binary for running, inspecting and
//! validating database schema migrations.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
