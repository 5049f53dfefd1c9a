//! taskweave command line interface.
//!
//! Loads workflow documents from disk and drives the engine in
//! `taskweave-workflow`: validation, planning, connecting nodes and runs
//! against the remote task API.

pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod http_runner;
