// ABOUTME: Library module for mysql-dump
// ABOUTME: Exports the export engine, MySQL session and orchestration for binary and tests

pub mod commands;
pub mod config;
pub mod dump;
pub mod error;
pub mod mysql;
pub mod progress;
pub mod session;
#[doc(hidden)]
pub mod testing;
pub mod utils;
