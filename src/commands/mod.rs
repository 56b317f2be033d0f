// ABOUTME: Command implementations
// ABOUTME: Exports the database export command and its orchestrator

pub mod export;

pub use export::{export, ExportState, ExportSummary, Exporter};
