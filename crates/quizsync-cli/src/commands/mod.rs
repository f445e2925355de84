//! CLI command handlers

pub mod config;
pub mod log;
pub mod question;
pub mod status;
pub mod sync;
