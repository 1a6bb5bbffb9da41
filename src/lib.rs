//! worktally core library
//!
//! Typed metric values, the project/task data model, the SQLite-backed
//! store, and the config import engine. The binary in `main.rs` is a thin
//! dispatcher over these modules.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod types;
pub mod units;
