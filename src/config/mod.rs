//! Declarative project definitions: file shapes, the loader that turns
//! them into candidate aggregates, and the import engine that reconciles
//! candidates against the store.

pub mod import;
pub mod loader;
pub mod types;

pub use import::{import_config, ImportStrategy};
pub use loader::load_candidates;
