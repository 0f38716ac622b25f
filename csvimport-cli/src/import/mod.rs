//! CSV import engine
//!
//! Rows are turned into pending entity trees by the [`TreeBuilder`], saved
//! by the [`TreePersister`] and driven row by row by the [`ImportEngine`].

pub mod builder;
pub mod clean;
pub mod dedup;
pub mod engine;
pub mod errors;
pub mod persist;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use builder::TreeBuilder;
pub use clean::{clean, CleanError, DEFAULT_DATE_FORMAT};
pub use engine::{ImportEngine, RunReport};
pub use errors::{DedupError, EntryError, PersistError, RunError, SaveCause};
pub use persist::TreePersister;
pub use types::*;
