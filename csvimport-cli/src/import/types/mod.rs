//! Core types for CSV imports

mod columns;
mod mapping;
mod node;
mod run_log;
mod value;

pub use columns::*;
pub use mapping::*;
pub use node::*;
pub use run_log::*;
pub use value::*;
